//! Image uploads to the backend's Cloudinary proxy

use crate::error::{ApiError, Result};
use crate::fallback::{Candidate, FallbackSequence};
use crate::{require_id, segment, ApiClient};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

/// Largest accepted image, per file
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

/// An image held in memory, ready to upload
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl ImageFile {
    pub fn new(file_name: &str, mime_type: &str, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            bytes: bytes.into(),
        }
    }

    /// Read a file, guessing its MIME type from the extension
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        let mime_type = mime_from_extension(path);
        Ok(Self::new(&file_name, mime_type, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Reject files the backend would refuse, before any request
    pub fn validate(&self) -> Result<()> {
        if self.size() > MAX_UPLOAD_BYTES {
            return Err(ApiError::invalid_input(format!(
                "File \"{}\" exceeds 10MB limit",
                self.file_name
            )));
        }
        if !ALLOWED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            return Err(ApiError::invalid_input(format!(
                "File \"{}\" is not a valid image type. Only JPEG, PNG, GIF, WebP and SVG are allowed",
                self.file_name
            )));
        }
        Ok(())
    }

    /// `data:<mime>;base64,<payload>`
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }

    fn part(&self) -> Result<Part> {
        let part = Part::stream_with_length(Body::from(self.bytes.clone()), self.size() as u64)
            .file_name(self.file_name.clone())
            .mime_str(&self.mime_type)?;
        Ok(part)
    }

    /// Stand-in for an uploaded file when no endpoint accepted it
    fn client_side(&self) -> UploadedFile {
        UploadedFile {
            url: self.data_url(),
            public_id: None,
            filename: Some(self.file_name.clone()),
            originalname: Some(self.file_name.clone()),
            mimetype: Some(self.mime_type.clone()),
            size: Some(self.size() as u64),
            client_side_fallback: true,
        }
    }
}

fn mime_from_extension(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub url: String,
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub originalname: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    /// Set when the file was embedded as a data URL instead of uploaded
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub client_side_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub file: UploadedFile,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MultiUploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

pub struct UploadApi<'a> {
    api: &'a ApiClient,
}

impl<'a> UploadApi<'a> {
    pub(crate) fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Upload one image into `folder` (e.g. `products`, `users`, `reviews`)
    pub async fn upload_image(&self, file: &ImageFile, folder: &str) -> Result<UploadedFile> {
        file.validate()?;
        let folder = segment(require_id(folder, "Upload folder")?);

        let sequence = upload_sequence("upload_image", &folder, false);
        let timeout = self.api.options().upload_timeout;
        let result: Result<UploadResponse> = self
            .post_each(&sequence, timeout, || Ok(Form::new().part("file", file.part()?)))
            .await;

        match result {
            Ok(response) => Ok(response.file),
            Err(err) if self.fallback_allowed(&err) => {
                warn!(
                    "every upload endpoint failed ({}); embedding \"{}\" as a data URL, which is not suitable for production",
                    err, file.file_name
                );
                Ok(file.client_side())
            }
            Err(err) => Err(err),
        }
    }

    /// Upload several images in one request
    pub async fn upload_images(
        &self,
        files: &[ImageFile],
        folder: &str,
    ) -> Result<MultiUploadResponse> {
        if files.is_empty() {
            return Err(ApiError::invalid_input("No files provided for upload"));
        }
        for file in files {
            file.validate()?;
        }
        let folder = segment(require_id(folder, "Upload folder")?);

        let sequence = upload_sequence("upload_images", &folder, true);
        let timeout = self.api.options().multi_upload_timeout;
        let result: Result<MultiUploadResponse> = self
            .post_each(&sequence, timeout, || {
                files.iter().try_fold(Form::new(), |form, file| -> Result<Form> {
                    Ok(form.part("files", file.part()?))
                })
            })
            .await;

        match result {
            Ok(response) => Ok(response),
            Err(err) if self.fallback_allowed(&err) => {
                warn!(
                    "every multi-upload endpoint failed ({}); embedding {} files as data URLs, which is not suitable for production",
                    err,
                    files.len()
                );
                let files: Vec<UploadedFile> = files.iter().map(ImageFile::client_side).collect();
                Ok(MultiUploadResponse {
                    message: Some("Files embedded as data URLs".to_string()),
                    count: files.len(),
                    files,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Delete an uploaded image by public id or by its Cloudinary URL
    pub async fn delete_image(&self, public_id_or_url: &str) -> Result<Value> {
        let public_id = require_id(public_id_or_url, "publicId")?;
        let public_id = cloudinary_public_id(public_id).unwrap_or(public_id);
        debug!("deleting uploaded image {}", public_id);

        self.api
            .send(
                Method::DELETE,
                "/api/uploads",
                Some(&json!({ "publicId": public_id })),
            )
            .await
    }

    fn fallback_allowed(&self, err: &ApiError) -> bool {
        self.api.options().allow_upload_fallback && matches!(err, ApiError::Exhausted { .. })
    }

    async fn post_each<T, F>(
        &self,
        sequence: &FallbackSequence,
        timeout: Duration,
        form: F,
    ) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        F: Fn() -> Result<Form>,
    {
        let api = self.api;
        let form = &form;
        let attempted = sequence
            .run(|candidate| {
                let candidate = candidate.clone();
                async move {
                    let builder = api
                        .request(candidate.method.clone(), &candidate.path)
                        .await?
                        .timeout(timeout)
                        .multipart(form()?);
                    api.execute::<T>(builder).await
                }
            })
            .await?;
        Ok(attempted.value)
    }
}

fn upload_sequence(name: &'static str, folder: &str, multiple: bool) -> FallbackSequence {
    let infix = if multiple { "multiple/" } else { "" };
    FallbackSequence::new(
        name,
        ["/api/uploads", "/api/upload", "/uploads", "/upload"]
            .iter()
            .map(|prefix| Candidate::post(format!("{}/{}{}", prefix, infix, folder)))
            .collect(),
    )
}

/// Public id inside a Cloudinary delivery URL:
/// `https://res.cloudinary.com/<cloud>/image/upload/v123/opdrape/products/file.jpg`
/// gives `opdrape/products/file`
pub fn cloudinary_public_id(url: &str) -> Option<&str> {
    if !url.contains("cloudinary.com") {
        return None;
    }
    let start = url.find("/upload/")? + "/upload/".len();
    let mut rest = &url[start..];

    if let Some(stripped) = rest.strip_prefix('v') {
        if let Some((version, tail)) = stripped.split_once('/') {
            if !version.is_empty() && version.chars().all(|c| c.is_ascii_digit()) {
                rest = tail;
            }
        }
    }

    let name_start = rest.rfind('/').map_or(0, |i| i + 1);
    if let Some(dot) = rest[name_start..].rfind('.') {
        rest = &rest[..name_start + dot];
    }

    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}
