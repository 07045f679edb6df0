//! Account endpoints: login, registration, password and profile

use crate::error::{ApiError, Result};
use crate::fallback::{Candidate, FallbackSequence};
use crate::types::{AuthResponse, Credentials, PasswordChange, ProfileUpdate, Registration, User};
use crate::ApiClient;
use log::{debug, info};
use reqwest::Method;
use serde_json::json;

/// Token and user established by a login or registration
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

pub struct AuthApi<'a> {
    api: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Log in with email and password. The token and the normalized user
    /// are stored in the session cache.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthSession> {
        let response: AuthResponse = self
            .api
            .send(Method::POST, "/users/login", Some(credentials))
            .await?;

        let session = Self::into_session(response)?;
        self.store(&session).await?;
        info!("logged in as {}", session.user.display_name());
        Ok(session)
    }

    /// Create an account. Required fields are checked before any request.
    pub async fn register(&self, registration: &Registration) -> Result<Option<AuthSession>> {
        let missing = registration.missing_fields();
        if !missing.is_empty() {
            return Err(ApiError::invalid_input(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let response: AuthResponse = self
            .api
            .send(Method::POST, "/users/register", Some(registration))
            .await
            .map_err(|err| match err {
                ApiError::Conflict(_) => {
                    ApiError::Conflict("This email is already registered".to_string())
                }
                ApiError::Validation(details) => {
                    ApiError::Validation(format!("Invalid registration data: {}", details))
                }
                other => other,
            })?;

        // Some deployments register without logging in
        if response.token.is_none() {
            debug!("registration returned no token");
            return Ok(None);
        }

        let session = Self::into_session(response)?;
        self.store(&session).await?;
        Ok(Some(session))
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let builder = self
            .api
            .request(Method::POST, "/users/forgot-password")
            .await?
            .json(&json!({ "email": email }))?;
        self.api.execute_unit(builder).await
    }

    /// Change the password of the logged-in user
    pub async fn change_password(&self, change: &PasswordChange) -> Result<()> {
        if self.api.session().token().await?.is_none() {
            return Err(ApiError::MissingSession);
        }

        let builder = self
            .api
            .request(Method::POST, "/users/change-password")
            .await?
            .json(change)?;
        self.api.execute_unit(builder).await
    }

    /// Current user's profile, from `/users/profile` or `/users/me`
    pub async fn get_profile(&self) -> Result<User> {
        let sequence = FallbackSequence::new(
            "get_profile",
            vec![Candidate::get("/users/profile"), Candidate::get("/users/me")],
        );

        let api = self.api;
        let attempted = sequence
            .run(|candidate| {
                let candidate = candidate.clone();
                async move { api.call::<User, ()>(&candidate, None).await }
            })
            .await?;

        Ok(attempted.value.normalized())
    }

    /// Update the current user's profile.
    ///
    /// The backend has accepted this under several routes and methods over
    /// time; they are tried in order until one exists.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let sequence = FallbackSequence::new(
            "update_profile",
            vec![
                Candidate::patch("/users/profile"),
                Candidate::post("/users/profile"),
                Candidate::put("/users/profile"),
                Candidate::patch("/users/me"),
                Candidate::post("/users/me"),
                Candidate::post("/users/update-profile"),
                Candidate::post("/users/update"),
            ],
        );

        let api = self.api;
        let attempted = sequence
            .run(|candidate| {
                let candidate = candidate.clone();
                async move { api.call::<User, _>(&candidate, Some(update)).await }
            })
            .await?;

        debug!(
            "profile updated via {}",
            sequence.candidates()[attempted.index]
        );
        let user = attempted.value.normalized();
        self.api.session().set_user(&user).await?;
        Ok(user)
    }

    fn into_session(response: AuthResponse) -> Result<AuthSession> {
        let token = response
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::decode("AuthResponse", "missing token"))?;
        let user = response
            .user
            .ok_or_else(|| ApiError::decode("AuthResponse", "missing user"))?
            .normalized();
        Ok(AuthSession { token, user })
    }

    async fn store(&self, session: &AuthSession) -> Result<()> {
        self.api.session().set_token(&session.token).await?;
        self.api.session().set_user(&session.user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, ApiClient) {
        let mock_server = MockServer::start().await;
        let api = ApiClient::new(&mock_server.uri()).unwrap();
        (mock_server, api)
    }

    #[tokio::test]
    async fn test_login_stores_token_and_user() {
        let (mock_server, api) = setup().await;

        Mock::given(method("POST"))
            .and(path("/users/login"))
            .and(body_json(json!({ "email": "a@b.c", "password": "secret" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "jwt-token",
                "user": { "_id": "u1", "email": "a@b.c", "role": "admin" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let session = api
            .auth()
            .login(&Credentials::new("a@b.c", "secret"))
            .await
            .unwrap();

        assert_eq!(session.token, "jwt-token");
        assert!(session.user.is_admin);
        assert_eq!(api.session().token().await.unwrap(), Some("jwt-token".into()));
        assert!(api.session().is_admin_flag().await.unwrap());
    }

    #[tokio::test]
    async fn test_register_validates_before_request() {
        let (mock_server, api) = setup().await;

        Mock::given(method("POST"))
            .and(path("/users/register"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = api.auth().register(&Registration::default()).await;
        match result {
            Err(ApiError::InvalidInput(msg)) => {
                assert_eq!(msg, "Missing required fields: firstname, lastname, email, password")
            }
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_conflict_message() {
        let (mock_server, api) = setup().await;

        Mock::given(method("POST"))
            .and(path("/users/register"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({ "message": "duplicate key" })),
            )
            .mount(&mock_server)
            .await;

        let registration = Registration {
            firstname: "Rahim".into(),
            lastname: "Uddin".into(),
            email: "rahim@example.com".into(),
            password: "hunter22".into(),
            phone: None,
        };
        let err = api.auth().register(&registration).await.unwrap_err();
        assert_eq!(err.user_message(), "This email is already registered");
    }

    #[tokio::test]
    async fn test_change_password_requires_session() {
        let (_mock_server, api) = setup().await;
        let change = PasswordChange {
            current_password: "old".into(),
            new_password: "new".into(),
        };
        assert!(matches!(
            api.auth().change_password(&change).await,
            Err(ApiError::MissingSession)
        ));
    }

    #[tokio::test]
    async fn test_get_profile_falls_back_to_me() {
        let (mock_server, api) = setup().await;

        Mock::given(method("GET"))
            .and(path("/users/profile"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "u1" })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let user = api.auth().get_profile().await.unwrap();
        assert_eq!(user.id(), Some("u1"));
    }
}
