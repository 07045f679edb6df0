//! Ordered endpoint candidates for operations whose route is unstable on the
//! backend.
//!
//! A [`FallbackSequence`] is a list of `(method, path)` descriptors plus a
//! retry predicate. Candidates are attempted one at a time, in declared
//! order; an error advances to the next candidate only when the predicate
//! accepts it. The default predicate is [`ApiError::is_route_miss`], so only
//! 404 and 405 move the sequence forward.

use crate::error::{ApiError, Result};
use log::{debug, warn};
use reqwest::Method;
use std::future::Future;

/// One endpoint/method combination to try
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub method: Method,
    pub path: String,
}

impl Candidate {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Result of a successful sequence run
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    /// Index of the candidate that succeeded
    pub index: usize,
    /// Number of attempts made, including the successful one
    pub attempts: usize,
}

/// Predicate deciding whether an error advances to the next candidate
pub type RetryPredicate = fn(&ApiError) -> bool;

/// Advance on every error except an authentication failure
pub fn any_but_unauthorized(err: &ApiError) -> bool {
    !err.is_unauthorized()
}

/// An ordered list of candidates tried until one succeeds
#[derive(Debug, Clone)]
pub struct FallbackSequence {
    name: &'static str,
    candidates: Vec<Candidate>,
    advance_on: RetryPredicate,
}

impl FallbackSequence {
    /// Create a sequence that advances only on 404/405
    pub fn new(name: &'static str, candidates: Vec<Candidate>) -> Self {
        Self {
            name,
            candidates,
            advance_on: ApiError::is_route_miss,
        }
    }

    /// Declare a different retry predicate
    pub fn advance_on(mut self, predicate: RetryPredicate) -> Self {
        self.advance_on = predicate;
        self
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Try each candidate in order until one succeeds.
    ///
    /// A non-advancing error is returned as-is. Running out of candidates
    /// returns [`ApiError::Exhausted`] carrying the last error.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<Attempted<T>>
    where
        F: FnMut(&Candidate) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last = None;

        for (index, candidate) in self.candidates.iter().enumerate() {
            debug!("{}: attempt {} -> {}", self.name, index + 1, candidate);
            match attempt(candidate).await {
                Ok(value) => {
                    return Ok(Attempted {
                        value,
                        index,
                        attempts: index + 1,
                    })
                }
                Err(err) if (self.advance_on)(&err) => {
                    debug!("{}: {} failed ({}), trying next", self.name, candidate, err);
                    last = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        warn!(
            "{}: all {} endpoint attempts failed",
            self.name,
            self.candidates.len()
        );
        Err(ApiError::Exhausted {
            attempts: self.candidates.len(),
            last: Box::new(last.unwrap_or_else(|| {
                ApiError::invalid_input(format!("{} has no candidates", self.name))
            })),
        })
    }
}
