//! External collaborators consumed by the step processors.
//!
//! Each collaborator sits behind a narrow async trait so processors can be
//! tested against in-process fakes:
//!
//! - [`youtube::VideoSource`] - video metadata and comments
//! - [`llm::TextGenerator`] - natural-language generation
//! - [`sentiment`] - pure scoring heuristics, no I/O

pub mod llm;
pub mod sentiment;
pub mod youtube;

/// Errors returned by collaborator clients.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ServiceError {
    /// The requested resource does not exist (or is private).
    #[error("{what} not found")]
    NotFound { what: String },

    /// The upstream answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request exceeded its timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure (DNS resolution, TCP connect, TLS handshake).
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The upstream answered but the body could not be understood.
    #[error("Unexpected response: {message}")]
    Decode { message: String },

    /// A required credential is not configured.
    #[error("{0} is not configured")]
    MissingCredentials(&'static str),
}

impl ServiceError {
    /// Classify a [`reqwest::Error`] into the appropriate variant.
    pub fn classify_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection {
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            Self::Decode {
                message: err.to_string(),
            }
        } else {
            Self::Connection {
                message: err.to_string(),
            }
        }
    }

    /// Returns the error category as a static string for log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Http { .. } => "http",
            Self::Timeout => "timeout",
            Self::Connection { .. } => "connection",
            Self::Decode { .. } => "decode",
            Self::MissingCredentials(_) => "credentials",
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        Self::classify_reqwest(&err)
    }
}

/// Turns a non-success response into [`ServiceError::Http`], keeping the
/// first part of the body for diagnostics.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Http {
        status: status.as_u16(),
        body: body.chars().take(512).collect(),
    })
}
