use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The upstream API reported an exhausted quota or a rate limit.
    #[error("Quota exceeded: {0}")]
    Quota(String),

    #[error("All {attempts} credentials exhausted: {last}")]
    CredentialsExhausted { attempts: usize, last: String },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// The generator answered, but not in the shape we asked for.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Image generation error: {0}")]
    ImageGeneration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// True for errors that should move the caller to the next credential.
    pub fn is_quota(&self) -> bool {
        matches!(self, Error::Quota(_))
    }

    /// True for errors worth a fixed-delay retry with the same request.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Error::ImageGeneration(_) => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidUrl(e.to_string())
    }
}

/// Fallback classification for upstream errors that carry no structured code.
///
/// Only used when the error body could not be decoded; a structured status
/// always takes precedence.
pub fn classify_error_text(message: &str) -> Error {
    let lowered = message.to_lowercase();
    if lowered.contains("quota") || lowered.contains("limit") || lowered.contains("429") {
        Error::Quota(message.to_string())
    } else {
        Error::Inference(message.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
