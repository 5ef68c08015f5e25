use thiserror::Error;

/// Failure of a single HTTP exchange. Never fatal for a virtual client.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("invalid endpoint URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Used by in-process transports (tests, stubs)
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout(error)
        } else {
            TransportError::Request(error)
        }
    }
}

/// Failure to obtain a credential. Aborts the run before any load is sent.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("login endpoint unreachable: {0}")]
    Unreachable(#[from] TransportError),

    #[error("login rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("login response has no string token at `{pointer}`")]
    MissingToken { pointer: String },

    #[error("login response token at `{pointer}` is empty")]
    EmptyToken { pointer: String },
}

/// Top-level library error
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("provisioning failed: {0}")]
    Provisioning(#[from] ProvisioningError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<validator::ValidationErrors> for HarnessError {
    fn from(errors: validator::ValidationErrors) -> Self {
        HarnessError::Config(errors.to_string())
    }
}
