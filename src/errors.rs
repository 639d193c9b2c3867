use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Container runtime unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Container runtime returned {status}: {message}")]
    RuntimeApi { status: u16, message: String },

    #[error("Container '{0}' not found")]
    ContainerNotFound(String),

    #[error("Invalid runtime response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Fixture is {current}, cannot {action}")]
    InvalidState {
        current: &'static str,
        action: &'static str,
    },

    #[error("Web application at {url} not ready after {waited_secs}s")]
    ReadinessTimeout { url: String, waited_secs: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// True for a runtime answer meaning "no such container"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HarnessError::ContainerNotFound(_) | HarnessError::RuntimeApi { status: 404, .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
