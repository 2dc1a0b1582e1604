use thiserror::Error;

/// Core error types for supervisor operations
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Launch failure: {0}")]
    Launch(String),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Flag-check file corrupt: {0}")]
    ManifestCorrupt(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),

    #[error("A conversion job is already in flight")]
    JobInFlight,

    #[error("Timeout occurred: {0}")]
    Timeout(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl SupervisorError {
    /// Check if this error is a synchronous refusal that happens before any
    /// process is spawned
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            SupervisorError::Configuration(_)
                | SupervisorError::Launch(_)
                | SupervisorError::JobInFlight
        )
    }

    /// Check if this error is delivered through a conversion outcome rather
    /// than thrown across the process boundary
    pub fn is_reported_via_outcome(&self) -> bool {
        matches!(
            self,
            SupervisorError::Conversion(_)
                | SupervisorError::ManifestCorrupt(_)
                | SupervisorError::Timeout(_)
                | SupervisorError::Cancelled
        )
    }
}
