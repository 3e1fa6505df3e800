//! Error types
//!
//! Only configuration loading is fatal. Collaborator failures are reported to
//! the caller that attempted the creation, which logs and skips the entity.

use thiserror::Error;

/// Failure to load or validate the tuning document
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read tuning file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse tuning document: {0}")]
    Parse(#[from] serde_json::Error),
    /// Every validation problem found, gathered into one failure
    #[error("invalid tuning ({} problem(s)): {}", problems.len(), problems.join("; "))]
    Invalid { problems: Vec<String> },
}

/// Failure reported by the physics or render collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("physics body could not be created: {0}")]
    Body(String),
    #[error("render handle could not be created: {0}")]
    RenderHandle(String),
}
