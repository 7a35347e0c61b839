use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for the programmable-matter benchmark core.
#[derive(Debug, Error)]
pub enum MatterError {
    #[error("invalid config field {field}: {reason}")]
    Config { field: &'static str, reason: String },

    #[error("controller {name} failed: {reason}")]
    Controller { name: String, reason: String },

    #[error("simulation_diverged: {field} is not finite at step {step}")]
    Diverged { field: &'static str, step: usize },

    #[error("run record missing {field}")]
    MissingRunField { field: &'static str },

    #[error("artifact write failed at {path}: {source}")]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
