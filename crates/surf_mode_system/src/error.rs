//! Error types for capability discovery and the extension lifecycle
//!
//! The display strings double as the diagnostics the host's plugin manager
//! shows when a load aborts; they are never surfaced to players.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Failed to find {0} interface")]
    NotFound(String),

    #[error("Capability {0} has an unexpected type")]
    TypeMismatch(String),
}

#[derive(Debug, Error)]
pub enum ModeLifecycleError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("Failed to initialize modules: {0}")]
    ModuleInit(String),

    #[error("Failed to get game config")]
    ConfigMissing,

    #[error("Failed to register mode {short_name}")]
    RegistrationFailed { short_name: String },

    #[error("Mode extension is not loaded")]
    NotLoaded,
}

pub type ModeResult<T> = Result<T, ModeLifecycleError>;
