use thiserror::Error;

/// Failures surfaced by the batch engines.
///
/// Storage code works with `anyhow` internally; everything crossing the
/// public engine surface is converted into one of these variants.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("{entity} not found for {key}")]
    NotFound { entity: &'static str, key: String },
}

impl EngineError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
