use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("Risk {risk_id} is mapped to mitigations: {}. Remove mappings first.", mitigations.join(", "))]
    RiskInUse {
        risk_id: String,
        mitigations: Vec<String>,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CanvasError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CanvasError::Validation(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CanvasError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CanvasError>;
