use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid program increment '{id}': {reason}")]
    InvalidProgramIncrement { id: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("missing required input: {0}")]
    MissingInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;
