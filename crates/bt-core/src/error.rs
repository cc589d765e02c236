use thiserror::Error;

/// Errors raised while building or querying engine state.
///
/// Tick paths never produce these; they surface at construction and lookup time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown symbol id {0}")]
    UnknownSymbol(u32),

    #[error("state '{state}' already holds an entry for '{key}'")]
    DuplicateStateEntry { state: String, key: String },
}

impl CoreError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
