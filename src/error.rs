//! Errors surfaced by the aggregation engine.

use std::fmt::Display;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A caller-supplied value could not be used. Nothing was queried.
    #[error("invalid {field}: {value:?}")]
    InvalidInput { field: &'static str, value: String },

    /// The record store could not be reached or the query failed.
    #[error("record store unavailable: {message}")]
    RecordStoreUnavailable { message: String },
}

impl EngineError {
    pub fn invalid_input(field: &'static str, value: impl Display) -> Self {
        Self::InvalidInput {
            field,
            value: value.to_string(),
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::RecordStoreUnavailable {
            message: message.into(),
        }
    }

    /// HTTP-equivalent status for the presentation layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput { .. } => 400,
            Self::RecordStoreUnavailable { .. } => 500,
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        Self::store_unavailable(err.to_string())
    }
}
