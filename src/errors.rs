use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("invalid argument to `{call}`: {message}")]
    ArgumentShape { call: &'static str, message: String },

    #[error("`{call}` called out of sequence: {message}")]
    State { call: &'static str, message: String },

    #[error("{helper} cannot be used with {operation}")]
    Validation { helper: &'static str, operation: &'static str },

    #[error("adapter error: {0}")]
    Adapter(String),

    #[error("unsupported operator: {0}")]
    Unsupported(String),
}

impl QueryError {
    pub(crate) fn argument(call: &'static str, message: impl Into<String>) -> Self {
        Self::ArgumentShape { call, message: message.into() }
    }

    pub(crate) fn state(call: &'static str, message: impl Into<String>) -> Self {
        Self::State { call, message: message.into() }
    }

    /// True for errors raised by chain misuse, before any dispatch happened.
    #[must_use]
    pub const fn is_builder_error(&self) -> bool {
        matches!(self, Self::ArgumentShape { .. } | Self::State { .. } | Self::Validation { .. })
    }
}
