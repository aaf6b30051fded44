use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("{message} at position {position}")]
    Lex { position: usize, message: String },

    #[error("{message} at position {position}")]
    Parse { position: usize, message: String },

    /// Raised while evaluating: type errors, unknown identifiers, bad calls
    #[error("{0}")]
    Runtime(String),
}

impl ExprError {
    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        ExprError::Runtime(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ExprError>;
