use crate::parser::Rule;
use thiserror::Error;

/// Failures at the `translate` boundary. Everything downstream of a
/// successful parse is total, so both variants describe unparseable input.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Failed to parse Solidity source, syntax error\n{0}")]
    Syntax(Box<pest::error::Error<Rule>>),
    #[error("Malformed syntax tree: {0}")]
    Malformed(String),
}

impl From<pest::error::Error<Rule>> for TranslateError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        TranslateError::Syntax(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, TranslateError>;

pub(crate) fn malformed(message: impl Into<String>) -> TranslateError {
    TranslateError::Malformed(message.into())
}
