use thiserror::Error;

/// Errors that can occur while parsing a rule condition expression.
///
/// These never escape the rule engine: a condition that fails to parse
/// produces an inert rule rather than a user-visible error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("Unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("Unexpected token '{found}' at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        offset: usize,
    },

    #[error("Unexpected end of expression, expected {0}")]
    UnexpectedEnd(String),

    #[error("Unknown path root '{0}', expected one of: data, itemData, ctx, user")]
    UnknownRoot(String),

    #[error("Unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),

    #[error("Trailing input after expression at offset {0}")]
    TrailingInput(usize),
}

/// Errors that can occur while evaluating a parsed condition expression.
///
/// Like parse errors these are swallowed at the rule layer and resolve
/// the rule to `false`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(
        "Type mismatch during operation '{operation}': expected {expected}, but found value '{found}'"
    )]
    TypeMismatch {
        operation: String,
        expected: String,
        found: String,
    },
}
