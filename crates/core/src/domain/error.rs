use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("unknown compound predicate kind: {0}")]
    UnknownCompoundKind(String),
    #[error("compound predicate `{kind}` expects {expected} operand(s), got {actual}")]
    InvalidCompoundArity {
        kind: &'static str,
        expected: &'static str,
        actual: usize,
    },
    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),
}
