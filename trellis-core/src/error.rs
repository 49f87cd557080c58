use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrellisError {
    /// A caller contract violation: a malformed state graph, an unknown
    /// state reference, or wrapping a walker that has not reached an
    /// accepting position. Grammar *mismatch* is never an error; a token
    /// that cannot be consumed simply produces an empty walker set.
    #[error("invalid grammar: {0}")]
    InvalidGrammar(String),
}

pub type Result<T> = std::result::Result<T, TrellisError>;
