use std::fmt;

/// Convenient alias for results produced by this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can be produced while building, encoding or decoding scope
/// information.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wrapper around JSON (de)serialization failures of the host map.
    #[error("malformed source map JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed VLQ data or an ill-shaped host document. Fatal in every
    /// decoder mode.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Start/end items that do not nest, orphan payload items, or input
    /// that ends with open scopes or ranges.
    #[error("structural error: {0}")]
    Structure(String),

    /// A numeric cross-reference that does not resolve: an index outside
    /// the `names` table or an unknown definition-scope id.
    #[error("reference error: {0}")]
    Reference(String),

    /// A violation of the scope/range data model itself.
    #[error("semantic error: {0}")]
    Semantic(String),
}

impl Error {
    pub(crate) fn input<T: fmt::Display>(msg: T) -> Self {
        Self::InvalidInput(msg.to_string())
    }

    pub(crate) fn structure<T: fmt::Display>(msg: T) -> Self {
        Self::Structure(msg.to_string())
    }

    pub(crate) fn reference<T: fmt::Display>(msg: T) -> Self {
        Self::Reference(msg.to_string())
    }

    pub(crate) fn semantic<T: fmt::Display>(msg: T) -> Self {
        Self::Semantic(msg.to_string())
    }
}
