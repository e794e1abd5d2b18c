use thiserror::Error;

/// Errors from the relational and vector storage layers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("schema violation: {0}")]
    Schema(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("corrupt index file: {0}")]
    Corrupt(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Errors raised by the memoization layer itself (never by the wrapped operation).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors from binding call-site arguments against a declared signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("too many positional arguments: expected at most {expected}, got {actual}")]
    TooManyPositional { expected: usize, actual: usize },

    #[error("unexpected argument '{0}'")]
    UnknownArgument(String),

    #[error("multiple values for argument '{0}'")]
    MultipleValues(String),

    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    #[error("parameter '{0}' declared twice")]
    DuplicateParameter(String),
}

/// Failure of a memoized call.
///
/// `Operation` carries the wrapped operation's own error untouched, so a
/// failing call looks the same with or without caching.
#[derive(Debug, Error)]
pub enum MemoizeError<E> {
    #[error("{0}")]
    Operation(E),

    #[error("argument binding failed: {0}")]
    Bind(#[from] BindError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl<E> MemoizeError<E> {
    /// The wrapped operation's error, if that is what failed.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            MemoizeError::Operation(err) => Some(err),
            _ => None,
        }
    }

    /// Consume the error, returning the wrapped operation's error if present.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            MemoizeError::Operation(err) => Some(err),
            _ => None,
        }
    }
}

impl<E> From<StoreError> for MemoizeError<E> {
    fn from(err: StoreError) -> Self {
        MemoizeError::Cache(CacheError::Store(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::DimensionMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, got 2");
    }

    #[test]
    fn test_bind_error_display() {
        let err = BindError::MissingArgument("prompt".to_string());
        assert_eq!(err.to_string(), "missing required argument 'prompt'");
    }

    #[test]
    fn test_operation_error_passes_through_display() {
        let err: MemoizeError<String> = MemoizeError::Operation("rate limited".to_string());
        assert_eq!(err.to_string(), "rate limited");
        assert_eq!(err.operation_error().map(String::as_str), Some("rate limited"));
    }

    #[test]
    fn test_store_error_converts_into_cache_variant() {
        let err: MemoizeError<std::io::Error> =
            StoreError::Unavailable("disk full".to_string()).into();
        assert!(matches!(
            err,
            MemoizeError::Cache(CacheError::Store(StoreError::Unavailable(_)))
        ));
        assert!(err.into_operation_error().is_none());
    }
}
