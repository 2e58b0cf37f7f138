//! Error taxonomy for dump parsing, predicate evaluation and saving

use thiserror::Error;

/// Errors produced by the dump model and analysis engine
#[derive(Error, Debug)]
pub enum DumpError {
    /// Metadata line could not be parsed (identity missing or not numeric)
    #[error("Malformed metadata line '{line}': {reason}")]
    Parse { line: String, reason: String },

    /// Predicate expression failed to compile
    #[error("Invalid expression: {0}")]
    ExpressionSyntax(String),

    /// Predicate function called with the wrong number of arguments
    #[error("{function}() accepts exactly {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// Predicate raised while being evaluated against one task
    #[error("Failed to evaluate expression for task {id}: {reason}")]
    Evaluation { id: u64, reason: String },

    /// Predicate produced something other than a boolean
    #[error("Expression should return a boolean, got {found} for task {id}")]
    ResultType { id: u64, found: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for dump operations
pub type Result<T> = std::result::Result<T, DumpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_message() {
        let err = DumpError::Arity {
            function: "contains".to_string(),
            expected: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "contains() accepts exactly 2 argument(s), got 1"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DumpError = io.into();
        assert!(matches!(err, DumpError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }
}
