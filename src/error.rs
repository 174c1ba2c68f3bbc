use thiserror::Error;

/// Errors that can end a protocol run.
///
/// Every fatal condition maps to exactly one variant, and every variant
/// maps to a distinct process exit code. The protocol is single-shot, so
/// there is no recovery path: callers report the error and exit.
#[derive(Debug, Error)]
pub enum GabesError {
    /// Malformed circuit file.
    #[error("parse error: {0}")]
    Parse(String),

    /// AEAD authentication failure, or an output label that matches
    /// neither of the garbler's output-wire labels.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// Socket I/O failure.
    #[error("network error: {0}")]
    Network(String),

    /// A message arrived out of order or with the wrong shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Command-line misuse.
    #[error("usage error: {0}")]
    Usage(String),
}

impl GabesError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            GabesError::Usage(_) => 1,
            GabesError::Parse(_) => 2,
            GabesError::Network(_) => 3,
            GabesError::Protocol(_) => 4,
            GabesError::Decryption(_) => 5,
        }
    }
}

impl From<std::io::Error> for GabesError {
    fn from(err: std::io::Error) -> Self {
        GabesError::Network(err.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GabesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            GabesError::Usage(String::new()),
            GabesError::Parse(String::new()),
            GabesError::Network(String::new()),
            GabesError::Protocol(String::new()),
            GabesError::Decryption(String::new()),
        ];

        let mut codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_io_error_maps_to_network() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: GabesError = io_err.into();
        assert!(matches!(err, GabesError::Network(_)));
        assert_eq!(err.exit_code(), 3);
    }
}
