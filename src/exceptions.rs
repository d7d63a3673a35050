//! Error types for ladle

use std::fmt;

use crate::exec::ExitStatus;

/// Main error type for ladle operations
#[derive(Debug)]
pub enum LadleError {
    /// A child ran to completion but reported a non-success status.
    ///
    /// Carries the original argument vector, the exit status, and the
    /// captured (stream name, bytes) pairs for diagnostic surfacing.
    ExecutionFailed {
        /// Argument vector of the failed invocation
        argv: Vec<String>,
        /// Exit status the child reported
        status: ExitStatus,
        /// Tagged captured output, always at least a `"stdout"` entry when
        /// the invocation produced output
        output: Vec<(String, Vec<u8>)>,
    },

    /// Service definition or unit file error
    ServiceError(String),

    /// IO error
    IoError(std::io::Error),

    /// JSON parsing error
    JsonError(serde_json::Error),

    /// Generic error with message
    Generic(String),
}

impl fmt::Display for LadleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LadleError::ExecutionFailed {
                argv,
                status,
                output,
            } => {
                write!(f, "`{}` exited with {status}", argv.join(" "))?;
                for (stream, bytes) in output {
                    if bytes.is_empty() {
                        continue;
                    }
                    write!(f, "\n{stream}: {}", String::from_utf8_lossy(bytes))?;
                }
                Ok(())
            }
            LadleError::ServiceError(msg) => write!(f, "Service error: {msg}"),
            LadleError::IoError(err) => write!(f, "IO error: {err}"),
            LadleError::JsonError(err) => write!(f, "JSON error: {err}"),
            LadleError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for LadleError {}

impl From<std::io::Error> for LadleError {
    fn from(err: std::io::Error) -> Self {
        LadleError::IoError(err)
    }
}

impl From<serde_json::Error> for LadleError {
    fn from(err: serde_json::Error) -> Self {
        LadleError::JsonError(err)
    }
}

impl From<anyhow::Error> for LadleError {
    fn from(err: anyhow::Error) -> Self {
        LadleError::Generic(err.to_string())
    }
}

/// Result type for ladle operations
pub type Result<T> = std::result::Result<T, LadleError>;

#[cfg(test)]
mod tests {
    use super::LadleError;
    use crate::exec::ExitStatus;

    #[test]
    fn test_execution_failed_display_includes_command_and_output() {
        let err = LadleError::ExecutionFailed {
            argv: vec!["false".to_string(), "--flag".to_string()],
            status: ExitStatus::from_launch_failure(127),
            output: vec![("stdout".to_string(), b"partial\n".to_vec())],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("`false --flag` exited with 127"));
        assert!(rendered.contains("stdout: partial"));
    }

    #[test]
    fn test_execution_failed_display_skips_empty_streams() {
        let err = LadleError::ExecutionFailed {
            argv: vec!["true".to_string()],
            status: ExitStatus::from_launch_failure(1),
            output: vec![("stdout".to_string(), Vec::new())],
        };
        assert_eq!(err.to_string(), "`true` exited with 1");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err = LadleError::from(anyhow::anyhow!("boundary failure"));
        assert_eq!(err.to_string(), "boundary failure");
    }
}
