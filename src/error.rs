// src/error.rs
//! Error types for the wardrive pipeline

use std::fmt;

pub type Result<T> = std::result::Result<T, WardriveError>;

#[derive(Debug)]
pub enum WardriveError {
    Io(std::io::Error),
    Serial(tokio_serial::Error),
    Json(serde_json::Error),
    Config(String),
    /// A write to an export file failed; the data is queued for retry.
    Storage { file: String, source: std::io::Error },
    /// The session has been stopped and accepts no further writes.
    SessionClosed,
    Other(String),
}

impl fmt::Display for WardriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WardriveError::Io(e) => write!(f, "IO error: {}", e),
            WardriveError::Serial(e) => write!(f, "Serial error: {}", e),
            WardriveError::Json(e) => write!(f, "JSON error: {}", e),
            WardriveError::Config(msg) => write!(f, "Config error: {}", msg),
            WardriveError::Storage { file, source } => {
                write!(f, "Storage error on {}: {}", file, source)
            }
            WardriveError::SessionClosed => write!(f, "Session is closed"),
            WardriveError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for WardriveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WardriveError::Io(e) => Some(e),
            WardriveError::Serial(e) => Some(e),
            WardriveError::Json(e) => Some(e),
            WardriveError::Storage { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WardriveError {
    fn from(error: std::io::Error) -> Self {
        WardriveError::Io(error)
    }
}

impl From<tokio_serial::Error> for WardriveError {
    fn from(error: tokio_serial::Error) -> Self {
        WardriveError::Serial(error)
    }
}

impl From<serde_json::Error> for WardriveError {
    fn from(error: serde_json::Error) -> Self {
        WardriveError::Json(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_storage_error_display() {
        let err = WardriveError::Storage {
            file: "wardrive_20240101_000000.csv".to_string(),
            source: io::Error::new(io::ErrorKind::Other, "disk full"),
        };
        let msg = err.to_string();
        assert!(msg.contains("wardrive_20240101_000000.csv"));
        assert!(msg.contains("disk full"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_serial_conversion() {
        fn open() -> Result<()> {
            Err(tokio_serial::Error::new(tokio_serial::ErrorKind::NoDevice, "no such port"))?;
            Ok(())
        }
        let err = open().unwrap_err();
        assert!(matches!(err, WardriveError::Serial(_)));
        assert!(err.to_string().contains("no such port"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_conversion() {
        let err: WardriveError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, WardriveError::Io(_)));
    }
}
