use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the segmentation engine and its file glue.
///
/// The first five variants come from the engine itself. `FileSystem`,
/// `ImageProcessing` and `Encoding` are raised only by the raster
/// decoding/encoding layer around it.
#[derive(Error, Debug)]
pub enum SegError {
    #[error("Invalid shape: {reason}")]
    InvalidShape { reason: String },

    #[error("Invalid parameter: {field} {reason}")]
    InvalidParameter { field: String, reason: String },

    /// Internal invariant violation. Seeing this means a defect, not bad input.
    #[error("Invalid merge of regions {a} and {b}: {reason}")]
    InvalidMerge { a: u32, b: u32, reason: String },

    #[error("Label overflow: {regions} regions do not fit the output label type ({reason})")]
    LabelOverflow { regions: usize, reason: String },

    #[error("Segmentation cancelled after {rounds} merge rounds")]
    Cancelled { rounds: usize },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Encoding error: {operation} failed")]
    Encoding {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, SegError>;

impl SegError {
    pub(crate) fn invalid_parameter(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Call sites that know the path and operation should build
/// `SegError::FileSystem` themselves; this is the fallback.
impl From<std::io::Error> for SegError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

/// Convert image crate errors to image processing errors.
impl From<image::ImageError> for SegError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<serde_json::Error> for SegError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding {
            operation: "json serialization".to_string(),
            source: Box::new(err),
        }
    }
}

/// Shape errors from ndarray only occur while rebuilding arrays from
/// flat buffers, so they map onto `InvalidShape`.
impl From<ndarray::ShapeError> for SegError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::InvalidShape {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SegError::invalid_parameter("threshold", "must be >= 0, got -1");
        assert_eq!(
            err.to_string(),
            "Invalid parameter: threshold must be >= 0, got -1"
        );

        let err = SegError::InvalidMerge {
            a: 3,
            b: 3,
            reason: "region merged with itself".to_string(),
        };
        assert!(err.to_string().contains("regions 3 and 3"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        match SegError::from(io) {
            SegError::FileSystem { operation, .. } => assert_eq!(operation, "unknown"),
            other => panic!("Expected FileSystem error, got {other:?}"),
        }
    }
}
