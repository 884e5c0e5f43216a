//! Error types for spectral library operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, transforming or writing spectra.
#[derive(Error, Debug)]
pub enum SpectraError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error in a metadata table
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing error in a sensor table
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Sensor name not present in the registry
    #[error("Invalid sensor: {name}. Supported: {}", supported.join(", "))]
    UnsupportedSensor {
        /// The name that was looked up
        name: String,
        /// Every name the registry knows
        supported: Vec<String>,
    },

    /// Land cover label that resolves to no classification level
    #[error("Invalid land cover type: {label}. Get valid values from list_types()")]
    Classification {
        /// The unresolved label
        label: String,
    },

    /// A type-filtered request on spectra without metadata
    #[error("Metadata is not set")]
    MissingMetadata,

    /// No sidecar header next to a library file
    #[error("No header file found for {path:?}")]
    HeaderNotFound {
        /// Path the search started from
        path: PathBuf,
    },

    /// Header present but unreadable or unsupported
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header problem
        message: String,
    },

    /// Array, name list, metadata or band arrays disagree in length
    #[error("Shape mismatch: {message}")]
    Shape {
        /// Description of the mismatch
        message: String,
    },

    /// A metadata row with a value outside the classification scheme
    #[error("Invalid metadata: {message}")]
    InvalidMetadata {
        /// Description of the offending row
        message: String,
    },

    /// A spectrum name the header list syntax cannot carry
    #[error("Spectrum name '{name}' cannot be stored in a header list")]
    InvalidName {
        /// The offending name
        name: String,
    },
}

impl SpectraError {
    /// Create an invalid header error with a message.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create a shape mismatch error.
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }

    /// Create an invalid metadata error.
    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            message: message.into(),
        }
    }

    /// Create a classification error for an unresolved label.
    pub fn classification(label: impl Into<String>) -> Self {
        Self::Classification {
            label: label.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SpectraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_sensor_lists_names() {
        let err = SpectraError::UnsupportedSensor {
            name: "Foo".to_string(),
            supported: vec!["Landsat8".to_string(), "Sentinel2".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Foo"));
        assert!(msg.contains("Landsat8, Sentinel2"));
    }

    #[test]
    fn test_invalid_name_message() {
        let err = SpectraError::InvalidName {
            name: "a,b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Spectrum name 'a,b' cannot be stored in a header list"
        );
    }
}
