//! Error types for dataset preparation, training and export.

use thiserror::Error;

/// Result type alias for the asana ML crate
pub type Result<T> = std::result::Result<T, MLError>;

/// Main error type for the asana ML crate
#[derive(Error, Debug)]
pub enum MLError {
    /// Features and labels disagree in length, or rows disagree in width
    #[error("Shape mismatch: {message}")]
    ShapeMismatch {
        /// Description of the mismatching shapes
        message: String,
    },

    /// A label string is not a key of the class map
    #[error("Unknown class '{label}' at row {row}")]
    UnknownClass {
        /// The offending label string
        label: String,
        /// 0-based row of the label
        row: usize,
    },

    /// A configured class received no samples
    #[error("Class '{class}' has no samples")]
    EmptyBucket {
        /// Name of the empty class
        class: String,
    },

    /// A raw feature value did not parse as a real number
    #[error("Invalid feature '{value}' at row {row}, column {column}")]
    InvalidFeature {
        /// 0-based row of the value
        row: usize,
        /// 0-based column of the value
        column: usize,
        /// The raw string that failed to parse
        value: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Data loading errors
    #[error("Data error: {message}")]
    Data {
        /// Error message describing the data issue
        message: String,
    },

    /// Model construction or export errors
    #[error("Model error: {message}")]
    Model {
        /// Error message describing the model issue
        message: String,
    },

    /// Training errors
    #[error("Training error: {message}")]
    Training {
        /// Error message describing the training issue
        message: String,
    },

    /// Invalid input errors
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the invalid input
        message: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML decoding errors
    #[error("TOML decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),

    /// TOML encoding errors
    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),
}

impl MLError {
    /// Create a shape mismatch error
    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }

    /// Create an unknown class error
    pub fn unknown_class(label: impl Into<String>, row: usize) -> Self {
        Self::UnknownClass {
            label: label.into(),
            row,
        }
    }

    /// Create an empty bucket error
    pub fn empty_bucket(class: impl Into<String>) -> Self {
        Self::EmptyBucket {
            class: class.into(),
        }
    }

    /// Create an invalid feature error
    pub fn invalid_feature(row: usize, column: usize, value: impl Into<String>) -> Self {
        Self::InvalidFeature {
            row,
            column,
            value: value.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a data error
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Create a model error
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model {
            message: message.into(),
        }
    }

    /// Create a training error
    pub fn training(message: impl Into<String>) -> Self {
        Self::Training {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable.
    ///
    /// Preparation and training errors come from bad data or bad
    /// configuration, so only I/O at the loader boundary is worth retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MLError::Io(_))
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self {
            MLError::ShapeMismatch { .. } => "shape_mismatch",
            MLError::UnknownClass { .. } => "unknown_class",
            MLError::EmptyBucket { .. } => "empty_bucket",
            MLError::InvalidFeature { .. } => "invalid_feature",
            MLError::Config { .. } => "configuration",
            MLError::Data { .. } => "data",
            MLError::Model { .. } => "model",
            MLError::Training { .. } => "training",
            MLError::InvalidInput { .. } => "invalid_input",
            MLError::Io(_) => "io",
            MLError::Csv(_) => "csv",
            MLError::Serialization(_) => "serialization",
            MLError::TomlDecode(_) | MLError::TomlEncode(_) => "toml",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = MLError::config("test config error");
        assert_eq!(err.category(), "configuration");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = MLError::unknown_class("yoga9", 4);
        assert_eq!(err.to_string(), "Unknown class 'yoga9' at row 4");

        let err = MLError::shape_mismatch("3 feature rows but 2 labels");
        assert_eq!(
            err.to_string(),
            "Shape mismatch: 3 feature rows but 2 labels"
        );
    }

    #[test]
    fn test_recoverable_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "X.csv");
        assert!(MLError::from(io).is_recoverable());
        assert!(!MLError::empty_bucket("yoga2").is_recoverable());
        assert!(!MLError::invalid_feature(0, 1, "abc").is_recoverable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(MLError::empty_bucket("yoga1").category(), "empty_bucket");
        assert_eq!(MLError::training("test").category(), "training");
        assert_eq!(
            MLError::invalid_feature(1, 2, "x").category(),
            "invalid_feature"
        );
    }
}
