//! Error types for procmap
//!
//! All failures surfaced by the mapper are represented by the [`Error`] enum.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Categories
//!
//! | Category | Variants | Description |
//! |----------|----------|-------------|
//! | Setup | `Configuration`, `InvalidArgument` | Bad configuration or call arguments |
//! | Binding | `MissingParameter` | Required input found in neither bag nor entity |
//! | Conversion | `Cast`, `Overflow` | Value/type mismatch or numeric range exceeded |
//! | Entity | `UnsupportedEntityKind` | Scalar entity passed to a row-reading entry point |
//! | System | `Database`, `Internal` | Provider failures and invariant violations |
//!
//! Nothing is retried. Provider errors reach the caller unchanged.

use thiserror::Error;

/// Result type alias for procmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the mapper
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // ==================== Setup ====================
    /// Invalid mapper configuration
    #[error("configuration error: {reason}")]
    Configuration {
        /// What is wrong with the configuration
        reason: String,
    },

    /// A call argument was empty or otherwise unusable
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Argument name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    // ==================== Binding ====================
    /// Input parameter resolved from neither the bag nor the entity
    #[error("the required stored procedure parameter ({name}) does not exist in entity or was not specified")]
    MissingParameter {
        /// Parameter name without the marker prefix
        name: String,
    },

    // ==================== Conversion ====================
    /// Value cannot be converted to the requested type
    #[error("cannot cast from {from} to {to}")]
    Cast {
        /// Source type name
        from: String,
        /// Requested type name
        to: String,
    },

    /// Numeric value does not fit the destination type
    #[error("value {value} was either too large or too small for {to}")]
    Overflow {
        /// The value that did not fit
        value: String,
        /// Destination type name
        to: String,
    },

    // ==================== Entity ====================
    /// Row-reading entry points need a structured entity
    #[error("non-structured entity type '{entity}' is not supported for reading rows")]
    UnsupportedEntityKind {
        /// Entity type name
        entity: String,
    },

    // ==================== System ====================
    /// Failure reported by the database provider
    #[error("database error: {reason}")]
    Database {
        /// Provider message
        reason: String,
    },

    /// Internal error (bug or invariant violation)
    #[error("internal error: {reason}")]
    Internal {
        /// Description
        reason: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Error::Configuration {
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing parameter error
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Error::MissingParameter { name: name.into() }
    }

    /// Create a cast error naming both types
    pub fn cast(from: impl ToString, to: impl ToString) -> Self {
        Error::Cast {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Create an overflow error
    pub fn overflow(value: impl ToString, to: impl ToString) -> Self {
        Error::Overflow {
            value: value.to_string(),
            to: to.to_string(),
        }
    }

    /// Create an unsupported entity kind error
    pub fn unsupported_entity(entity: impl Into<String>) -> Self {
        Error::UnsupportedEntityKind {
            entity: entity.into(),
        }
    }

    /// Create a database error
    pub fn database(reason: impl Into<String>) -> Self {
        Error::Database {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Error::Internal {
            reason: reason.into(),
        }
    }

    /// Check if this is a cast error
    pub fn is_cast(&self) -> bool {
        matches!(self, Error::Cast { .. })
    }

    /// Check if this is an overflow error
    pub fn is_overflow(&self) -> bool {
        matches!(self, Error::Overflow { .. })
    }

    /// Check if this is a conversion failure of either kind
    pub fn is_conversion(&self) -> bool {
        self.is_cast() || self.is_overflow()
    }
}
