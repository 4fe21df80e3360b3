//! Error types for schema definition, validation and JSON decoding.
//!
//! Field-level problems are reported as [`ValidationError`]s and may be
//! collected per record. Everything else in [`ValleyError`] indicates a
//! programming error (bad field configuration, unknown type tag) and is
//! always raised.

/// Main error type for valley operations.
#[derive(Debug, thiserror::Error)]
pub enum ValleyError {
    /// A field value violates a declared constraint
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A dotted type name could not be resolved during decode or lookup
    #[error("Type not found: {type_name}")]
    TypeResolution { type_name: String },

    /// A field was declared with an invalid combination of parameters
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    /// Neither a declared field nor an ordinary attribute matches
    #[error("'{schema}' object has no attribute '{name}'")]
    AttributeNotFound { schema: String, name: String },

    /// A stored value could not be converted to its use-value
    #[error("Cannot convert '{value}' to {kind}")]
    Conversion { kind: &'static str, value: String },

    /// JSON parsing or rendering errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors for field constraint checking.
///
/// Every variant names the offending field; the `Display` output is the
/// human-readable sentence stored in a record's error map.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Required value is absent or empty
    #[error("{field} is required and cannot be empty.")]
    Required { field: String },

    /// Value does not have the kind's shape
    #[error("{field} must be {expected}.")]
    InvalidType {
        field: String,
        expected: &'static str,
    },

    /// Length below `min_length`
    #[error("{field} must not be shorter than {min} characters.")]
    TooShort { field: String, min: usize },

    /// Length above `max_length`
    #[error("{field} must not be longer than {max} characters.")]
    TooLong { field: String, max: usize },

    /// Number below `min_value`
    #[error("{field} must not be less than {min}.")]
    BelowMinimum { field: String, min: String },

    /// Number above `max_value`
    #[error("{field} must not be greater than {max}.")]
    AboveMaximum { field: String, max: String },

    /// Value is not one of the configured choices
    #[error("{field} is not one of the allowed choices.")]
    InvalidChoice { field: String },

    /// Value is not a slug
    #[error("{field} must be a valid slug (only letters, numbers, hyphens, and underscores).")]
    InvalidSlug { field: String },

    /// Value is not an email address
    #[error("{field} must be a valid email address.")]
    InvalidEmail { field: String },

    /// Foreign value is not an instance of the target schema type
    #[error("{field} must be an instance of {type_name}.")]
    ForeignType { field: String, type_name: String },

    /// Foreign list contains an item that is not an instance of the target
    #[error("All items in {field} must be instances of {type_name}.")]
    ForeignListType { field: String, type_name: String },

    /// No alternative of a composite field accepted the value
    #[error("{field} must match one of: {alternatives}.")]
    NoMatchingAlternative { field: String, alternatives: String },

    /// Custom rule raised by a caller-supplied validator or field hook
    #[error("{message}")]
    Custom { field: String, message: String },
}

impl ValleyError {
    /// Create a type resolution error
    pub fn type_not_found(type_name: impl Into<String>) -> Self {
        Self::TypeResolution {
            type_name: type_name.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a conversion error
    pub fn conversion(kind: &'static str, value: impl ToString) -> Self {
        Self::Conversion {
            kind,
            value: value.to_string(),
        }
    }

    /// Create an attribute-not-found error
    pub fn attribute_not_found(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl ValidationError {
    /// Create a required-value error
    pub fn required(field: impl Into<String>) -> Self {
        Self::Required {
            field: field.into(),
        }
    }

    /// Create an invalid type error; `expected` reads as "a string", "an integer", ...
    pub fn invalid_type(field: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidType {
            field: field.into(),
            expected,
        }
    }

    /// Create a custom validation error
    pub fn custom(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Custom {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Name of the field that failed.
    pub fn field(&self) -> &str {
        match self {
            Self::Required { field }
            | Self::InvalidType { field, .. }
            | Self::TooShort { field, .. }
            | Self::TooLong { field, .. }
            | Self::BelowMinimum { field, .. }
            | Self::AboveMaximum { field, .. }
            | Self::InvalidChoice { field }
            | Self::InvalidSlug { field }
            | Self::InvalidEmail { field }
            | Self::ForeignType { field, .. }
            | Self::ForeignListType { field, .. }
            | Self::NoMatchingAlternative { field, .. }
            | Self::Custom { field, .. } => field,
        }
    }

    /// The user-facing message, as stored in a record's error map.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

// Result type aliases for convenience
pub type ValleyResult<T> = Result<T, ValleyError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
