//! Common test utilities for schema validation testing.
//!
//! This module provides the example schema types used across the suite and
//! assertion macros for comparing a record's error map.


/// Install a test logger once; repeated calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Assert that a record's error map is exactly the given field/message pairs.
macro_rules! assert_errors {
    ($record:expr, {}) => {
        assert!(
            $record.errors().is_empty(),
            "Expected no errors, got {:?}",
            $record.errors()
        );
    };
    ($record:expr, { $($field:expr => $message:expr),+ $(,)? }) => {{
        let expected: std::collections::BTreeMap<String, String> =
            [$(($field.to_string(), $message.to_string())),+].into_iter().collect();
        assert_eq!($record.errors(), &expected);
    }};
}

/// Assert that a result is a field-level validation failure on `$field`.
macro_rules! assert_validation_error {
    ($result:expr, $field:expr) => {
        match $result {
            Err(valley::ValleyError::Validation(error)) => assert_eq!(error.field(), $field),
            other => panic!("Expected validation error on {}, got {:?}", $field, other),
        }
    };
}
