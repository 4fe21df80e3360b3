//! Declarative schema validation for Rust.
//!
//! Schema types are declared once from typed field descriptors, inherit and
//! override fields from their bases, and validate instance data either by
//! failing on the first problem or by collecting every field's error. Record
//! graphs round-trip through a type-tagged JSON codec.
//!
//! # Core Components
//!
//! - [`Property`] - Field descriptor with its validator chain
//! - [`SchemaType`] - Composed schema type holding a frozen field registry
//! - [`Record`] - One instance of a schema type
//! - [`codec`] - Type-tagged JSON encoding and decoding
//!
//! # Quick Start
//!
//! ```rust
//! use valley::{Property, Record, SchemaType, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let student = SchemaType::builder("Student")
//!     .field("name", Property::string().required(true).min_length(5))
//!     .field("age", Property::integer().max_value(18))
//!     .build()?;
//!
//! let mut frank = Record::new(&student, [("name", Value::from("Frank White")), ("age", Value::from(18))]);
//! frank.validate()?;
//! assert!(frank.is_valid());
//!
//! frank.set("name", "Ira");
//! assert!(frank.validate().is_err());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod property;
pub mod record;
pub mod registry;
pub mod schema;
pub mod validators;
pub mod value;

// Re-export commonly used types for convenience
pub use codec::{CodecConfig, JsonDecoder, JsonEncoder, Resolved, TypeRegistry};
pub use error::{ValidationError, ValidationResult, ValleyError, ValleyResult};
pub use property::{ForeignReturn, Property, PropertyBuilder, PropertyKind, StorageStrategy};
pub use record::Record;
pub use registry::{FieldRegistry, Member};
pub use schema::{SchemaBuilder, SchemaType};
pub use validators::{CustomValidator, ForeignTarget, Validator};
pub use value::Value;
