//! Schema instances.
//!
//! A [`Record`] holds the data for one instance of a [`SchemaType`]. Its
//! internal store covers exactly the declared fields plus any whitelisted
//! built-in attributes. Field reads go through the descriptor's use-value
//! conversion; field writes store the raw value and defer conversion to the
//! next read or `validate()`.
//!
//! # Examples
//!
//! ```rust
//! use valley::{Property, Record, SchemaType, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let student = SchemaType::builder("Student")
//!     .collect_errors(true)
//!     .field("name", Property::string().required(true).min_length(5).max_length(20))
//!     .field("age", Property::integer().min_value(5).max_value(18))
//!     .build()?;
//!
//! let mut ira = Record::new(&student, [("name", Value::from("Ira")), ("age", Value::from(18))]);
//! ira.validate()?;
//! assert!(!ira.is_valid());
//! assert_eq!(ira.errors()["name"], "name must not be shorter than 5 characters.");
//! # Ok(())
//! # }
//! ```

use crate::error::{ValleyError, ValleyResult};
use crate::property::{StorageStrategy, storage_value};
use crate::schema::SchemaType;
use crate::value::Value;
use log::{debug, trace};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One instance of a schema type.
#[derive(Clone)]
pub struct Record {
    schema: Arc<SchemaType>,
    data: BTreeMap<String, Value>,
    attrs: BTreeMap<String, Value>,
    errors: BTreeMap<String, String>,
    is_valid: bool,
    cleaned_data: Option<BTreeMap<String, Value>>,
}

impl Record {
    /// Construct an instance from named arguments.
    ///
    /// Every declared field is seeded from its argument, or from the field's
    /// default when the argument is absent or null, and passed through the
    /// use-value conversion. A conversion failure keeps the raw value.
    /// Whitelisted built-in attributes are copied verbatim; other names are
    /// ignored.
    pub fn new<I, K, V>(schema: &Arc<SchemaType>, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut args: BTreeMap<String, Value> = args
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        let mut data = BTreeMap::new();
        for (name, property) in schema.registry().iter() {
            let raw = match args.remove(name) {
                Some(value) if !value.is_null() => value,
                _ => property.default_value(),
            };
            let value = match property.for_use(&raw) {
                Ok(converted) => converted,
                Err(e) => {
                    trace!("Keeping raw value for {}.{name}: {e}", schema.name());
                    raw
                }
            };
            data.insert(name.to_string(), value);
        }
        for (name, value) in args {
            if schema.is_builtin_attr(&name) {
                if !value.is_empty() {
                    data.insert(name, value);
                }
            } else {
                trace!("Ignoring unknown argument {name} for {}", schema.name());
            }
        }

        Self {
            schema: Arc::clone(schema),
            data,
            attrs: BTreeMap::new(),
            errors: BTreeMap::new(),
            is_valid: false,
            cleaned_data: None,
        }
    }

    pub fn schema(&self) -> &Arc<SchemaType> {
        &self.schema
    }

    /// Read an attribute.
    ///
    /// Declared fields return their use-value. Other names fall through to
    /// built-in attributes, instance attributes and then type-level
    /// attributes.
    pub fn get(&self, name: &str) -> ValleyResult<Value> {
        if let Some(property) = self.schema.field(name) {
            let raw = self.data.get(name).cloned().unwrap_or_default();
            return Ok(property.for_use(&raw).unwrap_or(raw));
        }
        self.data
            .get(name)
            .or_else(|| self.attrs.get(name))
            .or_else(|| self.schema.attribute(name))
            .cloned()
            .ok_or_else(|| ValleyError::attribute_not_found(self.schema.name(), name))
    }

    /// Write an attribute.
    ///
    /// Declared fields and built-in attributes are stored raw in the internal
    /// store; any other name becomes an ordinary instance attribute.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        if self.schema.field(name).is_some() || self.schema.is_builtin_attr(name) {
            self.data.insert(name.to_string(), value);
        } else {
            self.attrs.insert(name.to_string(), value);
        }
    }

    /// Run every field's validator chain and hook.
    ///
    /// In collect mode every failure is recorded in [`errors`](Self::errors),
    /// the call always completes and [`is_valid`](Self::is_valid) is true iff
    /// no field failed. Otherwise the first failure is returned as
    /// [`ValleyError::Validation`]. On completion the store and
    /// [`cleaned_data`](Self::cleaned_data) hold the use-value conversions.
    pub fn validate(&mut self) -> ValleyResult<()> {
        let schema = Arc::clone(&self.schema);
        let collect = schema.collects_errors();
        let mut cleaned = self.data.clone();
        let mut errors = BTreeMap::new();

        for (name, property) in schema.registry().iter() {
            let value = cleaned.get(name).cloned().unwrap_or_default();
            let outcome = property
                .validate(&value, name)
                .and_then(|()| match schema.hook(name) {
                    Some(hook) => hook(self, &value),
                    None => Ok(()),
                });

            if let Err(error) = outcome {
                if !collect {
                    debug!("{} failed validation: {error}", schema.name());
                    self.errors = BTreeMap::from([(name.to_string(), error.message())]);
                    self.is_valid = false;
                    self.cleaned_data = None;
                    return Err(error.into());
                }
                errors.insert(name.to_string(), error.message());
            }

            let converted = property.for_use(&value).unwrap_or(value);
            cleaned.insert(name.to_string(), converted);
        }

        self.is_valid = errors.is_empty();
        debug!(
            "Validated {}: {} errors",
            schema.name(),
            errors.len()
        );
        self.errors = errors;
        self.data = cleaned.clone();
        self.cleaned_data = Some(cleaned);
        Ok(())
    }

    /// Result of the last completed `validate()`.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Field name to message, from the last `validate()`.
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Use-value snapshot from the last completed `validate()`.
    pub fn cleaned_data(&self) -> Option<&BTreeMap<String, Value>> {
        self.cleaned_data.as_ref()
    }

    /// The raw internal store.
    pub fn to_dict(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    /// The internal store as untagged JSON text.
    pub fn to_json(&self) -> ValleyResult<String> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .data
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect();
        Ok(serde_json::to_string(&object)?)
    }

    /// Storage form of every stored entry.
    ///
    /// # Errors
    ///
    /// Propagates the configuration error of a foreign field whose
    /// `return_prop` cannot be projected.
    pub fn to_storage(&self, strategy: StorageStrategy) -> ValleyResult<BTreeMap<String, Value>> {
        self.data
            .iter()
            .map(|(key, value)| {
                let stored = match self.schema.field(key) {
                    Some(property) => property.for_storage_with(value, strategy),
                    None => Ok(storage_value(value, strategy)),
                };
                stored.map(|stored| (key.clone(), stored))
            })
            .collect()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.qualified_name() == other.schema.qualified_name()
            && self.data == other.data
            && self.attrs == other.attrs
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("schema", &self.schema.qualified_name())
            .field("data", &self.data)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.schema.name();
        write!(f, "<{name}: ({name} Object)>")
    }
}
