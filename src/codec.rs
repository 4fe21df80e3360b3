//! Type-tagged JSON codec for record graphs.
//!
//! [`JsonEncoder`] renders a record, and every record nested under its
//! foreign fields, as a JSON object of storage-form values. With tagging on,
//! each object carries a reserved key (`_type` by default) naming the
//! record's qualified type. [`JsonDecoder`] reverses this bottom-up: nested
//! objects are decoded first, and every tagged object is resolved through a
//! [`TypeRegistry`] and rebuilt with [`Record::new`]. Untagged objects stay
//! plain dicts.
//!
//! Decoding never validates; call [`Record::validate`] on the result.
//!
//! # Examples
//!
//! ```rust
//! use valley::codec::{JsonDecoder, JsonEncoder, TypeRegistry};
//! use valley::{Property, Record, SchemaType, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let breed = SchemaType::builder("Breed")
//!     .qualifier("kennel")
//!     .field("name", Property::string())
//!     .build()?;
//!
//! let mut types = TypeRegistry::new();
//! types.register(&breed);
//!
//! let cocker = Record::new(&breed, [("name", "Cocker")]);
//! let text = JsonEncoder::default().encode_str(&Value::from(cocker.clone()))?;
//! assert!(text.contains(r#""_type":"kennel.Breed""#));
//!
//! let decoded = JsonDecoder::new(&types).decode_record_str(&text)?;
//! assert_eq!(decoded, cocker);
//! # Ok(())
//! # }
//! ```

use crate::error::{ValleyError, ValleyResult};
use crate::property::{Property, StorageStrategy};
use crate::record::Record;
use crate::schema::SchemaType;
use crate::value::Value;
use log::{debug, trace};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Codec settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Reserved key holding the qualified type name
    pub type_key: String,
    /// Whether records are tagged on encode and tags honoured on decode
    pub tagged: bool,
    /// Rendering of dict and list fields
    pub storage: StorageStrategy,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            type_key: "_type".to_string(),
            tagged: true,
            storage: StorageStrategy::Native,
        }
    }
}

impl CodecConfig {
    pub fn untagged() -> Self {
        Self {
            tagged: false,
            ..Self::default()
        }
    }

    pub fn with_type_key(mut self, type_key: impl Into<String>) -> Self {
        self.type_key = type_key.into();
        self
    }

    pub fn with_storage(mut self, storage: StorageStrategy) -> Self {
        self.storage = storage;
        self
    }
}

/// Result of resolving a dotted name.
#[derive(Debug, Clone)]
pub enum Resolved {
    Schema(Arc<SchemaType>),
    Property(Arc<Property>),
}

/// Name to schema type lookup used by the decoder.
///
/// Types are registered explicitly under their qualified names.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<SchemaType>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema type, replacing any type with the same qualified
    /// name.
    pub fn register(&mut self, schema: &Arc<SchemaType>) -> &mut Self {
        let name = schema.qualified_name();
        debug!("Registering schema type {name}");
        self.types.insert(name, Arc::clone(schema));
        self
    }

    pub fn with(mut self, schema: &Arc<SchemaType>) -> Self {
        self.register(schema);
        self
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.types.contains_key(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Look up a schema type by qualified name.
    pub fn schema(&self, qualified_name: &str) -> ValleyResult<Arc<SchemaType>> {
        self.types
            .get(qualified_name)
            .cloned()
            .ok_or_else(|| ValleyError::type_not_found(qualified_name))
    }

    /// Resolve a dotted name to a schema type, or to a field descriptor when
    /// the last segment names a field of a registered type.
    pub fn resolve(&self, dotted: &str) -> ValleyResult<Resolved> {
        if let Some(schema) = self.types.get(dotted) {
            return Ok(Resolved::Schema(Arc::clone(schema)));
        }
        dotted
            .rsplit_once('.')
            .and_then(|(owner, field)| self.types.get(owner)?.field(field).cloned())
            .map(Resolved::Property)
            .ok_or_else(|| ValleyError::type_not_found(dotted))
    }
}

/// Encodes values and record graphs as JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonEncoder {
    config: CodecConfig,
}

impl JsonEncoder {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// An encoder for receivers that know the type out of band.
    pub fn untagged() -> Self {
        Self::new(CodecConfig::untagged())
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode any value, recursing into lists, dicts and records.
    pub fn encode(&self, value: &Value) -> ValleyResult<serde_json::Value> {
        let json = match value {
            Value::Record(record) => self.encode_record(record)?,
            Value::List(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| self.encode(item))
                    .collect::<ValleyResult<_>>()?,
            ),
            Value::Dict(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| self.encode(value).map(|json| (key.clone(), json)))
                    .collect::<ValleyResult<_>>()?,
            ),
            other => other.to_json(),
        };
        Ok(json)
    }

    /// Encode one record's storage form, tagging it when configured.
    ///
    /// # Errors
    ///
    /// Fails when a field's storage form cannot be produced, such as a
    /// single-return foreign field whose `return_prop` is missing.
    pub fn encode_record(&self, record: &Record) -> ValleyResult<serde_json::Value> {
        let mut object: serde_json::Map<String, serde_json::Value> = record
            .to_storage(self.config.storage)?
            .iter()
            .map(|(key, value)| self.encode(value).map(|json| (key.clone(), json)))
            .collect::<ValleyResult<_>>()?;
        if self.config.tagged {
            object.insert(
                self.config.type_key.clone(),
                serde_json::Value::String(record.schema().qualified_name()),
            );
        }
        Ok(serde_json::Value::Object(object))
    }

    pub fn encode_str(&self, value: &Value) -> ValleyResult<String> {
        Ok(serde_json::to_string(&self.encode(value)?)?)
    }
}

/// Decodes JSON into values, rebuilding tagged records.
#[derive(Debug, Clone)]
pub struct JsonDecoder<'a> {
    types: &'a TypeRegistry,
    config: CodecConfig,
}

impl<'a> JsonDecoder<'a> {
    pub fn new(types: &'a TypeRegistry) -> Self {
        Self::with_config(types, CodecConfig::default())
    }

    pub fn with_config(types: &'a TypeRegistry, config: CodecConfig) -> Self {
        Self { types, config }
    }

    pub fn decode_str(&self, text: &str) -> ValleyResult<Value> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        self.decode(json)
    }

    /// Decode a generic JSON tree, innermost nodes first.
    pub fn decode(&self, json: serde_json::Value) -> ValleyResult<Value> {
        match json {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| self.decode(item))
                .collect::<ValleyResult<Vec<_>>>()
                .map(Value::List),
            serde_json::Value::Object(map) => {
                let mut tag = None;
                let mut fields = BTreeMap::new();
                for (key, value) in map {
                    if self.config.tagged && key == self.config.type_key {
                        tag = Some(value);
                    } else {
                        fields.insert(key, self.decode(value)?);
                    }
                }
                match tag {
                    Some(tag) => self.build_record(&tag, fields).map(Value::from),
                    None => Ok(Value::Dict(fields)),
                }
            }
            scalar => Ok(Value::from(scalar)),
        }
    }

    /// Decode text whose top level must be a tagged record.
    pub fn decode_record_str(&self, text: &str) -> ValleyResult<Record> {
        match self.decode_str(text)? {
            Value::Record(record) => Ok(*record),
            other => Err(ValleyError::conversion("record", other.to_json())),
        }
    }

    /// Decode an untagged top-level object as a record of a known type.
    pub fn decode_as(&self, schema: &Arc<SchemaType>, text: &str) -> ValleyResult<Record> {
        match self.decode_str(text)? {
            Value::Dict(fields) => Ok(Record::new(schema, fields)),
            Value::Record(record) if record.schema().is_a(&schema.qualified_name()) => {
                Ok(*record)
            }
            other => Err(ValleyError::conversion("record", other.to_json())),
        }
    }

    fn build_record(
        &self,
        tag: &serde_json::Value,
        fields: BTreeMap<String, Value>,
    ) -> ValleyResult<Record> {
        let name = tag
            .as_str()
            .ok_or_else(|| ValleyError::type_not_found(tag.to_string()))?;
        let schema = self.types.schema(name)?;
        trace!("Decoding {} with {} fields", name, fields.len());
        Ok(Record::new(&schema, fields))
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        JsonEncoder::default()
            .encode(self)
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        JsonEncoder::default()
            .encode_record(self)
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}
