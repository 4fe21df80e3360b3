//! Field descriptors.
//!
//! A [`Property`] describes one schema attribute: its kind, default,
//! constraints and the ordered validator chain those constraints activate.
//! Properties are built once through [`PropertyBuilder`] when a schema type
//! is composed and are immutable afterwards, shared by every record of that
//! type.
//!
//! # Examples
//!
//! ```rust
//! use valley::property::Property;
//! use valley::Value;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let name = Property::string()
//!     .required(true)
//!     .min_length(5)
//!     .max_length(20)
//!     .build()?;
//!
//! assert!(name.validate(&Value::from("Frank White"), "name").is_ok());
//! assert!(name.validate(&Value::from("Ira"), "name").is_err());
//! # Ok(())
//! # }
//! ```

use crate::error::{ValidationResult, ValleyError, ValleyResult};
use crate::validators::{CustomValidator, ForeignTarget, Validator, parse_date, parse_datetime};
use crate::value::Value;
use chrono::Utc;
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The kind of value a property holds.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    String,
    Slug,
    Email,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Dict,
    List,
    /// A single record of the target schema type
    Foreign(ForeignTarget),
    /// A list of records of the target schema type
    ForeignList(ForeignTarget),
    /// Any one of several kinds
    Composite(Vec<PropertyKind>),
}

impl PropertyKind {
    /// The shape check for this kind, or `None` for foreign kinds whose
    /// identity check is placed at the head of the chain instead.
    fn shape_validator(&self) -> Option<Validator> {
        match self {
            PropertyKind::String | PropertyKind::Slug | PropertyKind::Email => {
                Some(Validator::String)
            }
            PropertyKind::Integer => Some(Validator::Integer),
            PropertyKind::Float => Some(Validator::Float),
            PropertyKind::Boolean => Some(Validator::Boolean),
            PropertyKind::Date => Some(Validator::Date),
            PropertyKind::DateTime => Some(Validator::DateTime),
            PropertyKind::Dict => Some(Validator::Dict),
            PropertyKind::List => Some(Validator::List),
            PropertyKind::Foreign(target) => Some(Validator::Foreign(target.clone())),
            PropertyKind::ForeignList(target) => Some(Validator::ForeignList(target.clone())),
            PropertyKind::Composite(kinds) => Some(Validator::Composite(
                kinds.iter().filter_map(PropertyKind::shape_validator).collect(),
            )),
        }
    }

    fn is_foreign(&self) -> bool {
        matches!(self, PropertyKind::Foreign(_) | PropertyKind::ForeignList(_))
    }

    fn has_length(&self) -> bool {
        matches!(
            self,
            PropertyKind::String
                | PropertyKind::Slug
                | PropertyKind::Email
                | PropertyKind::Dict
                | PropertyKind::List
                | PropertyKind::ForeignList(_)
        )
    }

    fn is_numeric(&self) -> bool {
        matches!(self, PropertyKind::Integer | PropertyKind::Float)
    }

    fn is_temporal(&self) -> bool {
        matches!(self, PropertyKind::Date | PropertyKind::DateTime)
    }
}

/// A static default or a zero-argument producer.
#[derive(Clone, Default)]
pub enum DefaultValue {
    #[default]
    None,
    Static(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::None => write!(f, "None"),
            DefaultValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            DefaultValue::Producer(_) => write!(f, "Producer(..)"),
        }
    }
}

/// How a foreign field's records are rendered for storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignReturn {
    /// The nested record itself (type-tagged by the codec)
    #[default]
    Object,
    /// The nested record's plain store
    Dict,
    /// One attribute of the nested record, named by `return_prop`
    Single,
}

/// How dicts and lists are rendered for storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageStrategy {
    /// Keep dicts and lists structured
    #[default]
    Native,
    /// Render dicts and lists as JSON text, for flat key-value stores
    FlatText,
}

/// A field descriptor.
#[derive(Debug, Clone)]
pub struct Property {
    kind: PropertyKind,
    default: DefaultValue,
    required: bool,
    choices: Option<Vec<Value>>,
    verbose_name: Option<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    auto_now: bool,
    auto_now_add: bool,
    foreign_return: ForeignReturn,
    return_prop: Option<String>,
    validators: Vec<Validator>,
}

impl Property {
    pub fn string() -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::String)
    }

    pub fn slug() -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::Slug)
    }

    pub fn email() -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::Email)
    }

    pub fn integer() -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::Integer)
    }

    pub fn float() -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::Float)
    }

    /// Boolean fields ignore `required`; their chain is the boolean check alone.
    pub fn boolean() -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::Boolean)
    }

    /// Date fields are required unless told otherwise.
    pub fn date() -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::Date).required(true)
    }

    /// Datetime fields are required unless told otherwise.
    pub fn datetime() -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::DateTime).required(true)
    }

    pub fn dict() -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::Dict)
    }

    pub fn list() -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::List)
    }

    pub fn foreign(target: impl Into<ForeignTarget>) -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::Foreign(target.into()))
    }

    pub fn foreign_list(target: impl Into<ForeignTarget>) -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::ForeignList(target.into()))
    }

    pub fn composite(kinds: Vec<PropertyKind>) -> PropertyBuilder {
        PropertyBuilder::new(PropertyKind::Composite(kinds))
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn choices(&self) -> Option<&[Value]> {
        self.choices.as_deref()
    }

    pub fn verbose_name(&self) -> Option<&str> {
        self.verbose_name.as_deref()
    }

    pub fn min_length(&self) -> Option<usize> {
        self.min_length
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    pub fn min_value(&self) -> Option<f64> {
        self.min_value
    }

    pub fn max_value(&self) -> Option<f64> {
        self.max_value
    }

    pub fn foreign_return(&self) -> ForeignReturn {
        self.foreign_return
    }

    pub fn return_prop(&self) -> Option<&str> {
        self.return_prop.as_deref()
    }

    /// The resolved validator chain, in execution order.
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Run the chain in order, stopping at the first failure.
    pub fn validate(&self, value: &Value, key: &str) -> ValidationResult<()> {
        for validator in &self.validators {
            validator.validate(value, key)?;
        }
        Ok(())
    }

    /// Resolve the default, invoking a producer if one was given.
    ///
    /// `auto_now_add` date and datetime fields default to the current date or
    /// UTC timestamp.
    pub fn default_value(&self) -> Value {
        if self.auto_now_add {
            if let Some(now) = self.now() {
                return now;
            }
        }
        match &self.default {
            DefaultValue::None => Value::Null,
            DefaultValue::Static(value) => value.clone(),
            DefaultValue::Producer(produce) => produce(),
        }
    }

    /// Convert a value to its storage form with the native strategy.
    pub fn for_storage(&self, value: &Value) -> ValleyResult<Value> {
        self.for_storage_with(value, StorageStrategy::Native)
    }

    /// Convert a value to its storage form.
    ///
    /// Dates become `YYYY-MM-DD` text and datetimes ISO-8601 text with a
    /// trailing `Z`. `auto_now` fields substitute the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ValleyError::Configuration`] when a single-return foreign
    /// field names a `return_prop` the nested record does not have.
    pub fn for_storage_with(&self, value: &Value, strategy: StorageStrategy) -> ValleyResult<Value> {
        if self.auto_now {
            if let Some(now) = self.now() {
                return Ok(storage_value(&now, strategy));
            }
        }
        let value = self.for_use(value).unwrap_or_else(|_| value.clone());
        match (&self.kind, &value) {
            (PropertyKind::Foreign(_), Value::Record(_)) => self.foreign_storage(&value, strategy),
            (PropertyKind::ForeignList(_), Value::List(items)) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.foreign_storage(item, strategy))
                    .collect::<ValleyResult<_>>()?,
            )),
            _ => Ok(storage_value(&value, strategy)),
        }
    }

    fn foreign_storage(&self, value: &Value, strategy: StorageStrategy) -> ValleyResult<Value> {
        let Value::Record(record) = value else {
            return Ok(storage_value(value, strategy));
        };
        match self.foreign_return {
            ForeignReturn::Object => Ok(value.clone()),
            ForeignReturn::Dict => Ok(Value::Dict(record.to_storage(strategy)?)),
            ForeignReturn::Single => {
                let name = self.return_prop.as_deref().ok_or_else(|| {
                    ValleyError::configuration("single return mode requires return_prop")
                })?;
                let projected = record.get(name).map_err(|e| {
                    warn!("Cannot project {name} for storage: {e}");
                    ValleyError::configuration(format!(
                        "return_prop {name} is not an attribute of {}",
                        record.schema().name()
                    ))
                })?;
                Ok(storage_value(&projected, strategy))
            }
        }
    }

    /// Convert a stored value to its use-value.
    ///
    /// Parses date and datetime text, numeric text for numeric kinds, and JSON
    /// text for dict and list kinds. Every other value is returned unchanged,
    /// so a value of the wrong shape still fails the kind's shape check.
    pub fn for_use(&self, value: &Value) -> ValleyResult<Value> {
        let converted = match (&self.kind, value) {
            (_, Value::Null) => Value::Null,
            (PropertyKind::Date, Value::String(s)) => parse_date(s)
                .map(Value::Date)
                .ok_or_else(|| ValleyError::conversion("date", s))?,
            (PropertyKind::DateTime, Value::String(s)) => parse_datetime(s)
                .map(Value::DateTime)
                .ok_or_else(|| ValleyError::conversion("datetime", s))?,
            (PropertyKind::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| ValleyError::conversion("integer", s))?,
            (PropertyKind::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ValleyError::conversion("float", s))?,
            (PropertyKind::Dict, Value::String(s)) => match serde_json::from_str(s) {
                Ok(json @ serde_json::Value::Object(_)) => Value::from(json),
                _ => return Err(ValleyError::conversion("dict", s)),
            },
            (PropertyKind::List, Value::String(s)) => match serde_json::from_str(s) {
                Ok(json @ serde_json::Value::Array(_)) => Value::from(json),
                _ => return Err(ValleyError::conversion("list", s)),
            },
            _ => value.clone(),
        };
        Ok(converted)
    }

    fn now(&self) -> Option<Value> {
        match self.kind {
            PropertyKind::Date => Some(Value::Date(Utc::now().date_naive())),
            PropertyKind::DateTime => Some(Value::DateTime(Utc::now().naive_utc())),
            _ => None,
        }
    }
}

/// Storage form of an arbitrary value.
pub(crate) fn storage_value(value: &Value, strategy: StorageStrategy) -> Value {
    match value {
        Value::Date(d) => Value::String(crate::value::format_date(d)),
        Value::DateTime(dt) => Value::String(crate::value::format_datetime(dt)),
        Value::Dict(_) | Value::List(_) if strategy == StorageStrategy::FlatText => {
            Value::String(value.to_json().to_string())
        }
        Value::Dict(map) => Value::Dict(
            map.iter()
                .map(|(key, value)| (key.clone(), storage_value(value, strategy)))
                .collect(),
        ),
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| storage_value(item, strategy))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Fluent construction of a [`Property`].
#[derive(Debug, Clone)]
pub struct PropertyBuilder {
    kind: PropertyKind,
    default: DefaultValue,
    required: bool,
    choices: Option<Vec<Value>>,
    verbose_name: Option<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    auto_now: bool,
    auto_now_add: bool,
    foreign_return: ForeignReturn,
    return_prop: Option<String>,
    extra_validators: Vec<CustomValidator>,
}

impl PropertyBuilder {
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            kind,
            default: DefaultValue::None,
            required: false,
            choices: None,
            verbose_name: None,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            auto_now: false,
            auto_now_add: false,
            foreign_return: ForeignReturn::Object,
            return_prop: None,
            extra_validators: Vec::new(),
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set a static default value.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultValue::Static(value.into());
        self
    }

    /// Set a zero-argument producer invoked whenever a default is needed.
    pub fn default_with<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = DefaultValue::Producer(Arc::new(produce));
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn verbose_name(mut self, verbose_name: impl Into<String>) -> Self {
        self.verbose_name = Some(verbose_name.into());
        self
    }

    pub fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn min_value(mut self, min_value: impl Into<f64>) -> Self {
        self.min_value = Some(min_value.into());
        self
    }

    pub fn max_value(mut self, max_value: impl Into<f64>) -> Self {
        self.max_value = Some(max_value.into());
        self
    }

    pub fn auto_now(mut self, auto_now: bool) -> Self {
        self.auto_now = auto_now;
        self
    }

    pub fn auto_now_add(mut self, auto_now_add: bool) -> Self {
        self.auto_now_add = auto_now_add;
        self
    }

    pub fn foreign_return(mut self, foreign_return: ForeignReturn) -> Self {
        self.foreign_return = foreign_return;
        self
    }

    /// Attribute projected by [`ForeignReturn::Single`].
    pub fn return_prop(mut self, return_prop: impl Into<String>) -> Self {
        self.return_prop = Some(return_prop.into());
        self
    }

    /// Append a caller-supplied validator after the kind's shape checks.
    pub fn validator(mut self, validator: CustomValidator) -> Self {
        self.extra_validators.push(validator);
        self
    }

    /// Check the parameter combination and resolve the validator chain.
    pub fn build(self) -> ValleyResult<Property> {
        self.check_configuration()?;
        let validators = self.resolve_validators();
        let required = self.required && self.kind != PropertyKind::Boolean;
        trace!(
            "Built {:?} property with {} validators",
            self.kind,
            validators.len()
        );

        Ok(Property {
            kind: self.kind,
            default: self.default,
            required,
            choices: self.choices,
            verbose_name: self.verbose_name,
            min_length: self.min_length,
            max_length: self.max_length,
            min_value: self.min_value,
            max_value: self.max_value,
            auto_now: self.auto_now,
            auto_now_add: self.auto_now_add,
            foreign_return: self.foreign_return,
            return_prop: self.return_prop,
            validators,
        })
    }

    fn check_configuration(&self) -> ValleyResult<()> {
        if (self.min_length.is_some() || self.max_length.is_some()) && !self.kind.has_length() {
            return Err(ValleyError::configuration(format!(
                "length bounds are not supported by {:?} fields",
                self.kind
            )));
        }
        if (self.min_value.is_some() || self.max_value.is_some()) && !self.kind.is_numeric() {
            return Err(ValleyError::configuration(format!(
                "value bounds are not supported by {:?} fields",
                self.kind
            )));
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(ValleyError::configuration(format!(
                    "min_length {min} exceeds max_length {max}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                return Err(ValleyError::configuration(format!(
                    "min_value {min} exceeds max_value {max}"
                )));
            }
        }
        if (self.auto_now || self.auto_now_add) && !self.kind.is_temporal() {
            return Err(ValleyError::configuration(
                "auto_now and auto_now_add require a date or datetime field",
            ));
        }
        if self.foreign_return != ForeignReturn::Object && !self.kind.is_foreign() {
            return Err(ValleyError::configuration(
                "a return mode requires a foreign field",
            ));
        }
        if self.foreign_return == ForeignReturn::Single && self.return_prop.is_none() {
            return Err(ValleyError::configuration(
                "single return mode requires return_prop",
            ));
        }
        if let PropertyKind::Composite(kinds) = &self.kind {
            if kinds.len() < 2 {
                return Err(ValleyError::configuration(
                    "composite fields need at least two alternative kinds",
                ));
            }
        }
        Ok(())
    }

    // Order: foreign identity, choice, required, shape, pattern, custom,
    // length, range.
    fn resolve_validators(&self) -> Vec<Validator> {
        if self.kind == PropertyKind::Boolean {
            if self.required {
                warn!("required has no meaning for boolean fields and is ignored");
            }
            return vec![Validator::Boolean];
        }

        let mut chain = Vec::new();
        let shape = self.kind.shape_validator();
        if self.kind.is_foreign() {
            chain.extend(shape.clone());
        }
        if let Some(choices) = &self.choices {
            chain.push(Validator::Choice(choices.clone()));
        }
        if self.required {
            chain.push(Validator::Required);
        }
        if !self.kind.is_foreign() {
            chain.extend(shape);
        }
        match self.kind {
            PropertyKind::Slug => chain.push(Validator::Slug),
            PropertyKind::Email => chain.push(Validator::Email),
            _ => {}
        }
        chain.extend(self.extra_validators.iter().cloned().map(Validator::Custom));
        if let Some(min) = self.min_length {
            chain.push(Validator::MinLength(min));
        }
        if let Some(max) = self.max_length {
            chain.push(Validator::MaxLength(max));
        }
        if let Some(min) = self.min_value {
            chain.push(Validator::MinValue(min));
        }
        if let Some(max) = self.max_value {
            chain.push(Validator::MaxValue(max));
        }

        let mut deduped: Vec<Validator> = Vec::with_capacity(chain.len());
        for validator in chain {
            if !deduped.contains(&validator) {
                deduped.push(validator);
            }
        }
        deduped
    }
}
