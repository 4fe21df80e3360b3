//! The closed set of field validators.
//!
//! A [`Validator`] is a stateless predicate plus its parameters. Each one
//! checks a single value against a single constraint and either passes
//! silently or returns a [`ValidationError`] naming the field. All validators
//! except [`Validator::Required`] treat an empty value as nothing to check.

use crate::error::{ValidationError, ValidationResult};
use crate::value::{Value, format_number};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-\w]+$").expect("invalid slug pattern"));

// dot-atom or quoted-string local part, then a dotted domain
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?i)^(?:[-!#$%&'*+/=?^_`{}|~0-9A-Z]+(?:\.[-!#$%&'*+/=?^_`{}|~0-9A-Z]+)*"#,
        r#"|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f!#-\[\]-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*")"#,
        r#"@(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z]{2,6}\.?$"#,
    ))
    .expect("invalid email pattern")
});

/// Check signature for caller-supplied validators.
pub type CheckFn = dyn Fn(&Value, &str) -> ValidationResult<()> + Send + Sync;

/// A named caller-supplied validator.
///
/// Two custom validators are the same validator when their names match, which
/// is what chain de-duplication relies on.
#[derive(Clone)]
pub struct CustomValidator {
    name: String,
    check: Arc<CheckFn>,
}

impl CustomValidator {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value, &str) -> ValidationResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CustomValidator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// The schema type a foreign field points at, by qualified name.
///
/// Holding the name rather than the type itself lets a schema reference
/// itself or a type defined later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignTarget {
    qualified_name: String,
}

impl ForeignTarget {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// The bare type name, e.g. `Breed` for `kennel.Breed`.
    pub fn type_name(&self) -> &str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }

    fn accepts(&self, value: &Value) -> bool {
        value
            .as_record()
            .is_some_and(|record| record.schema().is_a(&self.qualified_name))
    }
}

impl From<&str> for ForeignTarget {
    fn from(qualified_name: &str) -> Self {
        Self::new(qualified_name)
    }
}

impl From<String> for ForeignTarget {
    fn from(qualified_name: String) -> Self {
        Self::new(qualified_name)
    }
}

/// Field validators, dispatched by variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// Presence check; the only validator that rejects empty values
    Required,
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
    MinLength(usize),
    MaxLength(usize),
    MinValue(f64),
    MaxValue(f64),
    /// Membership in an enumerated set
    Choice(Vec<Value>),
    /// Value must be a record of the target type (or a subtype)
    Foreign(ForeignTarget),
    /// Every element must be a record of the target type
    ForeignList(ForeignTarget),
    /// Accepts a value if any alternative accepts it
    Composite(Vec<Validator>),
    Custom(CustomValidator),
}

impl Validator {
    /// Check `value`, reporting failures against `key`.
    pub fn validate(&self, value: &Value, key: &str) -> ValidationResult<()> {
        if let Validator::Required = self {
            return if value.is_empty() {
                Err(ValidationError::required(key))
            } else {
                Ok(())
            };
        }
        if value.is_empty() {
            return Ok(());
        }

        match self {
            Validator::Required => Ok(()),
            Validator::Boolean => match value {
                Value::Bool(_) => Ok(()),
                _ => Err(ValidationError::invalid_type(key, "a boolean")),
            },
            Validator::String => match value {
                Value::String(_) => Ok(()),
                _ => Err(ValidationError::invalid_type(key, "a string")),
            },
            Validator::Slug => match value.as_str() {
                Some(s) if SLUG_PATTERN.is_match(s) => Ok(()),
                _ => Err(ValidationError::InvalidSlug {
                    field: key.to_string(),
                }),
            },
            Validator::Email => match value.as_str() {
                Some(s) if EMAIL_PATTERN.is_match(s) => Ok(()),
                _ => Err(ValidationError::InvalidEmail {
                    field: key.to_string(),
                }),
            },
            Validator::Integer => match value {
                Value::Integer(_) => Ok(()),
                Value::String(s) if s.trim().parse::<i64>().is_ok() => Ok(()),
                _ => Err(ValidationError::invalid_type(key, "an integer")),
            },
            Validator::Float => match value {
                Value::Float(_) => Ok(()),
                Value::String(s) if s.trim().parse::<f64>().is_ok() => Ok(()),
                _ => Err(ValidationError::invalid_type(key, "a float")),
            },
            Validator::Date => match value {
                Value::Date(_) => Ok(()),
                Value::String(s) if parse_date(s).is_some() => Ok(()),
                _ => Err(ValidationError::invalid_type(key, "a valid date")),
            },
            Validator::DateTime => match value {
                Value::DateTime(_) => Ok(()),
                Value::String(s) if parse_datetime(s).is_some() => Ok(()),
                _ => Err(ValidationError::invalid_type(key, "a valid datetime")),
            },
            Validator::Dict => match value {
                Value::Dict(_) => Ok(()),
                Value::String(s) if json_text(s).is_some_and(|j| j.is_object()) => Ok(()),
                _ => Err(ValidationError::invalid_type(key, "a dictionary")),
            },
            Validator::List => match value {
                Value::List(_) => Ok(()),
                Value::String(s) if json_text(s).is_some_and(|j| j.is_array()) => Ok(()),
                _ => Err(ValidationError::invalid_type(key, "a list")),
            },
            Validator::MinLength(min) => match value.len() {
                Some(len) if len < *min => Err(ValidationError::TooShort {
                    field: key.to_string(),
                    min: *min,
                }),
                _ => Ok(()),
            },
            Validator::MaxLength(max) => match value.len() {
                Some(len) if len > *max => Err(ValidationError::TooLong {
                    field: key.to_string(),
                    max: *max,
                }),
                _ => Ok(()),
            },
            Validator::MinValue(min) => match numeric(value) {
                Some(n) if n < *min => Err(ValidationError::BelowMinimum {
                    field: key.to_string(),
                    min: format_number(*min),
                }),
                _ => Ok(()),
            },
            Validator::MaxValue(max) => match numeric(value) {
                Some(n) if n > *max => Err(ValidationError::AboveMaximum {
                    field: key.to_string(),
                    max: format_number(*max),
                }),
                _ => Ok(()),
            },
            Validator::Choice(choices) => {
                if choices.contains(value) || numeric_choice(choices, value) {
                    Ok(())
                } else {
                    Err(ValidationError::InvalidChoice {
                        field: key.to_string(),
                    })
                }
            }
            Validator::Foreign(target) => {
                if target.accepts(value) {
                    Ok(())
                } else {
                    Err(ValidationError::ForeignType {
                        field: key.to_string(),
                        type_name: target.type_name().to_string(),
                    })
                }
            }
            Validator::ForeignList(target) => {
                let all_match = value
                    .as_list()
                    .is_some_and(|items| items.iter().all(|item| target.accepts(item)));
                if all_match {
                    Ok(())
                } else {
                    Err(ValidationError::ForeignListType {
                        field: key.to_string(),
                        type_name: target.type_name().to_string(),
                    })
                }
            }
            Validator::Composite(alternatives) => {
                if alternatives.iter().any(|v| v.validate(value, key).is_ok()) {
                    Ok(())
                } else {
                    let names: Vec<&str> = alternatives.iter().map(Validator::describe).collect();
                    Err(ValidationError::NoMatchingAlternative {
                        field: key.to_string(),
                        alternatives: names.join(", "),
                    })
                }
            }
            Validator::Custom(custom) => (custom.check)(value, key),
        }
    }

    /// Short description used when listing composite alternatives.
    pub fn describe(&self) -> &str {
        match self {
            Validator::Required => "required",
            Validator::String => "string",
            Validator::Slug => "slug",
            Validator::Email => "email",
            Validator::Integer => "integer",
            Validator::Float => "float",
            Validator::Boolean => "boolean",
            Validator::Date => "date",
            Validator::DateTime => "datetime",
            Validator::Dict => "dict",
            Validator::List => "list",
            Validator::MinLength(_) => "min_length",
            Validator::MaxLength(_) => "max_length",
            Validator::MinValue(_) => "min_value",
            Validator::MaxValue(_) => "max_value",
            Validator::Choice(_) => "choice",
            Validator::Foreign(target) | Validator::ForeignList(target) => target.type_name(),
            Validator::Composite(_) => "composite",
            Validator::Custom(custom) => custom.name(),
        }
    }
}

/// Numeric view of a value, parsing numeric strings.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    }
}

/// A numeric string matches a numeric choice of equal value.
fn numeric_choice(choices: &[Value], value: &Value) -> bool {
    let Value::String(s) = value else {
        return false;
    };
    s.trim()
        .parse::<f64>()
        .is_ok_and(|n| choices.iter().any(|choice| choice.as_f64() == Some(n)))
}

/// Parse JSON text, as used by the flat-text storage of dicts and lists.
fn json_text(s: &str) -> Option<serde_json::Value> {
    serde_json::from_str(s).ok()
}

/// Parse `YYYY-MM-DD`.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parse an ISO-8601 datetime, with or without fractional seconds and with a
/// trailing `Z` or a UTC offset. Offsets are normalised to UTC.
pub(crate) fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    let naive = s.strip_suffix('Z').unwrap_or(s);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}
