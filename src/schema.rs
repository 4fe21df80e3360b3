//! Schema types.
//!
//! A [`SchemaType`] is the runtime description of a record type: its name and
//! qualifier, its bases, the frozen [`FieldRegistry`] computed once by
//! [`SchemaBuilder::build`], the built-in attribute whitelist, the
//! error-collection mode and any per-field validation hooks.
//!
//! # Examples
//!
//! ```rust
//! use valley::{Property, SchemaType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let named = SchemaType::builder("NameSchema")
//!     .qualifier("kennel")
//!     .collect_errors(true)
//!     .field("name", Property::string().required(true))
//!     .build()?;
//!
//! let breed = SchemaType::builder("Breed").qualifier("kennel").extends(&named).build()?;
//! assert!(breed.registry().contains("name"));
//! assert!(breed.is_a("kennel.NameSchema"));
//! # Ok(())
//! # }
//! ```

use crate::error::{ValidationResult, ValleyError, ValleyResult};
use crate::property::{Property, PropertyBuilder};
use crate::record::Record;
use crate::registry::{FieldRegistry, Member, Namespace, collect_declared_fields};
use crate::validators::ForeignTarget;
use crate::value::Value;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Instance-level rule run after a field's validator chain passes.
pub type FieldHook = Arc<dyn Fn(&Record, &Value) -> ValidationResult<()> + Send + Sync>;

/// A composed schema type.
pub struct SchemaType {
    name: String,
    qualifier: String,
    bases: Vec<Arc<SchemaType>>,
    registry: Arc<FieldRegistry>,
    attributes: BTreeMap<String, Value>,
    builtin_attrs: Vec<String>,
    collect_errors: bool,
    hooks: HashMap<String, FieldHook>,
}

impl SchemaType {
    /// Start composing a schema type.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    /// `<qualifier>.<Name>`, or just the name when unqualified.
    pub fn qualified_name(&self) -> String {
        if self.qualifier.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.qualifier, self.name)
        }
    }

    /// Lower-cased type name.
    pub fn class_name(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn bases(&self) -> &[Arc<SchemaType>] {
        &self.bases
    }

    pub fn registry(&self) -> &Arc<FieldRegistry> {
        &self.registry
    }

    pub fn field(&self, name: &str) -> Option<&Arc<Property>> {
        self.registry.get(name)
    }

    /// Type-level plain attribute, own or inherited.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn builtin_attrs(&self) -> &[String] {
        &self.builtin_attrs
    }

    pub fn is_builtin_attr(&self, name: &str) -> bool {
        self.builtin_attrs.iter().any(|attr| attr == name)
    }

    /// Whether `validate()` collects errors instead of raising the first.
    pub fn collects_errors(&self) -> bool {
        self.collect_errors
    }

    pub fn hook(&self, field: &str) -> Option<&FieldHook> {
        self.hooks.get(field)
    }

    /// True if this type is, or inherits from, the named type.
    pub fn is_a(&self, qualified_name: &str) -> bool {
        self.qualified_name() == qualified_name
            || self.bases.iter().any(|base| base.is_a(qualified_name))
    }
}

impl fmt::Debug for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaType")
            .field("name", &self.qualified_name())
            .field("fields", &self.registry.names().collect::<Vec<_>>())
            .field("collect_errors", &self.collect_errors)
            .finish_non_exhaustive()
    }
}

impl From<&SchemaType> for ForeignTarget {
    fn from(schema: &SchemaType) -> Self {
        ForeignTarget::new(schema.qualified_name())
    }
}

impl From<&Arc<SchemaType>> for ForeignTarget {
    fn from(schema: &Arc<SchemaType>) -> Self {
        ForeignTarget::new(schema.qualified_name())
    }
}

enum Declared {
    Builder(PropertyBuilder),
    Member(Member),
}

/// Composes a [`SchemaType`]; the field registry is computed once in `build`.
pub struct SchemaBuilder {
    name: String,
    qualifier: String,
    bases: Vec<Arc<SchemaType>>,
    declared: Vec<(String, Declared)>,
    builtin_attrs: Vec<String>,
    collect_errors: Option<bool>,
    hooks: HashMap<String, FieldHook>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualifier: String::new(),
            bases: Vec::new(),
            declared: Vec::new(),
            builtin_attrs: Vec::new(),
            collect_errors: None,
            hooks: HashMap::new(),
        }
    }

    /// Namespace prefix used in the type tag.
    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    /// Add a base type. Bases are merged in the order they are added.
    pub fn extends(mut self, base: &Arc<SchemaType>) -> Self {
        self.bases.push(Arc::clone(base));
        self
    }

    /// Declare a field from a property builder.
    pub fn field(mut self, name: impl Into<String>, property: PropertyBuilder) -> Self {
        self.declared.push((name.into(), Declared::Builder(property)));
        self
    }

    /// Declare a field from an already-built property.
    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.declared
            .push((name.into(), Declared::Member(Member::Field(property))));
        self
    }

    /// Declare a plain type-level attribute.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.declared.push((
            name.into(),
            Declared::Member(Member::Attribute(value.into())),
        ));
        self
    }

    /// Whitelist a built-in attribute copied verbatim from constructor arguments.
    pub fn builtin_attr(mut self, name: impl Into<String>) -> Self {
        self.builtin_attrs.push(name.into());
        self
    }

    /// Opt in to (or out of) error collection; inherited when unset.
    pub fn collect_errors(mut self, collect: bool) -> Self {
        self.collect_errors = Some(collect);
        self
    }

    /// Register a `<field>_validate` style hook.
    pub fn hook<F>(mut self, field: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&Record, &Value) -> ValidationResult<()> + Send + Sync + 'static,
    {
        self.hooks.insert(field.into(), Arc::new(hook));
        self
    }

    pub fn build(self) -> ValleyResult<Arc<SchemaType>> {
        if self.name.is_empty() {
            return Err(ValleyError::configuration("schema types need a name"));
        }

        let mut namespace: Namespace = Vec::with_capacity(self.declared.len());
        for (name, declared) in self.declared {
            let member = match declared {
                Declared::Builder(builder) => Member::Field(builder.build().map_err(|e| {
                    ValleyError::configuration(format!("{}.{name}: {e}", self.name))
                })?),
                Declared::Member(member) => member,
            };
            namespace.push((name, member));
        }

        let base_registries: Vec<&FieldRegistry> =
            self.bases.iter().map(|base| base.registry.as_ref()).collect();
        let registry = collect_declared_fields(&mut namespace, &base_registries);

        // bases contribute in order; own declarations win
        let mut attributes = BTreeMap::new();
        let mut hooks = HashMap::new();
        let mut builtin_attrs: Vec<String> = Vec::new();
        for base in self.bases.iter().rev() {
            attributes.extend(base.attributes.clone());
            hooks.extend(base.hooks.clone());
        }
        for base in &self.bases {
            for attr in &base.builtin_attrs {
                if !builtin_attrs.contains(attr) {
                    builtin_attrs.push(attr.clone());
                }
            }
        }
        for (name, member) in namespace {
            if let Member::Attribute(value) = member {
                if registry.contains(&name) {
                    return Err(ValleyError::configuration(format!(
                        "{}.{name} is declared as both a field and an attribute",
                        self.name
                    )));
                }
                attributes.insert(name, value);
            }
        }
        hooks.extend(self.hooks);
        for attr in self.builtin_attrs {
            if registry.contains(&attr) {
                return Err(ValleyError::configuration(format!(
                    "{}.{attr} cannot be both a field and a built-in attribute",
                    self.name
                )));
            }
            if !builtin_attrs.contains(&attr) {
                builtin_attrs.push(attr);
            }
        }

        let collect_errors = self
            .collect_errors
            .or_else(|| self.bases.first().map(|base| base.collect_errors))
            .unwrap_or(false);

        let schema = SchemaType {
            name: self.name,
            qualifier: self.qualifier,
            bases: self.bases,
            registry: Arc::new(registry),
            attributes,
            builtin_attrs,
            collect_errors,
            hooks,
        };
        debug!(
            "Defined schema type {} with {} fields",
            schema.qualified_name(),
            schema.registry.len()
        );
        Ok(Arc::new(schema))
    }
}
