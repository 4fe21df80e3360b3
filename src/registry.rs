//! Field registries and the declaration merge.
//!
//! When a schema type is composed, its namespace is scanned for field
//! descriptors. Those are pulled out of the namespace and merged with the
//! registries of the type's bases into one frozen [`FieldRegistry`]: the
//! type's own fields first, in declaration order, followed by inherited
//! fields in base order, with the most-derived declaration winning on a name
//! collision.

use crate::property::Property;
use crate::value::Value;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// One entry of a schema type's declared namespace.
#[derive(Debug, Clone)]
pub enum Member {
    /// A field descriptor, collected into the registry
    Field(Property),
    /// A plain type-level attribute, left in the namespace
    Attribute(Value),
}

impl From<Property> for Member {
    fn from(property: Property) -> Self {
        Member::Field(property)
    }
}

/// Declared members in declaration order.
pub type Namespace = Vec<(String, Member)>;

/// Ordered mapping of field name to descriptor for one schema type.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<(String, Arc<Property>)>,
    index: HashMap<String, usize>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a type's own fields with its bases' registries.
    ///
    /// Own fields keep their order and always win. Each base contributes, in
    /// order, the names not already present.
    pub fn merge(own: Vec<(String, Arc<Property>)>, bases: &[&FieldRegistry]) -> Self {
        let mut registry = Self::new();
        for (name, property) in own {
            registry.insert(name, property);
        }
        for base in bases {
            for (name, property) in &base.fields {
                if !registry.contains(name) {
                    registry.insert(name.clone(), Arc::clone(property));
                }
            }
        }
        registry
    }

    // Re-inserting a name replaces the descriptor in place.
    fn insert(&mut self, name: String, property: Arc<Property>) {
        match self.index.get(&name) {
            Some(&position) => self.fields[position].1 = property,
            None => {
                self.index.insert(name.clone(), self.fields.len());
                self.fields.push((name, property));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Property>> {
        self.index.get(name).map(|&position| &self.fields[position].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Fields in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Property>)> {
        self.fields
            .iter()
            .map(|(name, property)| (name.as_str(), property))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Pull field descriptors out of `namespace` and merge them with `bases`.
///
/// After the call `namespace` holds only plain attributes.
pub fn collect_declared_fields(namespace: &mut Namespace, bases: &[&FieldRegistry]) -> FieldRegistry {
    let mut own = Vec::new();
    let mut plain = Vec::with_capacity(namespace.len());
    for (name, member) in namespace.drain(..) {
        match member {
            Member::Field(property) => own.push((name, Arc::new(property))),
            Member::Attribute(value) => plain.push((name, Member::Attribute(value))),
        }
    }
    *namespace = plain;

    let registry = FieldRegistry::merge(own, bases);
    debug!(
        "Collected {} fields from namespace and {} bases",
        registry.len(),
        bases.len()
    );
    registry
}
