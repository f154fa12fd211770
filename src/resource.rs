//! Resources and their ordered containers.

use crate::property::{Configurable, Property, PropertySet};
use serde_json::Value;

/// The wildcard shapes accepted by [`Container::find`] and store queries.
///
/// Exactly four forms exist: exact, `*`, `prefix*`, `*suffix`. Anything
/// else (an inner `*`, combined forms) is treated as an exact literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Exact(String),
    Any,
    Prefix(String),
    Suffix(String),
}

impl Pattern {
    pub fn parse(text: &str) -> Pattern {
        if text == "*" {
            Pattern::Any
        } else if let Some(prefix) = text.strip_suffix('*') {
            if prefix.contains('*') {
                Pattern::Exact(text.to_string())
            } else {
                Pattern::Prefix(prefix.to_string())
            }
        } else if let Some(suffix) = text.strip_prefix('*') {
            if suffix.contains('*') {
                Pattern::Exact(text.to_string())
            } else {
                Pattern::Suffix(suffix.to_string())
            }
        } else {
            Pattern::Exact(text.to_string())
        }
    }

    pub fn matches(&self, id: &str) -> bool {
        match self {
            Pattern::Exact(s) => id == s,
            Pattern::Any => true,
            Pattern::Prefix(p) => id.starts_with(p.as_str()),
            Pattern::Suffix(s) => id.ends_with(s.as_str()),
        }
    }
}

/// An opaque labeled value addressable through the store.
///
/// The prefix decides which store bucket the resource lands in; the name
/// identifies it within the bucket. Named properties are readable through
/// dotted queries (`Prefix:Name.property`).
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    prefix: String,
    name: String,
    value: Value,
    props: PropertySet,
}

impl Resource {
    pub fn new(prefix: &str, name: &str, value: Value) -> Self {
        Self {
            prefix: prefix.to_string(),
            name: name.to_string(),
            value,
            props: PropertySet::new(name),
        }
    }

    /// The store bucket this resource belongs to.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The identifier within the bucket.
    pub fn id(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    /// Attach an ad hoc scalar attribute, creating the property slot if
    /// the schema does not declare one.
    pub fn set_property(&mut self, name: &str, value: Value) -> crate::Result<()> {
        if !self.props.contains(name) {
            self.props.insert(name, Property::any(name));
        }
        self.props.get_mut(name)?.set_value(value)
    }

    /// Builder-style [`set_property`](Self::set_property). Ad hoc slots
    /// accept any kind; the one rejectable input, a wire-encoded regex
    /// that does not compile, is discarded.
    pub fn with_property(mut self, name: &str, value: Value) -> Self {
        if !self.props.contains(name) {
            self.props.insert(name, Property::any(name));
        }
        if let Ok(prop) = self.props.get_mut(name) {
            let _ = prop.set_value(value);
        }
        self
    }
}

impl Configurable for Resource {
    fn properties(&self) -> &PropertySet {
        &self.props
    }

    fn properties_mut(&mut self) -> &mut PropertySet {
        &mut self.props
    }
}

/// An ordered, insertion-stable sequence of resources.
///
/// Mutated only via [`add`](Self::add) and [`merge`](Self::merge);
/// [`find`](Self::find) is a pure read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    items: Vec<Resource>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single resource.
    pub fn add(&mut self, resource: Resource) {
        self.items.push(resource);
    }

    /// Append a copy of every resource in another container.
    pub fn merge(&mut self, other: &Container) {
        self.items.extend(other.items.iter().cloned());
    }

    /// All resources whose id matches the pattern, in insertion order.
    pub fn find(&self, pattern: &str) -> Vec<&Resource> {
        let pattern = Pattern::parse(pattern);
        self.items.iter().filter(|r| pattern.matches(r.id())).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
