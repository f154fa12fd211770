//! Typed, validated configuration slots.
//!
//! A [`Property`] is a single schema-declared slot on a node or resource.
//! Structural validation (is the value's kind allowed?) happens eagerly at
//! assignment; presence of required values is checked lazily, when the
//! owning node executes. This two-phase policy means a node graph can be
//! constructed without fully-specified values ahead of time.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};

/// Marker element of wire-encoded typed values.
///
/// Regex and class-reference values survive plain-text round trips as a
/// 3-element tagged array: `[WIRE_MARKER, "regex" | "class", payload]`.
pub const WIRE_MARKER: &str = "__pw__";

/// Wire-encode a regex pattern.
pub fn wire_regex(pattern: &str) -> Value {
    json!([WIRE_MARKER, "regex", pattern])
}

/// Wire-encode a class-identifier reference.
pub fn wire_class(class: &str) -> Value {
    json!([WIRE_MARKER, "class", class])
}

/// If `value` is a wire-encoded typed value, return `(kind, payload)`.
pub(crate) fn wire_tag(value: &Value) -> Option<(&str, &str)> {
    let items = value.as_array()?;
    if items.len() != 3 || items[0].as_str() != Some(WIRE_MARKER) {
        return None;
    }
    Some((items[1].as_str()?, items[2].as_str()?))
}

/// The kinds a property value can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    /// A wire-encoded regex pattern.
    Regex,
    /// A wire-encoded class-identifier reference.
    ClassRef,
}

impl Kind {
    /// Classify a JSON value.
    pub fn of(value: &Value) -> Kind {
        if let Some((tag, _)) = wire_tag(value) {
            match tag {
                "regex" => return Kind::Regex,
                "class" => return Kind::ClassRef,
                _ => {}
            }
        }
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    Kind::Int
                } else {
                    Kind::Float
                }
            }
            Value::String(_) => Kind::Str,
            Value::Array(_) => Kind::List,
            Value::Object(_) => Kind::Map,
        }
    }
}

/// The state of a property's value slot.
///
/// `MissingRequired` is an explicit variant, not a sentinel object
/// compared by identity: "no value was ever supplied" is distinct from
/// every real value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Slot {
    #[default]
    Unset,
    MissingRequired,
    Present(Value),
}

/// A single typed configuration slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    slot: Slot,
    expected: Vec<Kind>,
    default: Option<Value>,
    required: bool,
    label: String,
    hint: Option<String>,
    display_options: BTreeMap<String, Value>,
}

impl Property {
    /// Create a property accepting the given kinds.
    pub fn new(label: &str, expected: impl Into<Vec<Kind>>) -> Self {
        Self {
            name: String::new(),
            slot: Slot::Unset,
            expected: expected.into(),
            default: None,
            required: false,
            label: label.to_string(),
            hint: None,
            display_options: BTreeMap::new(),
        }
    }

    /// Create a property that accepts any kind.
    pub fn any(label: &str) -> Self {
        Self::new(
            label,
            vec![
                Kind::Null,
                Kind::Bool,
                Kind::Int,
                Kind::Float,
                Kind::Str,
                Kind::List,
                Kind::Map,
                Kind::Regex,
                Kind::ClassRef,
            ],
        )
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Mark the property as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the hint text.
    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }

    /// Attach a display option for builder frontends.
    pub fn with_display_option(mut self, key: &str, value: Value) -> Self {
        self.display_options.insert(key.to_string(), value);
        self
    }

    /// Whether a value's kind is allowed by this property.
    pub fn validate(&self, value: &Value) -> bool {
        self.expected.contains(&Kind::of(value))
    }

    /// Assign a value; fails unless the value validates.
    ///
    /// Regex-kinded values must additionally carry a pattern that
    /// compiles.
    pub fn set_value(&mut self, value: Value) -> Result<()> {
        if !self.validate(&value) {
            return Err(Error::InvalidValue {
                property: self.name.clone(),
                expected: self.expected.clone(),
                actual: Kind::of(&value),
            });
        }
        if let Some(("regex", pattern)) = wire_tag(&value) {
            regex::Regex::new(pattern).map_err(|e| Error::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        }
        self.slot = Slot::Present(value);
        Ok(())
    }

    /// Mark the slot as "required but never supplied".
    pub fn set_missing_required(&mut self) {
        self.slot = Slot::MissingRequired;
    }

    /// The current value, if one is present.
    pub fn value(&self) -> Option<&Value> {
        match &self.slot {
            Slot::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub fn is_missing_required(&self) -> bool {
        self.slot == Slot::MissingRequired
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn display_options(&self) -> &BTreeMap<String, Value> {
        &self.display_options
    }

    /// The value as a string slice, if present and a string.
    pub fn as_str(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value().and_then(Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value().and_then(Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value().and_then(Value::as_bool)
    }

    /// Compile and return a regex-kinded value.
    pub fn as_regex(&self) -> Result<regex::Regex> {
        let pattern = self
            .value()
            .and_then(wire_tag)
            .filter(|(tag, _)| *tag == "regex")
            .map(|(_, p)| p)
            .ok_or_else(|| Error::PropertyNotFound(self.name.clone()))?;
        regex::Regex::new(pattern).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
    }
}

/// An insertion-ordered schema of named properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    owner: String,
    props: IndexMap<String, Property>,
}

impl PropertySet {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            props: IndexMap::new(),
        }
    }

    /// Declare a property under `name`. Replaces any previous declaration.
    pub fn insert(&mut self, name: &str, mut property: Property) -> &mut Self {
        property.name = name.to_string();
        self.props.insert(name.to_string(), property);
        self
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: &str, property: Property) -> Self {
        self.insert(name, property);
        self
    }

    pub fn get(&self, name: &str) -> Result<&Property> {
        self.props
            .get(name)
            .ok_or_else(|| Error::PropertyNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Property> {
        self.props
            .get_mut(name)
            .ok_or_else(|| Error::PropertyNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.props.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// Merge user-supplied overrides over the schema defaults.
    ///
    /// Unknown keys fail immediately (strict schema). Required properties
    /// with neither an override nor a default are tagged
    /// `MissingRequired`, which only becomes a failure when the owning
    /// node executes.
    pub fn apply(&mut self, overrides: &HashMap<String, Value>) -> Result<()> {
        for key in overrides.keys() {
            if !self.props.contains_key(key) {
                return Err(Error::UnknownProperty {
                    target: self.owner.clone(),
                    key: key.clone(),
                });
            }
        }
        for (name, prop) in self.props.iter_mut() {
            if let Some(value) = overrides.get(name) {
                prop.set_value(value.clone())?;
            } else if let Some(default) = prop.default.clone() {
                prop.set_value(default)?;
            } else if prop.required {
                prop.set_missing_required();
            }
        }
        Ok(())
    }

    /// The deferred presence check: fails on the first property still
    /// tagged `MissingRequired`.
    pub fn ensure_required(&self) -> Result<()> {
        for (name, prop) in &self.props {
            if prop.is_missing_required() {
                return Err(Error::MissingRequired {
                    property: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// The configuration surface shared by nodes and resources.
///
/// Implemented independently by node types and by
/// [`Resource`](crate::Resource); there is no shared mutable base.
pub trait Configurable {
    fn properties(&self) -> &PropertySet;
    fn properties_mut(&mut self) -> &mut PropertySet;

    /// Merge overrides over schema defaults. See [`PropertySet::apply`].
    fn apply_properties(&mut self, overrides: &HashMap<String, Value>) -> Result<()> {
        self.properties_mut().apply(overrides)
    }

    fn property(&self, name: &str) -> Result<&Property> {
        self.properties().get(name)
    }

    fn property_mut(&mut self, name: &str) -> Result<&mut Property> {
        self.properties_mut().get_mut(name)
    }
}
