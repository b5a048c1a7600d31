//! Entity-group payloads and attribute addressing.
//!
//! The upstream engine fans out many attributes per update. A payload
//! carries the required `id` array plus zero or more named scalar arrays;
//! each tapefile reads only the one array matching its configured
//! [`AttributeKey`] and ignores the rest.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::index::EntityId;

/// Addresses one (optionally component-nested) attribute array within an
/// entity-group payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeKey {
    /// Component namespace, `None` for a top-level attribute.
    pub component: Option<String>,

    /// Attribute name within the component (or top level).
    pub name: String,
}

impl AttributeKey {
    /// Key for a top-level attribute.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            component: None,
            name: name.into(),
        }
    }

    /// Key for an attribute nested under a component.
    pub fn nested(component: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.component {
            Some(component) => write!(f, "{}/{}", component, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One entity group's arrays as exchanged with the upstream engine.
///
/// `ids` is required and aligned element-for-element with every attribute
/// array. A `None` entry in an attribute array means "no information for
/// this entity in this delta", never "set to null".
#[derive(Debug, Clone)]
pub struct EntityGroupPayload<T> {
    ids: Vec<EntityId>,
    attributes: HashMap<AttributeKey, Vec<Option<T>>>,
}

impl<T> EntityGroupPayload<T> {
    /// Creates a payload carrying only the id array.
    pub fn new(ids: Vec<EntityId>) -> Self {
        Self {
            ids,
            attributes: HashMap::new(),
        }
    }

    /// Adds an attribute array (builder style).
    pub fn with_attribute(mut self, key: AttributeKey, values: Vec<Option<T>>) -> Self {
        self.attributes.insert(key, values);
        self
    }

    /// Adds or replaces an attribute array.
    pub fn set_attribute(&mut self, key: AttributeKey, values: Vec<Option<T>>) {
        self.attributes.insert(key, values);
    }

    /// The id array.
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    /// Looks up one attribute array by key.
    pub fn attribute(&self, key: &AttributeKey) -> Option<&[Option<T>]> {
        self.attributes.get(key).map(Vec::as_slice)
    }

    /// Number of entities addressed by this payload.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when the payload addresses no entities.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One sparse delta from the upstream engine.
///
/// `iteration` is the engine's strictly increasing sequence number;
/// several iterations may share a `timestamp`.
#[derive(Debug, Clone)]
pub struct UpdateDelta<T> {
    /// Scenario-relative time this delta takes effect.
    pub timestamp: f64,

    /// Strictly increasing engine sequence number.
    pub iteration: i64,

    /// The fan-out of attribute arrays for this delta.
    pub data: EntityGroupPayload<T>,
}

impl<T> UpdateDelta<T> {
    /// Creates a delta record.
    pub fn new(timestamp: f64, iteration: i64, data: EntityGroupPayload<T>) -> Self {
        Self {
            timestamp,
            iteration,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup_distinguishes_components() {
        let payload = EntityGroupPayload::new(vec![EntityId(1)])
            .with_attribute(AttributeKey::new("flow"), vec![Some(1.0)])
            .with_attribute(AttributeKey::nested("pipe", "flow"), vec![Some(2.0)]);

        assert_eq!(
            payload.attribute(&AttributeKey::new("flow")),
            Some(&[Some(1.0)][..])
        );
        assert_eq!(
            payload.attribute(&AttributeKey::nested("pipe", "flow")),
            Some(&[Some(2.0)][..])
        );
        assert_eq!(payload.attribute(&AttributeKey::new("missing")), None);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(AttributeKey::new("flow").to_string(), "flow");
        assert_eq!(
            AttributeKey::nested("pipe", "flow").to_string(),
            "pipe/flow"
        );
    }
}
