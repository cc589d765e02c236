use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::symbol::Symbol;
use crate::value::Value;

/// The registry an entity lives in on the blackboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EntityCategory {
    Agent,
    Element,
    Location,
    Tool,
    Layer,
    Module,
}

impl EntityCategory {
    pub const ALL: [EntityCategory; 6] = [
        EntityCategory::Agent,
        EntityCategory::Element,
        EntityCategory::Location,
        EntityCategory::Tool,
        EntityCategory::Layer,
        EntityCategory::Module,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityCategory::Agent => "agent",
            EntityCategory::Element => "element",
            EntityCategory::Location => "location",
            EntityCategory::Tool => "tool",
            EntityCategory::Layer => "layer",
            EntityCategory::Module => "module",
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::invalid(format!("unknown entity category '{s}'")))
    }
}

/// A generic entity instance (agent, element, location, ...).
///
/// `name` mirrors the blackboard key the entity is stored under; the blackboard writes it on
/// insertion. It is metadata only and never used as a pointer back into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: Symbol,
    pub type_name: Symbol,
    pub category: EntityCategory,
    pub properties: BTreeMap<String, Value>,
}

impl Entity {
    pub fn new(type_name: Symbol, category: EntityCategory) -> Self {
        Self {
            name: Symbol::NONE,
            type_name,
            category,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn reference(&self) -> EntityRef {
        EntityRef {
            category: self.category,
            key: self.name,
        }
    }
}

/// Points at an entity by category and blackboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityRef {
    pub category: EntityCategory,
    pub key: Symbol,
}

impl EntityRef {
    pub fn new(category: EntityCategory, key: Symbol) -> Self {
        Self { category, key }
    }
}
