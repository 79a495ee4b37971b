//! Entity types, sampled entities and their traits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::Dimension;

/// An entity type as authored: a set of dimensions to sample from.
///
/// Dimension order is display-only; sampling order is derived from dependencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTypeDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

/// A stored entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    /// Unique identifier (ULID).
    pub id: String,
    pub name: String,
    pub description: String,
    pub dimensions: Vec<Dimension>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntityType {
    /// Creates an entity type with a generated ULID from already-normalized parts.
    pub fn from_draft(draft: EntityTypeDraft) -> Self {
        let now = Utc::now();
        Self {
            id: generate_ulid(),
            name: draft.name,
            description: draft.description,
            dimensions: draft.dimensions,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }
}

/// A concrete sampled (or generated) value.
///
/// Categorical and text values are both strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl TraitValue {
    /// Numeric view of `Int` and `Float` values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TraitValue::Int(v) => Some(*v as f64),
            TraitValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TraitValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TraitValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Equality that treats `Int(3)` and `Float(3.0)` as the same value.
    pub fn loosely_equals(&self, other: &TraitValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl std::fmt::Display for TraitValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraitValue::Bool(v) => write!(f, "{v}"),
            TraitValue::Int(v) => write!(f, "{v}"),
            TraitValue::Float(v) => write!(f, "{v}"),
            TraitValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for TraitValue {
    fn from(value: &str) -> Self {
        TraitValue::Text(value.to_string())
    }
}

impl From<bool> for TraitValue {
    fn from(value: bool) -> Self {
        TraitValue::Bool(value)
    }
}

impl From<i64> for TraitValue {
    fn from(value: i64) -> Self {
        TraitValue::Int(value)
    }
}

impl From<f64> for TraitValue {
    fn from(value: f64) -> Self {
        TraitValue::Float(value)
    }
}

/// One dimension's value on one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trait {
    pub dimension_name: String,
    pub value: TraitValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Trait {
    pub fn new(dimension_name: impl Into<String>, value: TraitValue) -> Self {
        Self {
            dimension_name: dimension_name.into(),
            value,
            explanation: None,
        }
    }

    pub fn explained(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

/// A sampled entity.
///
/// Traits are a snapshot: later edits to the entity type do not touch them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier (ULID).
    pub id: String,
    pub entity_type_id: String,
    pub traits: Vec<Trait>,
    pub backstory: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    pub fn new(entity_type_id: impl Into<String>, traits: Vec<Trait>, backstory: String) -> Self {
        let now = Utc::now();
        Self {
            id: generate_ulid(),
            entity_type_id: entity_type_id.into(),
            traits,
            backstory,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn trait_value(&self, dimension_name: &str) -> Option<&TraitValue> {
        self.traits
            .iter()
            .find(|t| t.dimension_name == dimension_name)
            .map(|t| &t.value)
    }
}

/// Generates a new ULID string.
pub fn generate_ulid() -> String {
    Ulid::new().to_string()
}
