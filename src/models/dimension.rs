//! Dimension model: typed, constrained attribute definitions of an entity type.
//!
//! Constraints are a tagged union keyed by `type`, one concrete shape per
//! dimension kind:
//!
//! ```toml
//! [[dimensions]]
//! name = "temperament"
//! type = "categorical"
//! allowed_values = ["calm", "anxious", "irritable"]
//! probabilities = [0.5, 0.3, 0.2]
//!
//! [[dimensions]]
//! name = "age"
//! type = "int"
//! min = 18
//! max = 90
//! distribution = { kind = "skewed", skew_direction = "right", skew_factor = 0.6 }
//! ```

use serde::{Deserialize, Serialize};

use super::TraitValue;

/// A named, typed, constrained attribute of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Unique within its entity type.
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub constraints: Constraints,
    /// Conditions on already-sampled sibling dimensions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    /// Value used when a gating dependency is not met. Without it the trait is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<TraitValue>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, constraints: Constraints) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            constraints,
            dependencies: Vec::new(),
            default_value: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_default(mut self, value: TraitValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn kind(&self) -> DimensionKind {
        self.constraints.kind()
    }
}

/// Dimension kinds, without their constraint payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    Categorical,
    Int,
    Float,
    Boolean,
    Text,
}

impl std::fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DimensionKind::Categorical => "categorical",
            DimensionKind::Int => "int",
            DimensionKind::Float => "float",
            DimensionKind::Boolean => "boolean",
            DimensionKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Per-kind constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraints {
    Categorical(CategoricalConstraints),
    Int(NumericConstraints),
    Float(NumericConstraints),
    Boolean(BooleanConstraints),
    /// Produced by the LLM collaborator rather than drawn.
    Text,
}

impl Constraints {
    pub fn kind(&self) -> DimensionKind {
        match self {
            Constraints::Categorical(_) => DimensionKind::Categorical,
            Constraints::Int(_) => DimensionKind::Int,
            Constraints::Float(_) => DimensionKind::Float,
            Constraints::Boolean(_) => DimensionKind::Boolean,
            Constraints::Text => DimensionKind::Text,
        }
    }
}

/// Options with optional weights. `probabilities[i]` weighs `allowed_values[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalConstraints {
    pub allowed_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<f64>>,
}

/// Range and distribution for `int` and `float` dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericConstraints {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub distribution: Distribution,
}

/// Shape of a numeric draw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    #[default]
    Uniform,
    Normal {
        /// Defaults to the midpoint of the range.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mean: Option<f64>,
        /// In (0, 1]; `std_dev = spread_factor * (max - min) / 6`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        spread_factor: Option<f64>,
        /// Legacy explicit standard deviation, used only without `spread_factor`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        std_deviation: Option<f64>,
    },
    Skewed {
        skew_direction: SkewDirection,
        /// In [0, 1]; 0 is uniform.
        skew_factor: f64,
    },
}

/// Which end of the range a skewed draw favors: `right` skew piles mass at the
/// low end with a tail toward `max`, `left` the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkewDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanConstraints {
    /// Probability of `true` in [0, 1]; defaults to 0.5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_percentage: Option<f64>,
}

/// A condition on another dimension's sampled value, and what it does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub on_dimension: String,
    pub condition: Condition,
    #[serde(default)]
    pub effect: DependencyEffect,
}

impl Dependency {
    pub fn gate(on_dimension: impl Into<String>, condition: Condition) -> Self {
        Self {
            on_dimension: on_dimension.into(),
            condition,
            effect: DependencyEffect::Gate,
        }
    }

    pub fn override_with(
        on_dimension: impl Into<String>,
        condition: Condition,
        constraints: Constraints,
    ) -> Self {
        Self {
            on_dimension: on_dimension.into(),
            condition,
            effect: DependencyEffect::Override { constraints },
        }
    }
}

/// Predicate evaluated against the sampled value of `on_dimension`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Equals { value: TraitValue },
    NotEquals { value: TraitValue },
    OneOf { values: Vec<TraitValue> },
    GreaterThan { value: f64 },
    LessThan { value: f64 },
    /// Inclusive on both ends.
    Between { min: f64, max: f64 },
    IsTrue,
    IsFalse,
}

/// Gate: the dimension is sampled only when the condition holds.
/// Override: when the condition holds, sample with these constraints instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DependencyEffect {
    #[default]
    Gate,
    Override { constraints: Constraints },
}
