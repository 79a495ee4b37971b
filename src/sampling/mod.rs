//! Dimension sampling engine.
//!
//! Sampling is a pure function of a dimension's constraints and an injected
//! random source:
//!
//! - [`resolve_defaults`] turns optional constraint fields into concrete
//!   parameters ([`ResolvedConstraints`]).
//! - [`sample`] draws one value for one dimension.
//! - [`sample_traits`] draws every dimension of an entity type in dependency
//!   order, applying gates, overrides and defaults.
//!
//! Text dimensions are never drawn; they come back as pending and are filled
//! in by the LLM collaborator once every drawn sibling is known.
//!
//! ```ignore
//! let mut rng = StdRng::seed_from_u64(42);
//! let sampled = sample_traits(&entity_type.dimensions, &mut rng)?;
//! for name in &sampled.pending_text { /* ask the collaborator */ }
//! ```

mod constraints;
mod dependency;
mod draw;

use std::collections::HashMap;

use rand::Rng;

pub use constraints::{
    normalize_dimension, resolve_constraints, resolve_defaults, validate_value, NumericShape,
    ResolvedConstraints, DEFAULT_SPREAD_FACTOR, DEFAULT_TRUE_PERCENTAGE, PROBABILITY_TOLERANCE,
    SKEW_SHAPE_SCALE,
};
pub use dependency::{evaluate, sampling_order};
pub use draw::{draw, Draw};

use crate::error::AppError;
use crate::models::{DependencyEffect, Dimension, Trait, TraitValue};

/// Draws one value for a dimension, ignoring its dependencies.
pub fn sample<R: Rng>(dimension: &Dimension, rng: &mut R) -> Result<Draw, AppError> {
    let resolved = resolve_defaults(dimension)?;
    draw(&dimension.name, &resolved, rng)
}

/// Normalizes every dimension and checks the set as a whole: unique names and
/// an acyclic dependency graph.
pub fn normalize_dimensions(dimensions: Vec<Dimension>) -> Result<Vec<Dimension>, AppError> {
    let dimensions = dimensions
        .into_iter()
        .map(normalize_dimension)
        .collect::<Result<Vec<_>, _>>()?;
    sampling_order(&dimensions)?;
    Ok(dimensions)
}

/// Traits drawn for one entity, before text generation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampledTraits {
    /// Drawn or defaulted traits, in sampling order.
    pub traits: Vec<Trait>,
    /// Text dimensions that passed their gates, in sampling order.
    pub pending_text: Vec<String>,
}

/// Draws every dimension in dependency order.
///
/// Policy for a dimension whose gate condition fails: its `default_value` is
/// used when declared, otherwise the trait is omitted. The first override whose
/// condition holds replaces the dimension's constraints for this draw.
pub fn sample_traits<R: Rng>(
    dimensions: &[Dimension],
    rng: &mut R,
) -> Result<SampledTraits, AppError> {
    let order = sampling_order(dimensions)?;
    let mut values: HashMap<&str, TraitValue> = HashMap::with_capacity(dimensions.len());
    let mut sampled = SampledTraits::default();

    for index in order {
        let dimension = &dimensions[index];

        let failed_gate = dimension.dependencies.iter().find(|dep| {
            matches!(dep.effect, DependencyEffect::Gate)
                && !evaluate(&dep.condition, values.get(dep.on_dimension.as_str()))
        });

        if let Some(gate) = failed_gate {
            if let Some(default) = &dimension.default_value {
                let default = validate_value(&dimension.name, &dimension.constraints, default)?;
                values.insert(dimension.name.as_str(), default.clone());
                sampled.traits.push(
                    Trait::new(&dimension.name, default).explained(format!(
                        "condition on '{}' not met; default applied",
                        gate.on_dimension
                    )),
                );
            }
            continue;
        }

        let overridden = dimension.dependencies.iter().find_map(|dep| match &dep.effect {
            DependencyEffect::Override { constraints }
                if evaluate(&dep.condition, values.get(dep.on_dimension.as_str())) =>
            {
                Some((dep.on_dimension.as_str(), constraints))
            }
            _ => None,
        });

        let (resolved, explanation) = match overridden {
            Some((on, constraints)) => (
                resolve_constraints(&dimension.name, constraints)?,
                Some(format!("constraints overridden by condition on '{on}'")),
            ),
            None => (resolve_defaults(dimension)?, None),
        };

        match draw(&dimension.name, &resolved, rng)? {
            Draw::Value(value) => {
                values.insert(dimension.name.as_str(), value.clone());
                let mut t = Trait::new(&dimension.name, value);
                t.explanation = explanation;
                sampled.traits.push(t);
            }
            Draw::Delegated => sampled.pending_text.push(dimension.name.clone()),
        }
    }

    Ok(sampled)
}

/// Sorts traits into the declaration order of `dimensions`.
pub fn sort_by_declaration(dimensions: &[Dimension], traits: &mut [Trait]) {
    let position: HashMap<&str, usize> = dimensions
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name.as_str(), i))
        .collect();
    traits.sort_by_key(|t| {
        position
            .get(t.dimension_name.as_str())
            .copied()
            .unwrap_or(usize::MAX)
    });
}
