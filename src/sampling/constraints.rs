//! Default resolution and normalization of dimension constraints.
//!
//! [`resolve_constraints`] is the single place where optional fields become
//! concrete sampling parameters. [`normalize_dimension`] runs once at the
//! authoring boundary and rewrites categorical weights so that stored
//! dimensions always carry probabilities summing to 1.

use std::collections::HashSet;

use crate::error::AppError;
use crate::models::{
    CategoricalConstraints, Constraints, DependencyEffect, Dimension, Distribution,
    NumericConstraints, SkewDirection, TraitValue,
};

/// Allowed drift of categorical weights from a sum of 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-2;

/// Standard deviations spanned by the full range when `spread_factor = 1`.
pub const RANGE_IN_STD_DEVS: f64 = 6.0;

/// Spread used when neither `spread_factor` nor `std_deviation` is given.
pub const DEFAULT_SPREAD_FACTOR: f64 = 1.0;

/// Beta shape added per unit of `skew_factor`.
pub const SKEW_SHAPE_SCALE: f64 = 4.0;

/// Default `true` probability for boolean dimensions.
pub const DEFAULT_TRUE_PERCENTAGE: f64 = 0.5;

/// Concrete sampling parameters for one dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedConstraints {
    Categorical { values: Vec<String>, weights: Vec<f64> },
    Int { min: f64, max: f64, shape: NumericShape },
    Float { min: f64, max: f64, shape: NumericShape },
    Boolean { true_probability: f64 },
    Text,
}

/// Concrete numeric distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericShape {
    Uniform,
    Normal { mean: f64, std_dev: f64 },
    /// Beta(alpha, beta) mapped onto `[min, max]`.
    Skewed { alpha: f64, beta: f64 },
}

/// Resolves a dimension's constraints, filling every default.
pub fn resolve_defaults(dimension: &Dimension) -> Result<ResolvedConstraints, AppError> {
    resolve_constraints(&dimension.name, &dimension.constraints)
}

/// Resolves constraints on behalf of the named dimension.
pub fn resolve_constraints(
    name: &str,
    constraints: &Constraints,
) -> Result<ResolvedConstraints, AppError> {
    match constraints {
        Constraints::Categorical(c) => {
            let weights = categorical_weights(name, c)?;
            Ok(ResolvedConstraints::Categorical {
                values: c.allowed_values.clone(),
                weights,
            })
        }
        Constraints::Int(n) => {
            let shape = numeric_shape(name, n)?;
            if n.min.ceil() > n.max.floor() {
                return Err(AppError::invalid_dimension(
                    name,
                    format!("no integer lies in [{}, {}]", n.min, n.max),
                ));
            }
            Ok(ResolvedConstraints::Int {
                min: n.min,
                max: n.max,
                shape,
            })
        }
        Constraints::Float(n) => Ok(ResolvedConstraints::Float {
            min: n.min,
            max: n.max,
            shape: numeric_shape(name, n)?,
        }),
        Constraints::Boolean(b) => {
            let p = b.true_percentage.unwrap_or(DEFAULT_TRUE_PERCENTAGE);
            if !(0.0..=1.0).contains(&p) {
                return Err(AppError::invalid_dimension(
                    name,
                    format!("true_percentage must be within [0, 1], got {p}"),
                ));
            }
            Ok(ResolvedConstraints::Boolean {
                true_probability: p,
            })
        }
        Constraints::Text => Ok(ResolvedConstraints::Text),
    }
}

/// Uniform weights when absent; divided by their sum when off by more than the tolerance.
fn categorical_weights(name: &str, c: &CategoricalConstraints) -> Result<Vec<f64>, AppError> {
    let n = c.allowed_values.len();
    if n == 0 {
        return Err(AppError::invalid_dimension(name, "allowed_values is empty"));
    }

    let mut seen = HashSet::with_capacity(n);
    if let Some(dup) = c.allowed_values.iter().find(|v| !seen.insert(v.as_str())) {
        return Err(AppError::invalid_dimension(
            name,
            format!("allowed value '{dup}' is listed twice"),
        ));
    }

    let Some(probabilities) = &c.probabilities else {
        return Ok(vec![1.0 / n as f64; n]);
    };

    if probabilities.len() != n {
        return Err(AppError::invalid_dimension(
            name,
            format!(
                "{} probabilities given for {} allowed values",
                probabilities.len(),
                n
            ),
        ));
    }
    if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(AppError::invalid_dimension(
            name,
            "probabilities must be finite and non-negative",
        ));
    }

    let sum: f64 = probabilities.iter().sum();
    if sum <= 0.0 {
        return Err(AppError::invalid_dimension(
            name,
            "probabilities sum to zero",
        ));
    }
    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        Ok(probabilities.iter().map(|p| p / sum).collect())
    } else {
        Ok(probabilities.clone())
    }
}

fn numeric_shape(name: &str, n: &NumericConstraints) -> Result<NumericShape, AppError> {
    if !n.min.is_finite() || !n.max.is_finite() {
        return Err(AppError::invalid_dimension(name, "min and max must be finite"));
    }
    if n.min >= n.max {
        return Err(AppError::invalid_dimension(
            name,
            format!("min ({}) must be less than max ({})", n.min, n.max),
        ));
    }
    let range = n.max - n.min;
    if !range.is_finite() {
        return Err(AppError::invalid_dimension(
            name,
            format!("range [{}, {}] is too wide to sample", n.min, n.max),
        ));
    }

    match &n.distribution {
        Distribution::Uniform => Ok(NumericShape::Uniform),
        Distribution::Normal {
            mean,
            spread_factor,
            std_deviation,
        } => {
            let mean = mean.unwrap_or((n.min + n.max) / 2.0);
            if !mean.is_finite() || mean < n.min || mean > n.max {
                return Err(AppError::invalid_dimension(
                    name,
                    format!("mean {mean} lies outside [{}, {}]", n.min, n.max),
                ));
            }

            let std_dev = match (spread_factor, std_deviation) {
                (Some(s), _) => {
                    if !(*s > 0.0 && *s <= 1.0) {
                        return Err(AppError::invalid_dimension(
                            name,
                            format!("spread_factor must be within (0, 1], got {s}"),
                        ));
                    }
                    s * range / RANGE_IN_STD_DEVS
                }
                (None, Some(sd)) => {
                    if !(sd.is_finite() && *sd > 0.0) {
                        return Err(AppError::invalid_dimension(
                            name,
                            format!("std_deviation must be positive, got {sd}"),
                        ));
                    }
                    *sd
                }
                (None, None) => DEFAULT_SPREAD_FACTOR * range / RANGE_IN_STD_DEVS,
            };

            Ok(NumericShape::Normal { mean, std_dev })
        }
        Distribution::Skewed {
            skew_direction,
            skew_factor,
        } => {
            if !(0.0..=1.0).contains(skew_factor) {
                return Err(AppError::invalid_dimension(
                    name,
                    format!("skew_factor must be within [0, 1], got {skew_factor}"),
                ));
            }
            let heavy = 1.0 + SKEW_SHAPE_SCALE * skew_factor;
            let (alpha, beta) = match skew_direction {
                SkewDirection::Right => (1.0, heavy),
                SkewDirection::Left => (heavy, 1.0),
            };
            Ok(NumericShape::Skewed { alpha, beta })
        }
    }
}

/// Checks a value against a dimension and returns it in the dimension's runtime type.
///
/// Integral floats become `Int` on int dimensions and ints become `Float` on
/// float dimensions; any other type mismatch is rejected.
pub fn validate_value(
    name: &str,
    constraints: &Constraints,
    value: &TraitValue,
) -> Result<TraitValue, AppError> {
    let mismatch = || {
        AppError::invalid_dimension(
            name,
            format!("value {value} does not fit a {} dimension", constraints.kind()),
        )
    };

    match constraints {
        Constraints::Categorical(c) => {
            let v = value.as_str().ok_or_else(mismatch)?;
            if !c.allowed_values.iter().any(|a| a == v) {
                return Err(AppError::invalid_dimension(
                    name,
                    format!("'{v}' is not one of the allowed values"),
                ));
            }
            Ok(TraitValue::Text(v.to_string()))
        }
        Constraints::Int(n) => {
            let v = match value {
                TraitValue::Int(v) => *v,
                TraitValue::Float(v)
                    if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 =>
                {
                    *v as i64
                }
                _ => return Err(mismatch()),
            };
            check_range(name, n, v as f64)?;
            Ok(TraitValue::Int(v))
        }
        Constraints::Float(n) => {
            let v = value.as_f64().ok_or_else(mismatch)?;
            check_range(name, n, v)?;
            Ok(TraitValue::Float(v))
        }
        Constraints::Boolean(_) => Ok(TraitValue::Bool(value.as_bool().ok_or_else(mismatch)?)),
        Constraints::Text => Ok(TraitValue::Text(
            value.as_str().ok_or_else(mismatch)?.to_string(),
        )),
    }
}

fn check_range(name: &str, n: &NumericConstraints, v: f64) -> Result<(), AppError> {
    if v < n.min || v > n.max {
        return Err(AppError::invalid_dimension(
            name,
            format!("{v} lies outside [{}, {}]", n.min, n.max),
        ));
    }
    Ok(())
}

/// Normalizes one dimension at the authoring boundary.
///
/// Fills and renormalizes categorical probabilities (including those of
/// override constraints), validates every constraint, and checks that the
/// default value fits.
pub fn normalize_dimension(mut dimension: Dimension) -> Result<Dimension, AppError> {
    dimension.name = dimension.name.trim().to_string();
    if dimension.name.is_empty() {
        return Err(AppError::invalid_dimension("", "dimension name is empty"));
    }
    let name = dimension.name.clone();

    normalize_constraints(&name, &mut dimension.constraints)?;

    let kind = dimension.kind();
    for dependency in &mut dimension.dependencies {
        if let DependencyEffect::Override { constraints } = &mut dependency.effect {
            if constraints.kind() != kind {
                return Err(AppError::invalid_dimension(
                    &name,
                    format!(
                        "override on '{}' has kind {}, expected {kind}",
                        dependency.on_dimension,
                        constraints.kind()
                    ),
                ));
            }
            normalize_constraints(&name, constraints)?;
        }
    }

    if let Some(default) = &dimension.default_value {
        let default = validate_value(&name, &dimension.constraints, default)?;
        dimension.default_value = Some(default);
    }

    Ok(dimension)
}

fn normalize_constraints(name: &str, constraints: &mut Constraints) -> Result<(), AppError> {
    let resolved = resolve_constraints(name, constraints)?;
    if let (Constraints::Categorical(c), ResolvedConstraints::Categorical { weights, .. }) =
        (constraints, resolved)
    {
        c.probabilities = Some(weights);
    }
    Ok(())
}
