//! Single draws from resolved constraints.

use rand::distributions::{Bernoulli, Distribution as _, WeightedIndex};
use rand::Rng;
use rand_distr::{Beta, Normal};

use super::constraints::{NumericShape, ResolvedConstraints};
use crate::error::AppError;
use crate::models::TraitValue;

/// Outcome of drawing one dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum Draw {
    Value(TraitValue),
    /// Text dimensions are written by the LLM collaborator, not drawn.
    Delegated,
}

/// Draws one value for the named dimension.
pub fn draw<R: Rng>(
    name: &str,
    resolved: &ResolvedConstraints,
    rng: &mut R,
) -> Result<Draw, AppError> {
    let value = match resolved {
        ResolvedConstraints::Categorical { values, weights } => {
            // Cumulative weights with a uniform draw in [0, 1) scaled to the total.
            let index = WeightedIndex::new(weights)
                .map_err(|e| AppError::sampling(name, e.to_string()))?
                .sample(rng);
            TraitValue::Text(values[index].clone())
        }
        ResolvedConstraints::Int { min, max, shape } => {
            TraitValue::Int(draw_int(name, *min, *max, shape, rng)?)
        }
        ResolvedConstraints::Float { min, max, shape } => {
            TraitValue::Float(draw_float(name, *min, *max, shape, rng)?)
        }
        ResolvedConstraints::Boolean { true_probability } => {
            let coin = Bernoulli::new(*true_probability)
                .map_err(|e| AppError::sampling(name, e.to_string()))?;
            TraitValue::Bool(coin.sample(rng))
        }
        ResolvedConstraints::Text => return Ok(Draw::Delegated),
    };
    Ok(Draw::Value(value))
}

/// Continuous draw in `[min, max]`. Normal draws are clamped, not rejected.
fn draw_float<R: Rng>(
    name: &str,
    min: f64,
    max: f64,
    shape: &NumericShape,
    rng: &mut R,
) -> Result<f64, AppError> {
    match *shape {
        NumericShape::Uniform => Ok(rng.gen_range(min..=max)),
        NumericShape::Normal { mean, std_dev } => {
            let normal =
                Normal::new(mean, std_dev).map_err(|e| AppError::sampling(name, e.to_string()))?;
            Ok(normal.sample(rng).clamp(min, max))
        }
        NumericShape::Skewed { alpha, beta } => {
            let unit =
                Beta::new(alpha, beta).map_err(|e| AppError::sampling(name, e.to_string()))?;
            Ok((min + unit.sample(rng) * (max - min)).clamp(min, max))
        }
    }
}

/// Integer draw in `[ceil(min), floor(max)]`.
fn draw_int<R: Rng>(
    name: &str,
    min: f64,
    max: f64,
    shape: &NumericShape,
    rng: &mut R,
) -> Result<i64, AppError> {
    let lo = min.ceil() as i64;
    let hi = max.floor() as i64;
    match shape {
        NumericShape::Uniform => Ok(rng.gen_range(lo..=hi)),
        _ => {
            let x = draw_float(name, min, max, shape, rng)?;
            Ok((x.round() as i64).clamp(lo, hi))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DRAWS: usize = 100_000;

    fn values(resolved: &ResolvedConstraints, seed: u64, n: usize) -> Vec<TraitValue> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| match draw("t", resolved, &mut rng).unwrap() {
                Draw::Value(v) => v,
                Draw::Delegated => panic!("numeric dimension delegated"),
            })
            .collect()
    }

    fn floats(resolved: &ResolvedConstraints, seed: u64) -> Vec<f64> {
        values(resolved, seed, DRAWS)
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect()
    }

    fn mean(xs: &[f64]) -> f64 {
        xs.iter().sum::<f64>() / xs.len() as f64
    }

    #[test]
    fn test_categorical_frequencies_follow_weights() {
        let resolved = ResolvedConstraints::Categorical {
            values: vec!["a".into(), "b".into(), "c".into()],
            weights: vec![0.6, 0.3, 0.1],
        };
        let drawn = values(&resolved, 11, DRAWS);
        for (label, expected) in [("a", 0.6), ("b", 0.3), ("c", 0.1)] {
            let freq = drawn.iter().filter(|v| v.as_str() == Some(label)).count() as f64
                / DRAWS as f64;
            assert!(
                (freq - expected).abs() < 0.01,
                "{label}: {freq} vs {expected}"
            );
        }
    }

    #[test]
    fn test_boolean_true_rate() {
        let resolved = ResolvedConstraints::Boolean {
            true_probability: 0.7,
        };
        let drawn = values(&resolved, 5, DRAWS);
        let rate = drawn.iter().filter(|v| v.as_bool() == Some(true)).count() as f64
            / DRAWS as f64;
        assert!((0.69..=0.71).contains(&rate), "true rate {rate}");
    }

    #[test]
    fn test_uniform_float_stays_in_range() {
        let resolved = ResolvedConstraints::Float {
            min: -2.0,
            max: 3.0,
            shape: NumericShape::Uniform,
        };
        let xs = floats(&resolved, 1);
        assert!(xs.iter().all(|x| (-2.0..=3.0).contains(x)));
        assert!((mean(&xs) - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_uniform_int_covers_both_endpoints() {
        let resolved = ResolvedConstraints::Int {
            min: 1.0,
            max: 6.0,
            shape: NumericShape::Uniform,
        };
        let drawn = values(&resolved, 2, 10_000);
        let ints: Vec<i64> = drawn
            .iter()
            .map(|v| match v {
                TraitValue::Int(i) => *i,
                other => panic!("expected int, got {other:?}"),
            })
            .collect();
        assert!(ints.iter().all(|i| (1..=6).contains(i)));
        assert!(ints.contains(&1));
        assert!(ints.contains(&6));
    }

    #[test]
    fn test_normal_mean_and_clamping() {
        let resolved = ResolvedConstraints::Float {
            min: 0.0,
            max: 100.0,
            shape: NumericShape::Normal {
                mean: 40.0,
                std_dev: 10.0,
            },
        };
        let xs = floats(&resolved, 3);
        assert!(xs.iter().all(|x| (0.0..=100.0).contains(x)));
        assert!((mean(&xs) - 40.0).abs() < 0.5);
    }

    #[test]
    fn test_wide_normal_piles_up_at_bounds() {
        let resolved = ResolvedConstraints::Float {
            min: 0.0,
            max: 1.0,
            shape: NumericShape::Normal {
                mean: 0.5,
                std_dev: 2.0,
            },
        };
        let xs = floats(&resolved, 4);
        let at_bounds = xs.iter().filter(|x| **x == 0.0 || **x == 1.0).count();
        assert!(at_bounds > DRAWS / 2);
    }

    #[test]
    fn test_skew_shifts_mean_toward_configured_end() {
        let right = ResolvedConstraints::Float {
            min: 0.0,
            max: 60.0,
            shape: NumericShape::Skewed {
                alpha: 1.0,
                beta: 5.0,
            },
        };
        let left = ResolvedConstraints::Float {
            min: 0.0,
            max: 60.0,
            shape: NumericShape::Skewed {
                alpha: 5.0,
                beta: 1.0,
            },
        };

        let right_xs = floats(&right, 8);
        let left_xs = floats(&left, 8);
        assert!(right_xs.iter().all(|x| (0.0..=60.0).contains(x)));
        assert!(left_xs.iter().all(|x| (0.0..=60.0).contains(x)));

        // Beta(1, 5) has mean 1/6; Beta(5, 1) has mean 5/6.
        assert!((mean(&right_xs) - 10.0).abs() < 0.5);
        assert!((mean(&left_xs) - 50.0).abs() < 0.5);
    }

    #[test]
    fn test_skewed_int_rounds_into_range() {
        let resolved = ResolvedConstraints::Int {
            min: 18.0,
            max: 90.0,
            shape: NumericShape::Skewed {
                alpha: 1.0,
                beta: 3.0,
            },
        };
        for v in values(&resolved, 9, 10_000) {
            match v {
                TraitValue::Int(i) => assert!((18..=90).contains(&i)),
                other => panic!("expected int, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_text_is_delegated() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            draw("bio", &ResolvedConstraints::Text, &mut rng).unwrap(),
            Draw::Delegated
        );
    }
}
