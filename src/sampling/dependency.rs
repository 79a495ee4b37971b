//! Dependency conditions and the sampling order they imply.

use std::collections::{BTreeSet, HashMap};

use crate::error::AppError;
use crate::models::{Condition, Dimension, DimensionKind, TraitValue};

/// Evaluates a condition against the sampled value of its `on_dimension`.
///
/// A missing value (the dimension was skipped) never satisfies a condition.
pub fn evaluate(condition: &Condition, value: Option<&TraitValue>) -> bool {
    let Some(value) = value else {
        return false;
    };

    match condition {
        Condition::Equals { value: expected } => value.loosely_equals(expected),
        Condition::NotEquals { value: expected } => !value.loosely_equals(expected),
        Condition::OneOf { values } => values.iter().any(|v| value.loosely_equals(v)),
        Condition::GreaterThan { value: bound } => value.as_f64().is_some_and(|v| v > *bound),
        Condition::LessThan { value: bound } => value.as_f64().is_some_and(|v| v < *bound),
        Condition::Between { min, max } => value.as_f64().is_some_and(|v| v >= *min && v <= *max),
        Condition::IsTrue => value.as_bool() == Some(true),
        Condition::IsFalse => value.as_bool() == Some(false),
    }
}

/// Computes a dependency-respecting order over `dimensions` (as indices).
///
/// Kahn's algorithm, always taking the lowest declaration index that is ready,
/// so the order is stable for a given definition.
///
/// Fails on duplicate names, unknown or self references, dependencies on text
/// dimensions (their values only exist after generation) and cycles.
pub fn sampling_order(dimensions: &[Dimension]) -> Result<Vec<usize>, AppError> {
    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(dimensions.len());
    for (i, dim) in dimensions.iter().enumerate() {
        if index_of.insert(dim.name.as_str(), i).is_some() {
            return Err(AppError::invalid_dimension(
                &dim.name,
                "dimension name is used more than once",
            ));
        }
    }

    let mut indegree = vec![0usize; dimensions.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); dimensions.len()];

    for (i, dim) in dimensions.iter().enumerate() {
        for dep in &dim.dependencies {
            let Some(&on) = index_of.get(dep.on_dimension.as_str()) else {
                return Err(AppError::invalid_dimension(
                    &dim.name,
                    format!("depends on unknown dimension '{}'", dep.on_dimension),
                ));
            };
            if on == i {
                return Err(AppError::invalid_dimension(&dim.name, "depends on itself"));
            }
            if dimensions[on].kind() == DimensionKind::Text {
                return Err(AppError::invalid_dimension(
                    &dim.name,
                    format!("cannot depend on text dimension '{}'", dep.on_dimension),
                ));
            }
            if !dependents[on].contains(&i) {
                dependents[on].push(i);
                indegree[i] += 1;
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..dimensions.len())
        .filter(|&i| indegree[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(dimensions.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < dimensions.len() {
        let stuck: Vec<&str> = (0..dimensions.len())
            .filter(|&i| indegree[i] > 0)
            .map(|i| dimensions[i].name.as_str())
            .collect();
        return Err(AppError::invalid_dimension(
            stuck.first().copied().unwrap_or_default(),
            format!("dependency cycle among: {}", stuck.join(", ")),
        ));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BooleanConstraints, Constraints, Dependency};

    fn flag(name: &str) -> Dimension {
        Dimension::new(name, Constraints::Boolean(BooleanConstraints::default()))
    }

    fn names(dims: &[Dimension], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| dims[i].name.clone()).collect()
    }

    #[test]
    fn test_conditions() {
        let five = TraitValue::Int(5);
        assert!(evaluate(&Condition::GreaterThan { value: 4.0 }, Some(&five)));
        assert!(!evaluate(&Condition::LessThan { value: 5.0 }, Some(&five)));
        assert!(evaluate(
            &Condition::Between { min: 5.0, max: 6.0 },
            Some(&five)
        ));
        assert!(evaluate(
            &Condition::Equals {
                value: TraitValue::Float(5.0)
            },
            Some(&five)
        ));
        assert!(evaluate(
            &Condition::OneOf {
                values: vec!["x".into(), "y".into()]
            },
            Some(&TraitValue::from("y"))
        ));
        assert!(evaluate(&Condition::IsFalse, Some(&TraitValue::Bool(false))));
        assert!(!evaluate(&Condition::IsTrue, Some(&TraitValue::from("true"))));
    }

    #[test]
    fn test_missing_value_never_matches() {
        assert!(!evaluate(&Condition::IsTrue, None));
        assert!(!evaluate(
            &Condition::NotEquals {
                value: TraitValue::Int(1)
            },
            None
        ));
    }

    #[test]
    fn test_order_places_dependencies_first() {
        let dims = vec![
            flag("c").with_dependency(Dependency::gate("b", Condition::IsTrue)),
            flag("b").with_dependency(Dependency::gate("a", Condition::IsTrue)),
            flag("a"),
            flag("d"),
        ];
        let order = sampling_order(&dims).unwrap();
        assert_eq!(names(&dims, &order), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_independent_dimensions_keep_declaration_order() {
        let dims = vec![flag("z"), flag("y"), flag("x")];
        assert_eq!(sampling_order(&dims).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_cycle_rejected() {
        let dims = vec![
            flag("a").with_dependency(Dependency::gate("b", Condition::IsTrue)),
            flag("b").with_dependency(Dependency::gate("a", Condition::IsTrue)),
        ];
        let err = sampling_order(&dims).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_bad_references_rejected() {
        let unknown = vec![flag("a").with_dependency(Dependency::gate("nope", Condition::IsTrue))];
        assert!(sampling_order(&unknown).is_err());

        let on_text = vec![
            Dimension::new("bio", Constraints::Text),
            flag("a").with_dependency(Dependency::gate("bio", Condition::IsTrue)),
        ];
        assert!(sampling_order(&on_text).is_err());

        let duplicate = vec![flag("a"), flag("a")];
        assert!(sampling_order(&duplicate).is_err());
    }
}
