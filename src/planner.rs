//! Combination planner for batch simulations.
//!
//! Picks `m` distinct k-subsets of an entity pool. Small combination spaces
//! (`C(n, k) <= exhaustive_limit`) are enumerated and shuffled; larger spaces
//! are sampled without replacement by rejecting repeated subsets. Both paths
//! are reproducible for a given seed.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Largest combination space enumerated in full.
pub const DEFAULT_EXHAUSTIVE_LIMIT: u64 = 10_000;

/// How a plan's combinations were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStrategy {
    Exhaustive,
    Sampled,
    Explicit,
}

/// Ordered list of k-subsets of the pool, each in pool order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationPlan {
    /// Seed the plan was drawn with; `None` for explicit plans.
    pub seed: Option<u64>,
    pub max_combinations: u128,
    pub strategy: PlanStrategy,
    pub combinations: Vec<Vec<String>>,
}

/// `C(n, k)`, saturating at `u128::MAX`.
pub fn binomial(n: u64, k: u64) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        // result is C(n, i) here, so the division is exact.
        result = match result.checked_mul(u128::from(n - i)) {
            Some(product) => product / u128::from(i + 1),
            None => return u128::MAX,
        };
    }
    result
}

#[derive(Debug, Clone)]
pub struct CombinationPlanner {
    exhaustive_limit: u64,
}

impl Default for CombinationPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_EXHAUSTIVE_LIMIT)
    }
}

impl CombinationPlanner {
    pub fn new(exhaustive_limit: u64) -> Self {
        Self { exhaustive_limit }
    }

    /// Selects `m` pairwise-distinct k-subsets of `pool`.
    ///
    /// Without a seed one is drawn from the thread RNG and recorded on the plan.
    pub fn plan(
        &self,
        pool: &[String],
        k: usize,
        m: usize,
        seed: Option<u64>,
    ) -> Result<CombinationPlan, AppError> {
        let max_combinations = check_sizes(pool, k, m)?;
        let seed = seed.unwrap_or_else(|| rand::thread_rng().next_u64());
        let mut rng = StdRng::seed_from_u64(seed);
        let n = pool.len();

        let (strategy, subsets) = if max_combinations <= u128::from(self.exhaustive_limit) {
            let mut all = index_subsets(n, k);
            all.shuffle(&mut rng);
            all.truncate(m);
            (PlanStrategy::Exhaustive, all)
        } else {
            (PlanStrategy::Sampled, sample_subsets(&mut rng, n, k, m))
        };

        tracing::debug!(
            n,
            k,
            m,
            seed,
            ?strategy,
            "planned {} combinations",
            subsets.len()
        );

        Ok(CombinationPlan {
            seed: Some(seed),
            max_combinations,
            strategy,
            combinations: subsets
                .into_iter()
                .map(|indices| indices.into_iter().map(|i| pool[i].clone()).collect())
                .collect(),
        })
    }

    /// Checks caller-supplied combinations against the same guarantees a
    /// planned batch has: right size, members of the pool, no repeats.
    pub fn validate(
        &self,
        pool: &[String],
        k: usize,
        combinations: Vec<Vec<String>>,
    ) -> Result<CombinationPlan, AppError> {
        let max_combinations = check_sizes(pool, k, combinations.len())?;
        check_explicit(pool, k, &combinations)?;

        Ok(CombinationPlan {
            seed: None,
            max_combinations,
            strategy: PlanStrategy::Explicit,
            combinations,
        })
    }
}

/// Validates the pool and the (k, m) pair, returning `C(n, k)`.
fn check_sizes(pool: &[String], k: usize, m: usize) -> Result<u128, AppError> {
    let mut unique = HashSet::with_capacity(pool.len());
    if let Some(dup) = pool.iter().find(|id| !unique.insert(id.as_str())) {
        return Err(AppError::Validation(format!(
            "entity '{dup}' appears more than once in the pool"
        )));
    }

    let n = pool.len();
    if k < 1 {
        return Err(AppError::InvalidBatchSize(
            "interaction size must be at least 1".into(),
        ));
    }
    if k > n {
        return Err(AppError::InvalidBatchSize(format!(
            "interaction size {k} exceeds pool size {n}"
        )));
    }
    if m < 1 {
        return Err(AppError::InvalidBatchSize(
            "number of simulations must be at least 1".into(),
        ));
    }

    let max_combinations = binomial(n as u64, k as u64);
    if m as u128 > max_combinations {
        return Err(AppError::InvalidBatchSize(format!(
            "{m} simulations requested but only {max_combinations} combinations of {k} exist in a pool of {n}"
        )));
    }
    Ok(max_combinations)
}

fn check_explicit(pool: &[String], k: usize, combinations: &[Vec<String>]) -> Result<(), AppError> {
    let members: HashSet<&str> = pool.iter().map(String::as_str).collect();
    let mut seen: HashSet<Vec<&str>> = HashSet::with_capacity(combinations.len());

    for (i, combination) in combinations.iter().enumerate() {
        if combination.len() != k {
            return Err(AppError::InvalidBatchSize(format!(
                "combination {i} has {} entities, expected {k}",
                combination.len()
            )));
        }
        if let Some(stranger) = combination.iter().find(|id| !members.contains(id.as_str())) {
            return Err(AppError::Validation(format!(
                "combination {i} references '{stranger}', which is not in the pool"
            )));
        }

        let mut key: Vec<&str> = combination.iter().map(String::as_str).collect();
        key.sort_unstable();
        if key.windows(2).any(|w| w[0] == w[1]) {
            return Err(AppError::Validation(format!(
                "combination {i} repeats an entity"
            )));
        }
        if !seen.insert(key) {
            return Err(AppError::Validation(format!(
                "combination {i} duplicates an earlier combination"
            )));
        }
    }
    Ok(())
}

/// All k-subsets of `0..n` in lexicographic order.
fn index_subsets(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        out.push(current.clone());

        // Rightmost position that can still advance.
        let Some(pos) = (0..k).rev().find(|&i| current[i] < n - k + i) else {
            return out;
        };
        current[pos] += 1;
        for i in pos + 1..k {
            current[i] = current[i - 1] + 1;
        }
    }
}

/// Draws `m` distinct sorted k-subsets of `0..n` by rejection.
fn sample_subsets(rng: &mut StdRng, n: usize, k: usize, m: usize) -> Vec<Vec<usize>> {
    let mut seen = HashSet::with_capacity(m);
    let mut out = Vec::with_capacity(m);
    while out.len() < m {
        let mut subset = rand::seq::index::sample(rng, n, k).into_vec();
        subset.sort_unstable();
        if seen.insert(subset.clone()) {
            out.push(subset);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn assert_distinct_subsets(plan: &CombinationPlan, pool: &[String], k: usize) {
        let mut seen = HashSet::new();
        for combination in &plan.combinations {
            assert_eq!(combination.len(), k);
            assert!(combination.iter().all(|id| pool.contains(id)));
            let mut key = combination.clone();
            key.sort();
            key.dedup();
            assert_eq!(key.len(), k, "repeated entity in {combination:?}");
            assert!(seen.insert(key), "duplicate subset {combination:?}");
        }
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(4, 2), 6);
        assert_eq!(binomial(10, 0), 1);
        assert_eq!(binomial(10, 10), 1);
        assert_eq!(binomial(52, 5), 2_598_960);
        assert_eq!(binomial(3, 4), 0);
        assert_eq!(binomial(1_000, 500), u128::MAX);
    }

    #[test]
    fn test_all_pairs_of_four() {
        let ids = pool(&["A", "B", "C", "D"]);
        let plan = CombinationPlanner::default()
            .plan(&ids, 2, 6, Some(7))
            .unwrap();
        assert_eq!(plan.max_combinations, 6);
        assert_eq!(plan.strategy, PlanStrategy::Exhaustive);
        assert_eq!(plan.combinations.len(), 6);
        assert_distinct_subsets(&plan, &ids, 2);
    }

    #[test]
    fn test_too_many_simulations() {
        let ids = pool(&["A", "B", "C", "D"]);
        let err = CombinationPlanner::default()
            .plan(&ids, 2, 7, Some(7))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidBatchSize(_)));
    }

    #[test]
    fn test_size_bounds() {
        let planner = CombinationPlanner::default();
        let ids = pool(&["A", "B", "C"]);
        for (k, m) in [(0, 1), (4, 1), (2, 0)] {
            let err = planner.plan(&ids, k, m, Some(1)).unwrap_err();
            assert_eq!(err.code(), "INVALID_BATCH_SIZE", "k={k} m={m}");
        }
    }

    #[test]
    fn test_duplicate_pool_ids_rejected() {
        let err = CombinationPlanner::default()
            .plan(&pool(&["A", "B", "A"]), 2, 1, Some(1))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_same_seed_same_plan() {
        let ids = pool(&["A", "B", "C", "D", "E", "F"]);
        let planner = CombinationPlanner::default();
        let first = planner.plan(&ids, 3, 5, Some(42)).unwrap();
        let second = planner.plan(&ids, 3, 5, Some(42)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unseeded_plan_records_its_seed() {
        let ids = pool(&["A", "B", "C", "D", "E"]);
        let planner = CombinationPlanner::default();
        let plan = planner.plan(&ids, 2, 4, None).unwrap();
        let replay = planner.plan(&ids, 2, 4, plan.seed).unwrap();
        assert_eq!(plan.combinations, replay.combinations);
    }

    #[test]
    fn test_sampled_path_gives_distinct_subsets() {
        let ids: Vec<String> = (0..40).map(|i| format!("e{i}")).collect();
        let planner = CombinationPlanner::new(100);
        let plan = planner.plan(&ids, 4, 500, Some(3)).unwrap();
        assert_eq!(plan.strategy, PlanStrategy::Sampled);
        assert_eq!(plan.combinations.len(), 500);
        assert_distinct_subsets(&plan, &ids, 4);

        let replay = planner.plan(&ids, 4, 500, Some(3)).unwrap();
        assert_eq!(plan.combinations, replay.combinations);
    }

    #[test]
    fn test_sampled_path_can_exhaust_small_space() {
        let ids = pool(&["A", "B", "C", "D", "E"]);
        let plan = CombinationPlanner::new(0).plan(&ids, 2, 10, Some(9)).unwrap();
        assert_eq!(plan.strategy, PlanStrategy::Sampled);
        assert_distinct_subsets(&plan, &ids, 2);
    }

    #[test]
    fn test_index_subsets_lexicographic() {
        assert_eq!(
            index_subsets(4, 2),
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(index_subsets(3, 3), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_validate_explicit_combinations() {
        let ids = pool(&["A", "B", "C"]);
        let planner = CombinationPlanner::default();

        let plan = planner
            .validate(&ids, 2, vec![pool(&["A", "B"]), pool(&["C", "A"])])
            .unwrap();
        assert_eq!(plan.strategy, PlanStrategy::Explicit);
        assert_eq!(plan.seed, None);

        let swapped = planner.validate(&ids, 2, vec![pool(&["A", "B"]), pool(&["B", "A"])]);
        assert!(swapped.is_err());

        let stranger = planner.validate(&ids, 2, vec![pool(&["A", "Z"])]);
        assert!(matches!(stranger, Err(AppError::Validation(_))));

        let wrong_size = planner.validate(&ids, 2, vec![pool(&["A"])]);
        assert!(matches!(wrong_size, Err(AppError::InvalidBatchSize(_))));

        let repeated = planner.validate(&ids, 2, vec![pool(&["A", "A"])]);
        assert!(repeated.is_err());
    }
}
