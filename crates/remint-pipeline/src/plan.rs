//! Plan selection: which transforms an attempt composes, in what order,
//! with which seeds.
//!
//! All randomness in a run flows from the single PCG32 generator owned by
//! [`PlanSelector`]. Given the same run seed and the same sequence of
//! calls, the selector yields the same plans, which makes whole runs
//! reproducible.

use rand::seq::SliceRandom as _;
use rand::{Rng as _, RngCore as _, SeedableRng as _};
use rand_pcg::Pcg32;

use crate::transform::{Catalog, TransformMethod};
use crate::types::{GenerationConfig, MethodRange};

/// Seed offset between consecutive steps of one plan.
const STEP_SEED_STRIDE: u64 = 100;
/// Seed offset between consecutive attempts of one version.
const RETRY_SEED_STRIDE: u64 = 1000;

/// How aggressively an attempt perturbs the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiversityLevel {
    /// Ordinary attempt.
    #[default]
    Base,
    /// Attempt following a hash collision: more methods per plan.
    Escalated,
}

impl DiversityLevel {
    /// Plan size range this level uses under `config`.
    #[must_use]
    pub const fn method_range(self, config: &GenerationConfig) -> MethodRange {
        match self {
            Self::Base => config.base_methods,
            Self::Escalated => config.escalated_methods,
        }
    }
}

/// One transform of a plan together with the seed it runs with.
#[derive(Clone, Copy)]
pub struct PlanStep<'c> {
    /// The transform to apply.
    pub method: &'c dyn TransformMethod,
    /// Seed passed to [`TransformMethod::apply`].
    pub seed: u64,
}

impl std::fmt::Debug for PlanStep<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanStep")
            .field("method", &self.method.name())
            .field("seed", &self.seed)
            .finish()
    }
}

/// Ordered sequence of transforms to fold through the source image.
///
/// Order matters: two plans with the same methods in a different order
/// are different plans.
#[derive(Debug, Clone)]
pub struct ModificationPlan<'c> {
    steps: Vec<PlanStep<'c>>,
}

impl<'c> ModificationPlan<'c> {
    /// Create a plan from explicit steps.
    #[must_use]
    pub const fn new(steps: Vec<PlanStep<'c>>) -> Self {
        Self { steps }
    }

    /// The steps in application order.
    #[must_use]
    pub fn steps(&self) -> &[PlanStep<'c>] {
        &self.steps
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Method names in application order.
    #[must_use]
    pub fn method_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.method.name()).collect()
    }
}

/// Seed of the step at `position` of attempt `retry`.
///
/// Distinct retries of the same base seed never share a seed sequence
/// as long as plans have fewer than ten steps.
#[must_use]
pub const fn derive_step_seed(base_seed: u64, position: usize, retry: u32) -> u64 {
    base_seed
        .wrapping_add((position as u64).wrapping_mul(STEP_SEED_STRIDE))
        .wrapping_add((retry as u64).wrapping_mul(RETRY_SEED_STRIDE))
}

/// Chooses plans for successive attempts from a catalog.
pub struct PlanSelector<'c> {
    catalog: &'c Catalog,
    rng: Pcg32,
}

impl<'c> PlanSelector<'c> {
    /// Create a selector whose generator is seeded from `run_seed`.
    #[must_use]
    pub fn new(catalog: &'c Catalog, run_seed: u64) -> Self {
        Self {
            catalog,
            rng: Pcg32::seed_from_u64(run_seed),
        }
    }

    /// Draw a fresh base seed for an attempt.
    pub fn next_base_seed(&mut self) -> u64 {
        u64::from(self.rng.next_u32())
    }

    /// Choose a plan.
    ///
    /// Draws a method count from `range` (clamped to the catalog size),
    /// picks that many distinct methods in random order, and derives each
    /// step's seed from `base_seed`, its position, and `retry`.
    pub fn select(
        &mut self,
        base_seed: u64,
        range: MethodRange,
        retry: u32,
    ) -> ModificationPlan<'c> {
        let available = self.catalog.len();
        let lo = range.min.min(available);
        let hi = range.max.clamp(lo, available);
        let count = if lo == hi {
            lo
        } else {
            self.rng.gen_range(lo..=hi)
        };

        let mut indices: Vec<usize> = (0..available).collect();
        let (chosen, _) = indices.partial_shuffle(&mut self.rng, count);

        let catalog = self.catalog;
        let steps = chosen
            .iter()
            .enumerate()
            .filter_map(|(position, &index)| {
                catalog.get(index).map(|method| PlanStep {
                    method,
                    seed: derive_step_seed(base_seed, position, retry),
                })
            })
            .collect();
        ModificationPlan::new(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformKind;

    #[test]
    fn levels_map_to_config_ranges() {
        let config = GenerationConfig::default();
        assert_eq!(
            DiversityLevel::Base.method_range(&config),
            MethodRange::new(2, 4)
        );
        assert_eq!(
            DiversityLevel::Escalated.method_range(&config),
            MethodRange::new(3, 5)
        );
    }

    #[test]
    fn step_seeds_combine_position_and_retry() {
        assert_eq!(derive_step_seed(5, 0, 0), 5);
        assert_eq!(derive_step_seed(5, 2, 0), 205);
        assert_eq!(derive_step_seed(5, 2, 3), 3205);
    }

    #[test]
    fn step_seed_wraps_instead_of_overflowing() {
        assert_eq!(derive_step_seed(u64::MAX, 1, 0), 99);
    }

    #[test]
    fn base_plans_have_two_to_four_distinct_methods() {
        let catalog = Catalog::standard();
        let mut selector = PlanSelector::new(&catalog, 1);
        for _ in 0..200 {
            let base = selector.next_base_seed();
            let plan = selector.select(base, MethodRange::new(2, 4), 0);
            assert!((2..=4).contains(&plan.len()), "plan size {}", plan.len());
            let mut names = plan.method_names();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), plan.len(), "plan repeats a method");
        }
    }

    #[test]
    fn every_size_in_range_occurs() {
        let catalog = Catalog::standard();
        let mut selector = PlanSelector::new(&catalog, 9);
        let mut seen = [false; 6];
        for _ in 0..200 {
            let plan = selector.select(0, MethodRange::new(3, 5), 1);
            seen[plan.len()] = true;
        }
        assert_eq!(seen, [false, false, false, true, true, true]);
    }

    #[test]
    fn plan_size_is_clamped_to_catalog() {
        let catalog = Catalog::new(Vec::new()).with_method(TransformKind::Brightness);
        let mut selector = PlanSelector::new(&catalog, 0);
        let plan = selector.select(0, MethodRange::new(3, 5), 0);
        assert_eq!(plan.method_names(), vec!["brightness"]);
    }

    #[test]
    fn empty_catalog_gives_empty_plan() {
        let catalog = Catalog::new(Vec::new());
        let mut selector = PlanSelector::new(&catalog, 0);
        assert!(selector.select(0, MethodRange::new(2, 4), 0).is_empty());
    }

    #[test]
    fn same_run_seed_same_plans() {
        let catalog = Catalog::standard();
        let mut a = PlanSelector::new(&catalog, 77);
        let mut b = PlanSelector::new(&catalog, 77);
        for retry in 0..10 {
            let (sa, sb) = (a.next_base_seed(), b.next_base_seed());
            assert_eq!(sa, sb);
            let pa = a.select(sa, MethodRange::new(2, 4), retry);
            let pb = b.select(sb, MethodRange::new(2, 4), retry);
            assert_eq!(pa.method_names(), pb.method_names());
            let seeds_a: Vec<_> = pa.steps().iter().map(|s| s.seed).collect();
            let seeds_b: Vec<_> = pb.steps().iter().map(|s| s.seed).collect();
            assert_eq!(seeds_a, seeds_b);
        }
    }

    #[test]
    fn plans_are_not_always_in_catalog_order() {
        let catalog = Catalog::standard();
        let mut selector = PlanSelector::new(&catalog, 3);
        let order: Vec<&str> = catalog.names().collect();
        let unordered = (0..50).any(|_| {
            let plan = selector.select(0, MethodRange::new(4, 4), 0);
            let positions: Vec<usize> = plan
                .method_names()
                .iter()
                .filter_map(|n| order.iter().position(|o| o == n))
                .collect();
            positions.windows(2).any(|w| w[0] > w[1])
        });
        assert!(unordered, "selection never permuted catalog order");
    }
}
