//! Parent selection strategies.
//!
//! Selection picks the two parents each crossover recombines. The first
//! parent carries the selection pressure; the second is always drawn
//! uniformly from the whole population, deliberately unweighted, to
//! preserve diversity.
//!
//! # References
//!
//! - Goldberg & Deb (1991), "A Comparative Analysis of Selection Schemes
//!   Used in Genetic Algorithms"

use std::str::FromStr;

use rand::Rng;

use super::plan::Plan;

/// Strategy for picking the first parent of a pair.
///
/// Fitness is maximized: higher-fitness plans are preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Fitness-proportionate (roulette wheel) choice. Falls back to a
    /// uniform draw when the whole population has zero fitness, so a
    /// pathological all-empty population never divides by zero.
    ///
    /// # Complexity
    /// O(n) per selection (linear scan)
    Roulette,
    /// Uniform choice; no selection pressure. Mostly a diversity
    /// baseline for experiments.
    Uniform,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Roulette
    }
}

impl Selection {
    /// Picks a `(parent1, parent2)` index pair from the population.
    ///
    /// # Panics
    /// Panics if `population` is empty.
    pub fn select_pair<R: Rng>(&self, population: &[Plan], rng: &mut R) -> (usize, usize) {
        assert!(
            !population.is_empty(),
            "cannot select from an empty population"
        );
        let first = match self {
            Selection::Roulette => roulette(population, rng),
            Selection::Uniform => rng.random_range(0..population.len()),
        };
        let second = rng.random_range(0..population.len());
        (first, second)
    }
}

fn roulette<R: Rng>(population: &[Plan], rng: &mut R) -> usize {
    let total: f64 = population.iter().map(|p| p.fitness()).sum();
    if total <= 0.0 {
        return rng.random_range(0..population.len());
    }
    let threshold = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (i, plan) in population.iter().enumerate() {
        cumulative += plan.fitness();
        if cumulative > threshold {
            return i;
        }
    }
    population.len() - 1 // floating-point fallback
}

impl FromStr for Selection {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "roulette" => Ok(Selection::Roulette),
            "uniform" => Ok(Selection::Uniform),
            _ => Err(format!(
                "unknown parent-selection strategy '{name}', expected one of: \
                 roulette, uniform"
            )),
        }
    }
}
