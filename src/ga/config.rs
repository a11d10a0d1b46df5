//! GA configuration.
//!
//! [`GaConfig`] holds all parameters that control the evolutionary loop.

use super::crossover::Crossover;
use super::selection::Selection;

/// Configuration for the genetic algorithm.
///
/// Controls population size, strategies, operator rates, and the seed.
///
/// # Defaults
///
/// ```
/// use satplan::ga::GaConfig;
///
/// let config = GaConfig::default();
/// assert_eq!(config.population_size, 50);
/// assert_eq!(config.generations, 100);
/// assert_eq!(config.num_elites, 2);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use satplan::ga::{Crossover, GaConfig, Selection};
///
/// let config = GaConfig::default()
///     .with_population_size(200)
///     .with_crossover(Crossover::TimeOrdered)
///     .with_selection(Selection::Roulette)
///     .with_seed(42);
/// ```
#[derive(Debug, Clone)]
pub struct GaConfig {
    /// Number of plans in the population.
    ///
    /// Larger populations increase diversity but slow down each
    /// generation. Must be at least 2.
    pub population_size: usize,

    /// Number of generations to run. Termination is purely
    /// iteration-count based; there is no early-convergence stop.
    pub generations: usize,

    /// Number of top plans carried unchanged into the next generation.
    /// Typical range: 2–3. Must be smaller than the population.
    pub num_elites: usize,

    /// Fraction of a plan's takes replaced by random catalog takes each
    /// generation (0.0–1.0). Typical range: 0.05–0.10.
    pub mutation_rate: f64,

    /// Share of the priority-ranked catalog the local-search step tries
    /// to insert into each non-elite plan (0.0–1.0).
    pub local_search_fraction: f64,

    /// Offspring recombination strategy.
    pub crossover: Crossover,

    /// Parent selection strategy.
    pub selection: Selection,

    /// Random seed for reproducibility. `None` uses a random seed.
    pub seed: Option<u64>,

    /// Whether to refine non-elite plans in parallel.
    ///
    /// Has no effect unless the crate is built with the `parallel`
    /// feature.
    pub parallel: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            num_elites: 2,
            mutation_rate: 0.08,
            local_search_fraction: 0.2,
            crossover: Crossover::default(),
            selection: Selection::default(),
            seed: None,
            parallel: false,
        }
    }
}

impl GaConfig {
    /// Sets the population size.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Sets the number of generations.
    pub fn with_generations(mut self, n: usize) -> Self {
        self.generations = n;
        self
    }

    /// Sets the number of elites.
    pub fn with_num_elites(mut self, n: usize) -> Self {
        self.num_elites = n;
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the local-search catalog fraction.
    pub fn with_local_search_fraction(mut self, fraction: f64) -> Self {
        self.local_search_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Sets the crossover strategy.
    pub fn with_crossover(mut self, crossover: Crossover) -> Self {
        self.crossover = crossover;
        self
    }

    /// Sets the parent selection strategy.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enables or disables parallel refinement.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns `Err` with a description if any parameter is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.population_size < 2 {
            return Err("population_size must be at least 2".into());
        }
        if self.generations == 0 {
            return Err("generations must be at least 1".into());
        }
        if self.num_elites >= self.population_size {
            return Err("num_elites must be smaller than population_size".into());
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err("mutation_rate must be within 0.0..=1.0".into());
        }
        if !(0.0..=1.0).contains(&self.local_search_fraction) {
            return Err("local_search_fraction must be within 0.0..=1.0".into());
        }
        Ok(())
    }
}
