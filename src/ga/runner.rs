//! GA evolutionary loop execution.
//!
//! [`GeneticAlgorithm`] owns the population and runs the generational
//! loop: elitism → parent selection → crossover → mutation → download
//! refresh → repair → local search. Every intermediate infeasibility is
//! repaired before the next fitness read, so the run never fails on an
//! infeasible individual; a best plan with zero takes is a valid outcome
//! on pathological instances.

use std::sync::Arc;

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::model::Instance;

use super::config::GaConfig;
use super::plan::Plan;

/// Result of a GA optimization run.
#[derive(Debug, Clone)]
pub struct GaResult {
    /// The best plan found during the entire run.
    pub best: Plan,

    /// Best fitness value (same as `best.fitness()`).
    pub best_fitness: f64,

    /// Number of generations executed.
    pub generations: usize,

    /// Best fitness at the end of each generation.
    pub fitness_history: Vec<f64>,
}

/// Executes the GA over one problem instance.
///
/// # Usage
///
/// ```
/// use std::sync::Arc;
/// use satplan::ga::{GaConfig, GeneticAlgorithm};
/// use satplan::model::{AcquisitionRequest, Dto, Instance};
///
/// let instance = Arc::new(Instance::relaxed(
///     vec![Dto::new(1, 1, 0.0, 10.0, 30.0), Dto::new(2, 2, 20.0, 30.0, 40.0)],
///     vec![AcquisitionRequest::new(1, 5.0), AcquisitionRequest::new(2, 8.0)],
///     100.0,
/// )?);
/// let config = GaConfig::default()
///     .with_population_size(10)
///     .with_generations(5)
///     .with_seed(42);
///
/// let mut ga = GeneticAlgorithm::new(instance, config)?;
/// let result = ga.run();
/// assert_eq!(result.best_fitness, 13.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct GeneticAlgorithm {
    instance: Arc<Instance>,
    config: GaConfig,
    population: Vec<Plan>,
    /// Catalog indices sorted by priority descending, for local search.
    ranked_dtos: Vec<usize>,
    fitness_history: Vec<f64>,
    rng: StdRng,
}

impl GeneticAlgorithm {
    /// Validates the configuration and seeds an initial feasible
    /// population: each plan shuffles the catalog and greedily adds every
    /// take that keeps it feasible.
    ///
    /// Fails fast with a descriptive error on an invalid configuration,
    /// before any population work begins.
    pub fn new(instance: Arc<Instance>, config: GaConfig) -> Result<Self, String> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::random()),
        };

        let mut ranked_dtos: Vec<usize> = (0..instance.dtos().len()).collect();
        {
            let catalog = instance.dtos();
            ranked_dtos.sort_by(|&a, &b| {
                catalog[b]
                    .priority
                    .total_cmp(&catalog[a].priority)
                    .then(catalog[a].id.cmp(&catalog[b].id))
            });
        }

        let population = (0..config.population_size)
            .map(|_| seed_plan(&instance, &mut rng))
            .collect();

        Ok(Self {
            instance,
            config,
            population,
            ranked_dtos,
            fitness_history: Vec::new(),
            rng,
        })
    }

    /// Runs the configured number of generations and returns the best
    /// plan found. Termination is iteration-count based only.
    pub fn run(&mut self) -> GaResult {
        self.fitness_history
            .reserve(self.config.generations);
        for generation in 0..self.config.generations {
            self.evolve_generation();
            let best_fitness = self.best().fitness();
            self.fitness_history.push(best_fitness);
            debug!(
                "generation {}/{}: best fitness {:.3}",
                generation + 1,
                self.config.generations,
                best_fitness
            );
        }

        let best = self.best().clone();
        GaResult {
            best_fitness: best.fitness(),
            best,
            generations: self.config.generations,
            fitness_history: self.fitness_history.clone(),
        }
    }

    /// The current best plan by fitness.
    pub fn best(&self) -> &Plan {
        self.population
            .iter()
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
            .expect("population must not be empty")
    }

    pub fn population(&self) -> &[Plan] {
        &self.population
    }

    /// Best fitness recorded at the end of each generation run so far.
    pub fn fitness_history(&self) -> &[f64] {
        &self.fitness_history
    }

    /// Diagnostic dump of the whole population, one plan per line.
    pub fn population_summary(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        for (i, plan) in self.population.iter().enumerate() {
            let _ = writeln!(out, "#{i:<3} {plan}");
        }
        out
    }

    /// One generation: elites are carried over, the rest of the
    /// population is replaced by refined crossover offspring.
    fn evolve_generation(&mut self) {
        self.population
            .sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
        let elite_count = self.config.num_elites.min(self.population.len());
        let mut next: Vec<Plan> = self.population[..elite_count].to_vec();

        let offspring_count = self.config.population_size - elite_count;
        let mut offspring = Vec::with_capacity(offspring_count);
        for _ in 0..offspring_count {
            let (first, second) = self
                .config
                .selection
                .select_pair(&self.population, &mut self.rng);
            let sequence = self.config.crossover.combine(
                &self.population[first],
                &self.population[second],
                &mut self.rng,
            );
            offspring.push(Plan::from_dto_indices(Arc::clone(&self.instance), sequence));
        }

        self.refine_offspring(&mut offspring);

        // elites are untouched by the operators but repaired defensively
        for elite in &mut next {
            elite.repair(&mut self.rng);
        }

        next.append(&mut offspring);
        self.population = next;
    }

    /// Mutation, download refresh, repair, and local search for every
    /// offspring plan.
    fn refine_offspring(&mut self, offspring: &mut [Plan]) {
        #[cfg(feature = "parallel")]
        if self.config.parallel {
            use rayon::prelude::*;
            // each worker owns its plan and a private RNG seeded from the
            // master stream, so a generation stays data-race free
            let seeds: Vec<u64> = offspring.iter().map(|_| self.rng.random()).collect();
            let ranked = &self.ranked_dtos;
            let config = &self.config;
            offspring
                .par_iter_mut()
                .zip(seeds)
                .for_each(|(plan, seed)| {
                    let mut rng = StdRng::seed_from_u64(seed);
                    refine_plan(plan, ranked, config, &mut rng);
                });
            return;
        }

        for plan in offspring.iter_mut() {
            refine_plan(plan, &self.ranked_dtos, &self.config, &mut self.rng);
        }
    }
}

/// Shuffle the catalog and greedily add every take that keeps the plan
/// feasible; compute the initial download assignment when downlinks are
/// modeled.
fn seed_plan<R: Rng>(instance: &Arc<Instance>, rng: &mut R) -> Plan {
    let mut order: Vec<usize> = (0..instance.dtos().len()).collect();
    order.shuffle(rng);

    let mut plan = Plan::new(Arc::clone(instance));
    for index in order {
        if plan.keeps_feasibility(index) {
            plan.add_dto(index);
        }
    }
    if instance.has_downlinks() {
        plan.update_downloads();
    }
    plan
}

/// The per-individual pipeline of one generation: mutation, then the
/// full repair pass (which refreshes the download assignment), then
/// greedy local search over the top of the priority-ranked catalog.
fn refine_plan<R: Rng>(plan: &mut Plan, ranked_dtos: &[usize], config: &GaConfig, rng: &mut R) {
    mutate(plan, config.mutation_rate, rng);
    plan.repair(rng);
    local_search(plan, ranked_dtos, config.local_search_fraction);
}

/// Replaces a small fraction of the plan's takes with random catalog
/// takes. Insertions go through the unchecked add, which silently no-ops
/// on AR conflicts; overlaps introduced here are removed by the repair
/// pass that follows.
fn mutate<R: Rng>(plan: &mut Plan, rate: f64, rng: &mut R) {
    let catalog_len = plan.instance().dtos().len();
    if catalog_len == 0 {
        return;
    }
    let replacements = ((plan.len() as f64 * rate).ceil() as usize).max(1);
    for _ in 0..replacements {
        if !plan.is_empty() {
            let at = rng.random_range(0..plan.len());
            plan.remove_dto_at(at);
        }
    }
    for _ in 0..replacements {
        let index = rng.random_range(0..catalog_len);
        plan.add_dto(index);
    }
}

/// Greedily inserts unselected high-priority takes that keep the plan
/// feasible: the downlink problem goes through the atomic
/// add-and-download, the relaxed problem through the cheap feasibility
/// probe.
fn local_search(plan: &mut Plan, ranked_dtos: &[usize], fraction: f64) {
    let take = ((ranked_dtos.len() as f64 * fraction).ceil() as usize).min(ranked_dtos.len());
    let downlinks = plan.instance().has_downlinks();
    for &index in &ranked_dtos[..take] {
        if downlinks {
            plan.add_and_download(index);
        } else if plan.keeps_feasibility(index) {
            plan.add_dto(index);
        }
    }
}
