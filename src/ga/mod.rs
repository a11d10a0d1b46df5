//! Genetic algorithm engine for data-take and downlink planning.
//!
//! The engine searches over candidate [`Plan`]s: which time-windowed
//! takes to execute and which downlink window evacuates each of them,
//! under four hard constraints (no overlap, one take per AR, no
//! duplicates, memory within capacity). Crossover and mutation freely
//! produce infeasible offspring; the repair operators restore every
//! invariant before the next fitness read.
//!
//! # Key Types
//!
//! - [`Plan`]: one candidate schedule, with feasibility checks, repair
//!   operators, and the memory/download simulation
//! - [`Crossover`], [`Selection`]: the pluggable operators, as closed
//!   tagged variants selected once at configuration time
//! - [`GaConfig`]: algorithm parameters with builder and validation
//! - [`GeneticAlgorithm`]: owns the population and runs the loop
//! - [`GaResult`]: best plan found plus run statistics
//!
//! # References
//!
//! - Holland (1975), *Adaptation in Natural and Artificial Systems*
//! - Goldberg (1989), *Genetic Algorithms in Search, Optimization, and
//!   Machine Learning*

mod config;
mod crossover;
mod plan;
mod runner;
mod selection;

pub use config::GaConfig;
pub use crossover::Crossover;
pub use plan::{Constraint, Plan};
pub use runner::{GaResult, GeneticAlgorithm};
pub use selection::Selection;
