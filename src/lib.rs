//! Satellite data-take scheduling and downlink planning.
//!
//! Plans which downlink-bound observation takes a satellite executes and
//! when their data is transmitted to ground stations, under onboard
//! memory and downlink bandwidth limits. Selection happens among
//! time-windowed data-take opportunities (DTOs), each tied to a ranked
//! acquisition request (AR), subject to four hard constraints:
//!
//! - no two selected takes overlap in time,
//! - at most one take satisfies a given AR,
//! - onboard memory never exceeds capacity,
//! - downlink windows (DLOs) evacuate memory only within their time
//!   window and at a bounded rate.
//!
//! The optimizer is a heuristic: a genetic algorithm over candidate
//! plans with feasibility-restoring repair, greedy download packing, and
//! local search. It returns the best feasible plan found, not a
//! certified optimum.
//!
//! # Modules
//!
//! - [`model`]: domain records (takes, requests, downlink windows) and
//!   the validated, shared problem catalog
//! - [`ga`]: the genetic algorithm engine — plans, operators, repair,
//!   and the generational driver
//!
//! The crate performs no I/O: instances arrive as in-memory records
//! (serde-deserializable from the mission JSON formats) and results are
//! returned as plain values.

pub mod ga;
pub mod model;
