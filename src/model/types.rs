//! Domain records: data takes, acquisition requests, downlink windows.
//!
//! Field names match the instance JSON produced by the mission planning
//! toolchain (`DTOs.json`, `ARs.json`, `DLOs.json`, `PAWs.json`), so the
//! raw records deserialize directly. Derived fields (`ar_index`,
//! `priority`, `index`) are filled in during [`Instance`] construction
//! and skipped by serde.
//!
//! All times are epoch-relative seconds; memory and downlink volumes are
//! in the same unit as the instance's memory capacity.
//!
//! [`Instance`]: super::Instance

use serde::{Deserialize, Serialize};

use super::event::TimeWindowed;

/// A data-take opportunity: one candidate execution window for an
/// acquisition request, with its onboard memory cost.
///
/// Immutable once the instance is built; candidate plans reference takes
/// by catalog index and never copy or mutate them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dto {
    /// Unique take identifier.
    pub id: u64,
    /// Owning acquisition request.
    pub ar_id: u64,
    /// Dense index of the owning AR, derived at instance build.
    #[serde(skip)]
    pub ar_index: usize,
    /// Execution window start (epoch seconds).
    pub start_time: f64,
    /// Execution window end (epoch seconds).
    pub stop_time: f64,
    /// Onboard memory consumed by executing this take.
    pub memory: f64,
    /// Rank of the owning AR, copied down at instance build.
    #[serde(skip)]
    pub priority: f64,
}

impl Dto {
    pub fn new(id: u64, ar_id: u64, start_time: f64, stop_time: f64, memory: f64) -> Self {
        Self {
            id,
            ar_id,
            ar_index: 0,
            start_time,
            stop_time,
            memory,
            priority: 0.0,
        }
    }
}

impl TimeWindowed for Dto {
    fn start_time(&self) -> f64 {
        self.start_time
    }
    fn stop_time(&self) -> f64 {
        self.stop_time
    }
}

/// An acquisition request: a ranked demand that at most one of its takes
/// may satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionRequest {
    pub id: u64,
    /// Priority rank; higher is preferred.
    pub rank: f64,
    /// Dense position in the AR catalog, derived at instance build.
    #[serde(skip)]
    pub index: usize,
}

impl AcquisitionRequest {
    pub fn new(id: u64, rank: f64) -> Self {
        Self { id, rank, index: 0 }
    }
}

/// A downlink opportunity: a ground-station contact window during which
/// accumulated memory drains at the instance's bounded downlink rate.
///
/// The catalog holds the read-only template; which takes a window
/// evacuates is per-candidate state kept by [`Plan`](crate::ga::Plan).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownlinkOpportunity {
    pub id: u64,
    pub start_time: f64,
    pub stop_time: f64,
}

impl DownlinkOpportunity {
    pub fn new(id: u64, start_time: f64, stop_time: f64) -> Self {
        Self {
            id,
            start_time,
            stop_time,
        }
    }

    pub fn duration(&self) -> f64 {
        self.stop_time - self.start_time
    }
}

impl TimeWindowed for DownlinkOpportunity {
    fn start_time(&self) -> f64 {
        self.start_time
    }
    fn stop_time(&self) -> f64 {
        self.stop_time
    }
}

/// A platform activity window. Takes overlapping one are unschedulable
/// and are dropped at instance build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paw {
    pub id: u64,
    pub start_time: f64,
    pub stop_time: f64,
}

impl Paw {
    pub fn new(id: u64, start_time: f64, stop_time: f64) -> Self {
        Self {
            id,
            start_time,
            stop_time,
        }
    }
}

impl TimeWindowed for Paw {
    fn start_time(&self) -> f64 {
        self.start_time
    }
    fn stop_time(&self) -> f64 {
        self.stop_time
    }
}
