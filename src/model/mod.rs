//! Domain model: takes, requests, downlink windows, and the shared
//! problem catalog.
//!
//! # Key Types
//!
//! - [`Dto`]: a data-take opportunity (time window + memory cost)
//! - [`AcquisitionRequest`]: a ranked demand, satisfied by at most one take
//! - [`DownlinkOpportunity`]: a contact window draining memory at a bounded rate
//! - [`Paw`]: a platform activity window blocking conflicting takes
//! - [`Instance`]: the validated, shared, read-only catalog
//!
//! Interval utilities are re-exported at this level: the closed-interval
//! [`overlap`] test and the sorted-sequence searches used by plans.

mod event;
mod instance;
mod types;

pub use event::{find_dto, insertion_point, overlap, TimeWindowed};
pub use instance::{Instance, InstanceError, DUMMY_DLO_ID};
pub use types::{AcquisitionRequest, DownlinkOpportunity, Dto, Paw};
