//! Problem instance assembly.
//!
//! [`Instance`] is the shared read-only catalog every candidate plan
//! references: the take catalog, the AR catalog, the downlink windows,
//! and the two mission constants (memory capacity, downlink rate).
//!
//! Construction normalizes the raw records the way the mission prep
//! pipeline does: takes conflicting with platform activity windows or
//! downlink windows are dropped, catalogs are sorted by start time, ARs
//! get dense indices, each take caches its AR's rank as `priority`, and
//! a zero-duration sentinel window is appended after the last event so
//! every take has a terminal downlink boundary.

use thiserror::Error;

use super::event::{overlap, TimeWindowed};
use super::types::{AcquisitionRequest, DownlinkOpportunity, Dto, Paw};

/// Id of the sentinel downlink window appended after the last event.
pub const DUMMY_DLO_ID: u64 = u64::MAX;

/// Rejected instance data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstanceError {
    #[error("DTO {dto_id} references unknown AR {ar_id}")]
    UnknownAr { dto_id: u64, ar_id: u64 },
    #[error("duplicate DTO id {0}")]
    DuplicateDto(u64),
    #[error("duplicate AR id {0}")]
    DuplicateAr(u64),
    #[error("event {id} stops at {stop} before it starts at {start}")]
    InvalidWindow { id: u64, start: f64, stop: f64 },
    #[error("DTO {dto_id} has negative memory {memory}")]
    NegativeMemory { dto_id: u64, memory: f64 },
    #[error("memory capacity must be positive, got {0}")]
    InvalidCapacity(f64),
    #[error("downlink rate must be non-negative, got {0}")]
    InvalidDownlinkRate(f64),
}

/// Shared read-only catalog of a planning problem.
///
/// Candidate plans hold an `Arc<Instance>` and reference takes and
/// downlink windows by index; nothing in here mutates after
/// construction. The serde surface is the raw record types, not this
/// built catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    dtos: Vec<Dto>,
    ars: Vec<AcquisitionRequest>,
    dlos: Vec<DownlinkOpportunity>,
    capacity: f64,
    downlink_rate: f64,
}

impl Instance {
    /// Builds a full instance: validates the records, drops takes that
    /// overlap a PAW or a downlink window, sorts the catalogs, indexes
    /// the ARs, copies ranks down to take priorities, and appends the
    /// sentinel window when downlinks are modeled.
    pub fn new(
        dtos: Vec<Dto>,
        ars: Vec<AcquisitionRequest>,
        dlos: Vec<DownlinkOpportunity>,
        paws: Vec<Paw>,
        capacity: f64,
        downlink_rate: f64,
    ) -> Result<Self, InstanceError> {
        if !(capacity > 0.0) {
            return Err(InstanceError::InvalidCapacity(capacity));
        }
        if downlink_rate < 0.0 {
            return Err(InstanceError::InvalidDownlinkRate(downlink_rate));
        }
        validate_windows(&dtos)?;
        validate_windows(&dlos)?;
        validate_windows(&paws)?;

        let mut seen = std::collections::HashSet::new();
        for dto in &dtos {
            if dto.memory < 0.0 {
                return Err(InstanceError::NegativeMemory {
                    dto_id: dto.id,
                    memory: dto.memory,
                });
            }
            if !seen.insert(dto.id) {
                return Err(InstanceError::DuplicateDto(dto.id));
            }
        }

        let mut ars = ars;
        let mut ar_ids = std::collections::HashMap::new();
        for (index, ar) in ars.iter_mut().enumerate() {
            ar.index = index;
            if ar_ids.insert(ar.id, index).is_some() {
                return Err(InstanceError::DuplicateAr(ar.id));
            }
        }

        // takes conflicting with platform activity or downlink windows
        // cannot be scheduled at all
        let mut dtos: Vec<Dto> = dtos
            .into_iter()
            .filter(|dto| {
                !paws.iter().any(|paw| overlap(dto, paw))
                    && !dlos.iter().any(|dlo| overlap(dto, dlo))
            })
            .collect();

        for dto in &mut dtos {
            let index = *ar_ids.get(&dto.ar_id).ok_or(InstanceError::UnknownAr {
                dto_id: dto.id,
                ar_id: dto.ar_id,
            })?;
            dto.ar_index = index;
            dto.priority = ars[index].rank;
        }

        dtos.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        let mut dlos = dlos;
        dlos.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        if !dlos.is_empty() {
            dlos.push(make_dummy_dlo(&dtos, &dlos));
        }

        Ok(Self {
            dtos,
            ars,
            dlos,
            capacity,
            downlink_rate,
        })
    }

    /// Convenience constructor for the relaxed problem: no downlink
    /// windows, no platform activity windows, memory is only acquired.
    pub fn relaxed(
        dtos: Vec<Dto>,
        ars: Vec<AcquisitionRequest>,
        capacity: f64,
    ) -> Result<Self, InstanceError> {
        Self::new(dtos, ars, Vec::new(), Vec::new(), capacity, 0.0)
    }

    pub fn dtos(&self) -> &[Dto] {
        &self.dtos
    }

    pub fn ars(&self) -> &[AcquisitionRequest] {
        &self.ars
    }

    /// Downlink windows in time order, sentinel included (last entry).
    /// Empty for the relaxed problem.
    pub fn dlos(&self) -> &[DownlinkOpportunity] {
        &self.dlos
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn downlink_rate(&self) -> f64 {
        self.downlink_rate
    }

    /// Whether downlink windows are modeled (complete problem).
    pub fn has_downlinks(&self) -> bool {
        !self.dlos.is_empty()
    }
}

fn validate_windows<E>(events: &[E]) -> Result<(), InstanceError>
where
    E: TimeWindowed + HasId,
{
    for event in events {
        if event.stop_time() < event.start_time() {
            return Err(InstanceError::InvalidWindow {
                id: event.id(),
                start: event.start_time(),
                stop: event.stop_time(),
            });
        }
    }
    Ok(())
}

trait HasId {
    fn id(&self) -> u64;
}

impl HasId for Dto {
    fn id(&self) -> u64 {
        self.id
    }
}

impl HasId for DownlinkOpportunity {
    fn id(&self) -> u64 {
        self.id
    }
}

impl HasId for Paw {
    fn id(&self) -> u64 {
        self.id
    }
}

/// Zero-duration sentinel strictly after the last event, so the download
/// walk always has a terminal boundary to accumulate trailing takes
/// against.
fn make_dummy_dlo(dtos: &[Dto], dlos: &[DownlinkOpportunity]) -> DownlinkOpportunity {
    let last_stop = dtos
        .iter()
        .map(|d| d.stop_time)
        .chain(dlos.iter().map(|d| d.stop_time))
        .fold(f64::NEG_INFINITY, f64::max);
    let start = last_stop + 1.0;
    DownlinkOpportunity::new(DUMMY_DLO_ID, start, start)
}
