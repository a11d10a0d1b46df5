//! Candidate plan: one member of the GA population.
//!
//! A [`Plan`] is an ordered selection of takes plus, when downlinks are
//! modeled, a per-window record of which takes each downlink window
//! evacuates. It keeps the representation the population operators need:
//! catalog indices sorted by start time, an AR-served bitmap, cached
//! total memory and fitness, and the evacuation overlay.
//!
//! Mutating operators deliberately split into a fast unchecked insert
//! ([`Plan::add_dto`]) and batch repair passes; population operators
//! favor throughput over per-insert validation and run repair once per
//! generation.
//!
//! Hard constraints are expressed as [`Constraint`] variants; a plan is
//! feasible iff it satisfies all four.

use std::fmt;
use std::sync::Arc;

use rand::Rng;

use crate::model::{self, Dto, Instance};

/// Tolerance for capacity, rate, and negativity comparisons over summed
/// `f64` memory volumes.
const EPS: f64 = 1e-9;

/// The four hard constraints a feasible plan satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// The onboard memory trajectory never exceeds capacity and never
    /// goes negative.
    Memory,
    /// No two selected takes overlap in time.
    Overlap,
    /// Each acquisition request is satisfied by at most one take.
    SingleSatisfaction,
    /// No take appears twice.
    Duplicates,
}

/// A candidate schedule: selected takes plus their downlink assignment.
///
/// Fitness is the sum of the selected takes' priorities; higher is
/// better.
#[derive(Debug, Clone)]
pub struct Plan {
    instance: Arc<Instance>,
    /// Catalog indices, sorted ascending by start time.
    dtos: Vec<usize>,
    /// Indexed by `Dto::ar_index`.
    ars_served: Vec<bool>,
    /// Parallel to `instance.dlos()`: catalog indices each window evacuates.
    downloads: Vec<Vec<usize>>,
    total_memory: f64,
    fitness: f64,
}

impl Plan {
    /// Creates an empty plan over the shared catalog.
    pub fn new(instance: Arc<Instance>) -> Self {
        let ars = instance.ars().len();
        let dlos = instance.dlos().len();
        Self {
            instance,
            dtos: Vec::new(),
            ars_served: vec![false; ars],
            downloads: vec![Vec::new(); dlos],
            total_memory: 0.0,
            fitness: 0.0,
        }
    }

    /// Wraps a raw take sequence (typically a crossover offspring) into a
    /// plan, re-deriving every cache.
    ///
    /// The sequence may contain duplicates, overlapping takes, or several
    /// takes of one AR; repair is mandatory before the plan is read as
    /// feasible.
    pub fn from_dto_indices(instance: Arc<Instance>, mut sequence: Vec<usize>) -> Self {
        {
            let catalog = instance.dtos();
            sequence.sort_by(|&a, &b| catalog[a].start_time.total_cmp(&catalog[b].start_time));
        }
        let mut plan = Self::new(instance);
        for &index in &sequence {
            let dto = &plan.instance.dtos()[index];
            plan.ars_served[dto.ar_index] = true;
            plan.total_memory += dto.memory;
            plan.fitness += dto.priority;
        }
        plan.dtos = sequence;
        plan
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn len(&self) -> usize {
        self.dtos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dtos.is_empty()
    }

    /// Selected takes as catalog indices, sorted by start time.
    pub fn dto_indices(&self) -> &[usize] {
        &self.dtos
    }

    /// Ids of the selected takes, in schedule order.
    pub fn dto_ids(&self) -> Vec<u64> {
        let catalog = self.instance.dtos();
        self.dtos.iter().map(|&i| catalog[i].id).collect()
    }

    /// Selected takes in schedule order.
    pub fn iter(&self) -> impl Iterator<Item = &Dto> + '_ {
        let catalog = self.instance.dtos();
        self.dtos.iter().map(move |&i| &catalog[i])
    }

    /// Per-window evacuation sets, parallel to [`Instance::dlos`].
    pub fn downloads(&self) -> &[Vec<usize>] {
        &self.downloads
    }

    /// Cached fitness: sum of selected priorities. O(1).
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Cached total acquired memory, ignoring evacuation. O(1).
    pub fn total_memory(&self) -> f64 {
        self.total_memory
    }

    pub fn contains(&self, dto_index: usize) -> bool {
        model::find_dto(dto_index, &self.dtos, self.instance.dtos()).is_some()
    }

    /// Inserts a take at its sorted position and updates the caches.
    ///
    /// Returns `false` without mutating anything if the take's AR is
    /// already served. Does **not** check overlap or memory; callers
    /// needing strict feasibility use [`keeps_feasibility`] first or run
    /// repair afterwards.
    ///
    /// [`keeps_feasibility`]: Plan::keeps_feasibility
    pub fn add_dto(&mut self, dto_index: usize) -> bool {
        let instance = Arc::clone(&self.instance);
        let dto = &instance.dtos()[dto_index];
        if self.ars_served[dto.ar_index] {
            return false;
        }
        let at = model::insertion_point(dto.start_time, &self.dtos, instance.dtos());
        self.dtos.insert(at, dto_index);
        self.ars_served[dto.ar_index] = true;
        self.total_memory += dto.memory;
        self.fitness += dto.priority;
        true
    }

    /// Removes a take by identity. Returns `false` if it is not in the
    /// plan.
    pub fn remove_dto(&mut self, dto_index: usize) -> bool {
        match model::find_dto(dto_index, &self.dtos, self.instance.dtos()) {
            Some(at) => {
                self.remove_dto_at(at);
                true
            }
            None => false,
        }
    }

    /// Removes the take at schedule position `at` and updates the
    /// caches, the AR bitmap, and any evacuation set it participated in.
    ///
    /// # Panics
    /// Panics if `at` is out of range; that is a bug in the calling
    /// sequence, not a recoverable condition.
    pub fn remove_dto_at(&mut self, at: usize) {
        assert!(
            at < self.dtos.len(),
            "take position {at} out of range for plan of length {}",
            self.dtos.len()
        );
        let instance = Arc::clone(&self.instance);
        let dto_index = self.dtos.remove(at);
        let dto = &instance.dtos()[dto_index];
        self.total_memory -= dto.memory;
        self.fitness -= dto.priority;
        // clear the AR flag only if no other take of that AR remains;
        // single satisfaction normally guarantees at most one, but
        // pre-repair offspring can carry several
        let catalog = instance.dtos();
        if !self
            .dtos
            .iter()
            .any(|&i| catalog[i].ar_index == dto.ar_index)
        {
            self.ars_served[dto.ar_index] = false;
        }
        for set in &mut self.downloads {
            set.retain(|&i| i != dto_index);
        }
    }

    /// Whether adding the take would keep the plan feasible: its AR is
    /// unserved, raw memory stays within capacity, and it overlaps
    /// neither neighbor at its insertion point. Checks run in that order;
    /// all three are pure, so the order is unobservable.
    pub fn keeps_feasibility(&self, dto_index: usize) -> bool {
        let dto = &self.instance.dtos()[dto_index];
        if self.ars_served[dto.ar_index] {
            return false;
        }
        if self.total_memory + dto.memory > self.instance.capacity() + EPS {
            return false;
        }
        !self.overlaps_neighbors(dto)
    }

    /// Neighbor-only overlap probe at the take's insertion point.
    ///
    /// Sufficient instead of an O(n) scan when the plan is sorted and
    /// pairwise non-overlapping: with closed-interval semantics a
    /// non-overlapping sorted sequence is strictly disjoint, so only the
    /// two takes adjacent to the insertion point can conflict.
    fn overlaps_neighbors(&self, dto: &Dto) -> bool {
        let catalog = self.instance.dtos();
        let at = model::insertion_point(dto.start_time, &self.dtos, catalog);
        if at > 0 && model::overlap(&catalog[self.dtos[at - 1]], dto) {
            return true;
        }
        if at < self.dtos.len() && model::overlap(&catalog[self.dtos[at]], dto) {
            return true;
        }
        false
    }

    /// Whether the plan satisfies all four hard constraints.
    pub fn is_feasible(&self) -> bool {
        self.satisfies(Constraint::Overlap)
            && self.satisfies(Constraint::SingleSatisfaction)
            && self.satisfies(Constraint::Duplicates)
            && self.satisfies(Constraint::Memory)
    }

    /// Checks a single constraint.
    pub fn satisfies(&self, constraint: Constraint) -> bool {
        let catalog = self.instance.dtos();
        match constraint {
            Constraint::Overlap => {
                // adjacent pairs suffice: under closed-interval overlap a
                // sorted sequence with non-overlapping neighbors is
                // strictly disjoint, which rules out every distant pair too
                self.dtos
                    .windows(2)
                    .all(|w| !model::overlap(&catalog[w[0]], &catalog[w[1]]))
            }
            Constraint::SingleSatisfaction => {
                let mut served = vec![0u32; self.instance.ars().len()];
                self.dtos.iter().all(|&i| {
                    served[catalog[i].ar_index] += 1;
                    served[catalog[i].ar_index] <= 1
                })
            }
            Constraint::Duplicates => {
                let mut seen = std::collections::HashSet::new();
                self.dtos.iter().all(|&i| seen.insert(catalog[i].id))
            }
            Constraint::Memory => {
                if self.instance.has_downlinks() {
                    self.memory_sweep_ok()
                } else {
                    self.total_memory <= self.instance.capacity() + EPS
                }
            }
        }
    }

    /// Simulates the memory trajectory: takes accumulate when they
    /// finish, each downlink window drains its evacuation set at its
    /// start boundary.
    fn memory_sweep_ok(&self) -> bool {
        let catalog = self.instance.dtos();
        let capacity = self.instance.capacity();
        let mut added = vec![false; self.dtos.len()];
        let mut level = 0.0;

        for (w, dlo) in self.instance.dlos().iter().enumerate() {
            for (at, &i) in self.dtos.iter().enumerate() {
                if !added[at] && catalog[i].stop_time < dlo.start_time {
                    added[at] = true;
                    level += catalog[i].memory;
                    if level > capacity + EPS {
                        return false;
                    }
                }
            }
            let drained: f64 = self.downloads[w].iter().map(|&i| catalog[i].memory).sum();
            level -= drained;
            if level < -EPS {
                return false;
            }
        }
        // the sentinel window normally bounds every take; tolerate
        // hand-built instances without one
        for (at, &i) in self.dtos.iter().enumerate() {
            if !added[at] {
                level += catalog[i].memory;
                if level > capacity + EPS {
                    return false;
                }
            }
        }
        true
    }

    /// Removes one of each overlapping adjacent pair (chosen at random)
    /// until no overlap remains. Re-scans one position back after each
    /// removal, since a removal can expose a new adjacency.
    pub fn repair_overlap<R: Rng>(&mut self, rng: &mut R) {
        let instance = Arc::clone(&self.instance);
        let catalog = instance.dtos();
        let mut at = 0;
        while at + 1 < self.dtos.len() {
            if model::overlap(&catalog[self.dtos[at]], &catalog[self.dtos[at + 1]]) {
                let victim = if rng.random_bool(0.5) { at } else { at + 1 };
                self.remove_dto_at(victim);
                at = at.saturating_sub(1);
            } else {
                at += 1;
            }
        }
    }

    /// For every AR served more than once, keeps one take at random and
    /// removes the rest.
    pub fn repair_satisfaction<R: Rng>(&mut self, rng: &mut R) {
        let instance = Arc::clone(&self.instance);
        let catalog = instance.dtos();
        let mut by_ar: Vec<Vec<usize>> = vec![Vec::new(); instance.ars().len()];
        for (at, &i) in self.dtos.iter().enumerate() {
            by_ar[catalog[i].ar_index].push(at);
        }

        let mut doomed = Vec::new();
        for positions in by_ar.iter().filter(|p| p.len() > 1) {
            let keep = positions[rng.random_range(0..positions.len())];
            doomed.extend(positions.iter().copied().filter(|&p| p != keep));
        }
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for at in doomed {
            self.remove_dto_at(at);
        }
    }

    /// Drops every repeated occurrence of a take id, keeping the first.
    pub fn repair_duplicates(&mut self) {
        let instance = Arc::clone(&self.instance);
        let catalog = instance.dtos();
        let mut seen = std::collections::HashSet::new();
        let mut doomed = Vec::new();
        for (at, &i) in self.dtos.iter().enumerate() {
            if !seen.insert(catalog[i].id) {
                doomed.push(at);
            }
        }
        for at in doomed.into_iter().rev() {
            self.remove_dto_at(at);
        }
    }

    /// Removes takes at random until the memory trajectory fits.
    ///
    /// Without downlinks: removes uniformly random takes while the raw
    /// total exceeds capacity; always returns `false`.
    ///
    /// With downlinks: walks the windows in time order; whenever the
    /// running level overflows, removes a uniformly random take from the
    /// current accumulation window (which also drops it from its
    /// evacuation set) and restarts the walk. Returns `true` when any
    /// take was removed, signaling the caller to recompute the download
    /// assignment and retry.
    pub fn repair_memory<R: Rng>(&mut self, rng: &mut R) -> bool {
        if !self.instance.has_downlinks() {
            let capacity = self.instance.capacity();
            while self.total_memory > capacity + EPS {
                let at = rng.random_range(0..self.dtos.len());
                self.remove_dto_at(at);
            }
            return false;
        }

        let instance = Arc::clone(&self.instance);
        let catalog = instance.dtos();
        let capacity = instance.capacity();
        let mut removed_any = false;

        'walk: loop {
            let mut added = vec![false; self.dtos.len()];
            let mut level = 0.0;
            for (w, dlo) in instance.dlos().iter().enumerate() {
                let mut window = Vec::new();
                for at in 0..self.dtos.len() {
                    let dto = &catalog[self.dtos[at]];
                    if !added[at] && dto.stop_time < dlo.start_time {
                        added[at] = true;
                        window.push(at);
                        level += dto.memory;
                    }
                }
                if level > capacity + EPS {
                    assert!(
                        !window.is_empty(),
                        "memory overflow with an empty accumulation window"
                    );
                    let at = window[rng.random_range(0..window.len())];
                    self.remove_dto_at(at);
                    removed_any = true;
                    continue 'walk;
                }
                let drained: f64 = self.downloads[w].iter().map(|&i| catalog[i].memory).sum();
                level -= drained;
                assert!(level >= -EPS, "negative onboard memory during repair walk");
            }
            // trailing takes, for instances without a sentinel window
            let mut trailing = Vec::new();
            for at in 0..self.dtos.len() {
                if !added[at] {
                    trailing.push(at);
                    level += catalog[self.dtos[at]].memory;
                }
            }
            if level > capacity + EPS {
                let at = trailing[rng.random_range(0..trailing.len())];
                self.remove_dto_at(at);
                removed_any = true;
                continue 'walk;
            }
            break;
        }
        removed_any
    }

    /// Recomputes every window's evacuation set from scratch.
    ///
    /// For each window in time order, the candidates are the takes that
    /// finish strictly before the window opens and are not evacuated by
    /// an earlier window; the largest remaining candidate that still fits
    /// under `downlink_rate * duration` is taken until none fits. Greedy,
    /// not optimal; it respects the rate bound and never evacuates a take
    /// twice.
    ///
    /// # Panics
    /// Panics on a duplicate take id (precondition violation: repair
    /// duplicates first) or if the simulated memory level goes negative
    /// (programming error).
    pub fn update_downloads(&mut self) {
        let instance = Arc::clone(&self.instance);
        let catalog = instance.dtos();
        {
            let mut seen = std::collections::HashSet::new();
            for &i in &self.dtos {
                assert!(
                    seen.insert(catalog[i].id),
                    "duplicate take id {} in plan; repair duplicates before \
                     recomputing downloads",
                    catalog[i].id
                );
            }
        }

        for set in &mut self.downloads {
            set.clear();
        }
        let rate = instance.downlink_rate();
        let mut evacuated = vec![false; self.dtos.len()];
        let mut accumulated = vec![false; self.dtos.len()];
        let mut level = 0.0;

        for (w, dlo) in instance.dlos().iter().enumerate() {
            let mut candidates: Vec<usize> = (0..self.dtos.len())
                .filter(|&at| !evacuated[at] && catalog[self.dtos[at]].stop_time < dlo.start_time)
                .collect();
            for &at in &candidates {
                if !accumulated[at] {
                    accumulated[at] = true;
                    level += catalog[self.dtos[at]].memory;
                }
            }
            candidates.sort_by(|&a, &b| {
                catalog[self.dtos[b]]
                    .memory
                    .total_cmp(&catalog[self.dtos[a]].memory)
            });

            let budget = rate * dlo.duration();
            let mut used = 0.0;
            for at in candidates {
                let memory = catalog[self.dtos[at]].memory;
                if used + memory <= budget + EPS {
                    used += memory;
                    evacuated[at] = true;
                    self.downloads[w].push(self.dtos[at]);
                }
            }
            level -= used;
            assert!(
                level >= -EPS,
                "negative onboard memory after downlink window {}",
                dlo.id
            );
        }
    }

    /// Atomically adds a take and schedules its evacuation.
    ///
    /// The take is tentatively inserted; if its AR is served, it overlaps
    /// a neighbor, the projected memory trajectory overflows, or no
    /// window strictly after its stop time has rate headroom left, the
    /// insertion is rolled back in full and `false` is returned. On
    /// success the take is assigned to the earliest such window. No
    /// partial state survives any failure path.
    pub fn add_and_download(&mut self, dto_index: usize) -> bool {
        let instance = Arc::clone(&self.instance);
        let dto = &instance.dtos()[dto_index];
        if self.ars_served[dto.ar_index] || self.overlaps_neighbors(dto) {
            return false;
        }
        let added = self.add_dto(dto_index);
        debug_assert!(added);
        if !self.satisfies(Constraint::Memory) {
            self.remove_dto(dto_index);
            return false;
        }
        let rate = instance.downlink_rate();
        let catalog = instance.dtos();
        for (w, dlo) in instance.dlos().iter().enumerate() {
            if dlo.start_time <= dto.stop_time {
                continue;
            }
            let used: f64 = self.downloads[w].iter().map(|&i| catalog[i].memory).sum();
            if used + dto.memory <= rate * dlo.duration() + EPS {
                self.downloads[w].push(dto_index);
                return true;
            }
        }
        self.remove_dto(dto_index);
        false
    }

    /// Full repair pass: overlap, single satisfaction, duplicates, then
    /// memory. With downlinks the evacuation assignment is recomputed
    /// first (its no-duplicates precondition now holds) and again after
    /// every memory-repair round that removed takes, until stable.
    pub fn repair<R: Rng>(&mut self, rng: &mut R) {
        self.repair_overlap(rng);
        self.repair_satisfaction(rng);
        self.repair_duplicates();
        if self.instance.has_downlinks() {
            self.update_downloads();
            while self.repair_memory(rng) {
                self.update_downloads();
            }
        } else {
            self.repair_memory(rng);
        }
    }

    /// Memory trajectory as `(time, level)` samples: one sample per take
    /// completion and per downlink boundary, in time order.
    pub fn memory_profile(&self) -> Vec<(f64, f64)> {
        let catalog = self.instance.dtos();
        // kind 0 sorts acquisitions before a boundary at the same instant
        let mut events: Vec<(f64, u8, f64)> = self
            .dtos
            .iter()
            .map(|&i| (catalog[i].stop_time, 0, catalog[i].memory))
            .collect();
        for (w, dlo) in self.instance.dlos().iter().enumerate() {
            let drained: f64 = self.downloads[w].iter().map(|&i| catalog[i].memory).sum();
            events.push((dlo.start_time, 1, -drained));
        }
        events.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut level = 0.0;
        events
            .into_iter()
            .map(|(time, _, delta)| {
                level += delta;
                (time, level)
            })
            .collect()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "plan: {} takes {:?}, memory {:.1}/{:.1}, fitness {:.2}",
            self.len(),
            self.dto_ids(),
            self.total_memory,
            self.instance.capacity(),
            self.fitness
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AcquisitionRequest, DownlinkOpportunity, Instance};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dto(id: u64, ar_id: u64, start: f64, stop: f64, memory: f64) -> Dto {
        Dto::new(id, ar_id, start, stop, memory)
    }

    fn ar(id: u64, rank: f64) -> AcquisitionRequest {
        AcquisitionRequest::new(id, rank)
    }

    fn relaxed(dtos: Vec<Dto>, ars: Vec<AcquisitionRequest>, capacity: f64) -> Arc<Instance> {
        Arc::new(Instance::relaxed(dtos, ars, capacity).unwrap())
    }

    fn with_downlinks(
        dtos: Vec<Dto>,
        ars: Vec<AcquisitionRequest>,
        dlos: Vec<DownlinkOpportunity>,
        capacity: f64,
        rate: f64,
    ) -> Arc<Instance> {
        Arc::new(Instance::new(dtos, ars, dlos, vec![], capacity, rate).unwrap())
    }

    /// Three disjoint takes on distinct ARs, ranks 3/5/7.
    fn three_takes() -> Arc<Instance> {
        relaxed(
            vec![
                dto(1, 10, 0.0, 10.0, 5.0),
                dto(2, 11, 20.0, 30.0, 6.0),
                dto(3, 12, 40.0, 50.0, 7.0),
            ],
            vec![ar(10, 3.0), ar(11, 5.0), ar(12, 7.0)],
            100.0,
        )
    }

    fn index_of(instance: &Instance, id: u64) -> usize {
        instance.dtos().iter().position(|d| d.id == id).unwrap()
    }

    #[test]
    fn add_keeps_start_time_order() {
        let instance = three_takes();
        let mut plan = Plan::new(Arc::clone(&instance));
        assert!(plan.add_dto(index_of(&instance, 3)));
        assert!(plan.add_dto(index_of(&instance, 1)));
        assert!(plan.add_dto(index_of(&instance, 2)));
        assert_eq!(plan.dto_ids(), vec![1, 2, 3]);
    }

    #[test]
    fn add_rejects_served_ar() {
        let instance = relaxed(
            vec![dto(1, 10, 0.0, 10.0, 5.0), dto(2, 10, 20.0, 30.0, 5.0)],
            vec![ar(10, 3.0)],
            100.0,
        );
        let mut plan = Plan::new(Arc::clone(&instance));
        assert!(plan.add_dto(0));
        assert!(!plan.add_dto(1));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.fitness(), 3.0);
    }

    #[test]
    fn caches_track_adds_and_removes() {
        let instance = three_takes();
        let mut plan = Plan::new(Arc::clone(&instance));
        plan.add_dto(0);
        plan.add_dto(1);
        plan.add_dto(2);
        assert_eq!(plan.total_memory(), 18.0);
        assert_eq!(plan.fitness(), 15.0);

        assert!(plan.remove_dto(1));
        assert_eq!(plan.total_memory(), 12.0);
        assert_eq!(plan.fitness(), 10.0);
        assert!(!plan.remove_dto(1));
    }

    #[test]
    fn remove_clears_ar_flag() {
        let instance = three_takes();
        let mut plan = Plan::new(Arc::clone(&instance));
        plan.add_dto(0);
        assert!(plan.remove_dto(0));
        assert!(plan.add_dto(0), "AR must be free again after removal");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn remove_out_of_range_panics() {
        let instance = three_takes();
        let mut plan = Plan::new(instance);
        plan.remove_dto_at(0);
    }

    #[test]
    fn keeps_feasibility_checks_ar_memory_overlap() {
        let instance = relaxed(
            vec![
                dto(1, 10, 0.0, 10.0, 60.0),
                dto(2, 11, 5.0, 15.0, 10.0),  // overlaps take 1
                dto(3, 12, 20.0, 30.0, 60.0), // would blow the capacity
                dto(4, 10, 40.0, 50.0, 1.0),  // same AR as take 1
                dto(5, 13, 40.0, 50.0, 10.0), // fine
            ],
            vec![ar(10, 1.0), ar(11, 1.0), ar(12, 1.0), ar(13, 1.0)],
            100.0,
        );
        let mut plan = Plan::new(Arc::clone(&instance));
        plan.add_dto(index_of(&instance, 1));

        assert!(!plan.keeps_feasibility(index_of(&instance, 2)));
        assert!(!plan.keeps_feasibility(index_of(&instance, 3)));
        assert!(!plan.keeps_feasibility(index_of(&instance, 4)));
        assert!(plan.keeps_feasibility(index_of(&instance, 5)));
    }

    #[test]
    fn feasibility_flags_each_violation() {
        let instance = relaxed(
            vec![
                dto(1, 10, 0.0, 10.0, 60.0),
                dto(2, 11, 5.0, 15.0, 60.0),
                dto(3, 10, 20.0, 30.0, 10.0),
            ],
            vec![ar(10, 1.0), ar(11, 2.0)],
            100.0,
        );
        let a = index_of(&instance, 1);
        let b = index_of(&instance, 2);
        let c = index_of(&instance, 3);

        let overlapping = Plan::from_dto_indices(Arc::clone(&instance), vec![a, b]);
        assert!(!overlapping.satisfies(Constraint::Overlap));
        assert!(!overlapping.satisfies(Constraint::Memory)); // 120 > 100
        assert!(overlapping.satisfies(Constraint::Duplicates));
        assert!(overlapping.satisfies(Constraint::SingleSatisfaction));
        assert!(!overlapping.is_feasible());

        let double_served = Plan::from_dto_indices(Arc::clone(&instance), vec![a, c]);
        assert!(!double_served.satisfies(Constraint::SingleSatisfaction));

        let duplicated = Plan::from_dto_indices(Arc::clone(&instance), vec![c, c]);
        assert!(!duplicated.satisfies(Constraint::Duplicates));

        let fine = Plan::from_dto_indices(instance, vec![b, c]);
        assert!(fine.is_feasible());
    }

    #[test]
    fn repair_overlap_reaches_a_fixed_point() {
        let instance = relaxed(
            vec![
                dto(1, 10, 0.0, 10.0, 1.0),
                dto(2, 11, 5.0, 15.0, 1.0),
                dto(3, 12, 10.0, 20.0, 1.0),
                dto(4, 13, 30.0, 40.0, 1.0),
            ],
            vec![ar(10, 1.0), ar(11, 1.0), ar(12, 1.0), ar(13, 1.0)],
            100.0,
        );
        let mut rng = StdRng::seed_from_u64(42);
        let mut plan = Plan::from_dto_indices(Arc::clone(&instance), vec![0, 1, 2, 3]);

        plan.repair_overlap(&mut rng);
        assert!(plan.satisfies(Constraint::Overlap));
        assert!(plan.contains(3), "the disjoint take must survive");

        let before = plan.dto_ids();
        plan.repair_overlap(&mut rng);
        assert_eq!(plan.dto_ids(), before, "repair is a fixed point");
    }

    #[test]
    fn repair_satisfaction_keeps_one_take_per_ar() {
        let instance = relaxed(
            vec![
                dto(1, 10, 0.0, 10.0, 1.0),
                dto(2, 10, 20.0, 30.0, 1.0),
                dto(3, 10, 40.0, 50.0, 1.0),
                dto(4, 11, 60.0, 70.0, 1.0),
            ],
            vec![ar(10, 1.0), ar(11, 1.0)],
            100.0,
        );
        let mut rng = StdRng::seed_from_u64(7);
        let mut plan = Plan::from_dto_indices(Arc::clone(&instance), vec![0, 1, 2, 3]);

        plan.repair_satisfaction(&mut rng);
        assert!(plan.satisfies(Constraint::SingleSatisfaction));
        assert_eq!(plan.len(), 2);
        assert!(plan.contains(3));
    }

    #[test]
    fn repair_duplicates_keeps_first_occurrence() {
        let instance = three_takes();
        let mut plan = Plan::from_dto_indices(Arc::clone(&instance), vec![0, 0, 1, 1, 2]);
        plan.repair_duplicates();
        assert_eq!(plan.dto_ids(), vec![1, 2, 3]);
        assert!(plan.satisfies(Constraint::Duplicates));
    }

    #[test]
    fn repair_memory_relaxed_removes_until_fit() {
        let instance = relaxed(
            vec![
                dto(1, 10, 0.0, 10.0, 60.0),
                dto(2, 11, 20.0, 30.0, 60.0),
                dto(3, 12, 40.0, 50.0, 60.0),
            ],
            vec![ar(10, 1.0), ar(11, 1.0), ar(12, 1.0)],
            100.0,
        );
        let mut rng = StdRng::seed_from_u64(3);
        let mut plan = Plan::from_dto_indices(Arc::clone(&instance), vec![0, 1, 2]);

        let needs_reassignment = plan.repair_memory(&mut rng);
        assert!(!needs_reassignment);
        assert!(plan.total_memory() <= 100.0);
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn download_assignment_is_legal() {
        let instance = with_downlinks(
            vec![
                dto(1, 10, 0.0, 5.0, 40.0),
                dto(2, 11, 6.0, 9.0, 30.0),
                dto(3, 12, 30.0, 35.0, 20.0),
            ],
            vec![ar(10, 1.0), ar(11, 2.0), ar(12, 3.0)],
            vec![
                DownlinkOpportunity::new(1, 10.0, 15.0),
                DownlinkOpportunity::new(2, 40.0, 50.0),
            ],
            100.0,
            10.0,
        );
        let mut plan = Plan::from_dto_indices(Arc::clone(&instance), vec![0, 1, 2]);
        plan.update_downloads();

        let catalog = instance.dtos();
        let rate = instance.downlink_rate();
        let mut evacuated = std::collections::HashSet::new();
        for (w, dlo) in instance.dlos().iter().enumerate() {
            let volume: f64 = plan.downloads()[w].iter().map(|&i| catalog[i].memory).sum();
            assert!(volume <= rate * dlo.duration() + 1e-9);
            for &i in &plan.downloads()[w] {
                assert!(catalog[i].stop_time < dlo.start_time);
                assert!(evacuated.insert(i), "take evacuated twice");
            }
        }
        // window 1 has budget 50: largest-first packs 40, then skips 30
        assert_eq!(plan.downloads()[0], vec![index_of(&instance, 1)]);
        // window 2 has budget 100: the leftover 30 and the new 20 both fit
        assert_eq!(plan.downloads()[1].len(), 2);
        assert!(plan.is_feasible());
    }

    #[test]
    #[should_panic(expected = "duplicate take id")]
    fn download_assignment_rejects_duplicates() {
        let instance = with_downlinks(
            vec![dto(1, 10, 0.0, 5.0, 10.0)],
            vec![ar(10, 1.0)],
            vec![DownlinkOpportunity::new(1, 10.0, 15.0)],
            100.0,
            10.0,
        );
        let mut plan = Plan::from_dto_indices(instance, vec![0, 0]);
        plan.update_downloads();
    }

    #[test]
    fn repair_memory_with_downlinks_requests_reassignment() {
        // both takes finish before the only window; together they
        // overflow the 10-unit capacity, so one must go
        let instance = with_downlinks(
            vec![dto(1, 10, 0.0, 2.0, 6.0), dto(2, 11, 3.0, 5.0, 6.0)],
            vec![ar(10, 1.0), ar(11, 1.0)],
            vec![DownlinkOpportunity::new(1, 10.0, 20.0)],
            10.0,
            100.0,
        );
        let mut rng = StdRng::seed_from_u64(11);
        let mut plan = Plan::from_dto_indices(Arc::clone(&instance), vec![0, 1]);
        plan.update_downloads();

        let needs_reassignment = plan.repair_memory(&mut rng);
        assert!(needs_reassignment);
        assert_eq!(plan.len(), 1);

        plan.update_downloads();
        assert!(plan.is_feasible());
        assert!(!plan.repair_memory(&mut rng), "second pass is stable");
    }

    #[test]
    fn full_repair_handles_offspring_debris() {
        let instance = with_downlinks(
            vec![
                dto(1, 10, 0.0, 5.0, 30.0),
                dto(2, 11, 3.0, 8.0, 30.0),
                dto(3, 10, 20.0, 25.0, 30.0),
            ],
            vec![ar(10, 1.0), ar(11, 2.0)],
            vec![DownlinkOpportunity::new(1, 30.0, 40.0)],
            50.0,
            10.0,
        );
        let mut rng = StdRng::seed_from_u64(5);
        // duplicate ids, an overlap, and a double-served AR all at once
        let mut plan = Plan::from_dto_indices(Arc::clone(&instance), vec![0, 0, 1, 2]);

        plan.repair(&mut rng);
        assert!(plan.is_feasible());
    }

    #[test]
    fn add_and_download_assigns_earliest_window() {
        let instance = with_downlinks(
            vec![dto(1, 10, 0.0, 5.0, 50.0)],
            vec![ar(10, 4.0)],
            vec![
                DownlinkOpportunity::new(1, 10.0, 20.0),
                DownlinkOpportunity::new(2, 30.0, 40.0),
            ],
            50.0,
            10.0,
        );
        let mut plan = Plan::new(Arc::clone(&instance));
        assert!(plan.add_and_download(0));
        assert_eq!(plan.downloads()[0], vec![0]);
        assert!(plan.downloads()[1].is_empty());
        assert!(plan.is_feasible());
    }

    #[test]
    fn add_and_download_rolls_back_when_no_window_fits() {
        let instance = with_downlinks(
            vec![dto(1, 10, 0.0, 5.0, 50.0)],
            vec![ar(10, 4.0)],
            vec![DownlinkOpportunity::new(1, 10.0, 12.0)], // budget 20 < 50
            100.0,
            10.0,
        );
        let mut plan = Plan::new(Arc::clone(&instance));
        assert!(!plan.add_and_download(0));
        assert!(plan.is_empty());
        assert_eq!(plan.fitness(), 0.0);
        assert_eq!(plan.total_memory(), 0.0);
        assert!(plan.downloads().iter().all(|set| set.is_empty()));
        assert!(!plan.ars_served[0], "AR flag must be rolled back");
    }

    #[test]
    fn add_and_download_rolls_back_on_memory_overflow() {
        // the second take would sit onboard next to the first and
        // overflow capacity before the window opens
        let instance = with_downlinks(
            vec![dto(1, 10, 0.0, 2.0, 30.0), dto(2, 11, 3.0, 5.0, 30.0)],
            vec![ar(10, 1.0), ar(11, 1.0)],
            vec![DownlinkOpportunity::new(1, 10.0, 20.0)],
            50.0,
            100.0,
        );
        let mut plan = Plan::new(Arc::clone(&instance));
        assert!(plan.add_and_download(0));
        assert!(!plan.add_and_download(1));
        assert_eq!(plan.dto_ids(), vec![1]);
        assert!(plan.is_feasible());
    }

    #[test]
    fn memory_profile_traces_the_trajectory() {
        let instance = with_downlinks(
            vec![dto(1, 10, 0.0, 5.0, 50.0)],
            vec![ar(10, 4.0)],
            vec![DownlinkOpportunity::new(1, 10.0, 20.0)],
            50.0,
            10.0,
        );
        let mut plan = Plan::new(Arc::clone(&instance));
        assert!(plan.add_and_download(0));

        let profile = plan.memory_profile();
        assert_eq!(profile[0], (5.0, 50.0)); // acquisition
        assert_eq!(profile[1], (10.0, 0.0)); // evacuated at the window
        let (_, trailing) = *profile.last().unwrap();
        assert!(trailing.abs() < 1e-9, "memory must end at zero");
    }

    #[test]
    fn from_dto_indices_sorts_and_derives_caches() {
        let instance = three_takes();
        let plan = Plan::from_dto_indices(Arc::clone(&instance), vec![2, 0, 1]);
        assert_eq!(plan.dto_ids(), vec![1, 2, 3]);
        assert_eq!(plan.total_memory(), 18.0);
        assert_eq!(plan.fitness(), 15.0);
    }

    proptest! {
        /// Spec properties: the schedule stays sorted by start time and
        /// the memory/fitness caches equal the recomputed sums after any
        /// add/remove sequence.
        #[test]
        fn add_remove_preserves_order_and_caches(
            ops in prop::collection::vec((0usize..20, prop::bool::ANY), 1..60),
        ) {
            let dtos: Vec<Dto> = (0..20)
                .map(|i| {
                    let start = ((i * 7) % 13) as f64 * 10.0;
                    dto(i as u64 + 1, i as u64, start, start + 5.0, (i % 5) as f64 + 1.0)
                })
                .collect();
            let ars: Vec<AcquisitionRequest> =
                (0..20).map(|i| ar(i as u64, (i % 3) as f64 + 1.0)).collect();
            let instance = relaxed(dtos, ars, 1e9);

            let mut plan = Plan::new(Arc::clone(&instance));
            for (index, add) in ops {
                if add {
                    plan.add_dto(index);
                } else {
                    plan.remove_dto(index);
                }

                let catalog = instance.dtos();
                let sorted = plan
                    .dto_indices()
                    .windows(2)
                    .all(|w| catalog[w[0]].start_time <= catalog[w[1]].start_time);
                prop_assert!(sorted);

                let memory: f64 = plan.iter().map(|d| d.memory).sum();
                let fitness: f64 = plan.iter().map(|d| d.priority).sum();
                prop_assert!((plan.total_memory() - memory).abs() < 1e-9);
                prop_assert!((plan.fitness() - fitness).abs() < 1e-9);
            }
        }
    }
}
