//! Crossover strategies.
//!
//! A crossover combines two parent plans into one raw offspring take
//! sequence. The offspring is *not* a valid plan yet: it can contain
//! duplicate takes, several takes of one AR, and overlaps. The driver
//! wraps it with [`Plan::from_dto_indices`] and repair is mandatory
//! before the next fitness read.
//!
//! Strategies are a closed tagged variant rather than trait objects, so
//! the hot generational loop dispatches without indirection.

use std::str::FromStr;
use std::sync::Arc;

use rand::Rng;

use super::plan::Plan;

/// Offspring recombination strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    /// One random cut index into parent1; prefix from parent1, suffix
    /// from parent2.
    SinglePoint,
    /// Two distinct random cut indices into parent1; the middle segment
    /// comes from parent2.
    TwoPoint,
    /// Cuts on the time axis instead of the raw index: a random take of
    /// parent1 is picked, kept inclusive, and parent2 contributes every
    /// take starting strictly after the pick's stop time. Reduces
    /// overlaps induced at the splice boundary, at the cost of a search
    /// over parent2.
    TimeOrdered,
}

impl Default for Crossover {
    fn default() -> Self {
        Crossover::SinglePoint
    }
}

impl Crossover {
    /// Produces the raw offspring take sequence.
    ///
    /// Parents of fewer than two takes degenerate to a copy of parent1's
    /// sequence. Both parents must share one catalog.
    pub fn combine<R: Rng>(&self, parent1: &Plan, parent2: &Plan, rng: &mut R) -> Vec<usize> {
        debug_assert!(
            Arc::ptr_eq(parent1.instance(), parent2.instance()),
            "parents must share one catalog"
        );
        let p1 = parent1.dto_indices();
        let p2 = parent2.dto_indices();

        match self {
            Crossover::SinglePoint => {
                if p1.len() < 2 {
                    return p1.to_vec();
                }
                let cut = rng.random_range(0..p1.len());
                let mut child = p1[..cut].to_vec();
                child.extend_from_slice(&p2[cut.min(p2.len())..]);
                child
            }
            Crossover::TwoPoint => {
                if p1.len() < 2 {
                    return p1.to_vec();
                }
                let first = rng.random_range(0..p1.len());
                let mut second = rng.random_range(0..p1.len());
                while second == first {
                    second = rng.random_range(0..p1.len());
                }
                let (i1, i2) = if first <= second {
                    (first, second)
                } else {
                    (second, first)
                };
                let mut child = p1[..i1].to_vec();
                child.extend_from_slice(&p2[i1.min(p2.len())..i2.min(p2.len())]);
                child.extend_from_slice(&p1[i2..]);
                child
            }
            Crossover::TimeOrdered => {
                if p1.len() < 2 {
                    return p1.to_vec();
                }
                let pick = rng.random_range(0..p1.len());
                let catalog = parent1.instance().dtos();
                let cut_time = catalog[p1[pick]].stop_time;
                let splice = p2.partition_point(|&i| catalog[i].start_time <= cut_time);
                let mut child = p1[..=pick].to_vec();
                child.extend_from_slice(&p2[splice..]);
                child
            }
        }
    }
}

impl FromStr for Crossover {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "single-point" => Ok(Crossover::SinglePoint),
            "two-point" => Ok(Crossover::TwoPoint),
            "time-ordered" => Ok(Crossover::TimeOrdered),
            _ => Err(format!(
                "unknown crossover strategy '{name}', expected one of: \
                 single-point, two-point, time-ordered"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AcquisitionRequest, Dto, Instance};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Eight disjoint takes on distinct ARs.
    fn catalog() -> Arc<Instance> {
        let dtos = (0..8)
            .map(|i| {
                let start = i as f64 * 20.0;
                Dto::new(i + 1, i, start, start + 5.0, 1.0)
            })
            .collect();
        let ars = (0..8).map(|i| AcquisitionRequest::new(i, 1.0)).collect();
        Arc::new(Instance::relaxed(dtos, ars, 1e6).unwrap())
    }

    fn plan_of(instance: &Arc<Instance>, indices: &[usize]) -> Plan {
        Plan::from_dto_indices(Arc::clone(instance), indices.to_vec())
    }

    #[test]
    fn single_point_splices_prefix_and_suffix() {
        let instance = catalog();
        let p1 = plan_of(&instance, &[0, 1, 2, 3]);
        let p2 = plan_of(&instance, &[4, 5, 6, 7]);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let child = Crossover::SinglePoint.combine(&p1, &p2, &mut rng);
            let valid = (0..=p1.len()).any(|cut| {
                let mut expected = p1.dto_indices()[..cut].to_vec();
                expected.extend_from_slice(&p2.dto_indices()[cut.min(p2.len())..]);
                expected == child
            });
            assert!(valid, "child {child:?} is not a single-point splice");
        }
    }

    #[test]
    fn two_point_takes_middle_from_parent2() {
        let instance = catalog();
        let p1 = plan_of(&instance, &[0, 1, 2, 3]);
        let p2 = plan_of(&instance, &[4, 5, 6, 7]);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let child = Crossover::TwoPoint.combine(&p1, &p2, &mut rng);
            let mut valid = false;
            for i1 in 0..p1.len() {
                for i2 in i1 + 1..p1.len() {
                    let mut expected = p1.dto_indices()[..i1].to_vec();
                    expected.extend_from_slice(&p2.dto_indices()[i1..i2]);
                    expected.extend_from_slice(&p1.dto_indices()[i2..]);
                    if expected == child {
                        valid = true;
                    }
                }
            }
            assert!(valid, "child {child:?} is not a two-point splice");
        }
    }

    #[test]
    fn two_point_clamps_to_a_shorter_parent2() {
        let instance = catalog();
        let p1 = plan_of(&instance, &[0, 1, 2, 3, 4, 5]);
        let p2 = plan_of(&instance, &[6, 7]);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let child = Crossover::TwoPoint.combine(&p1, &p2, &mut rng);
            assert!(child.len() <= p1.len() + p2.len());
        }
    }

    #[test]
    fn time_ordered_suffix_starts_after_the_cut() {
        let instance = catalog();
        // interleaved selections from the same timeline
        let p1 = plan_of(&instance, &[0, 2, 4, 6]);
        let p2 = plan_of(&instance, &[1, 3, 5, 7]);
        let mut rng = StdRng::seed_from_u64(42);
        let catalog = instance.dtos();

        for _ in 0..50 {
            let child = Crossover::TimeOrdered.combine(&p1, &p2, &mut rng);
            assert!(!child.is_empty());

            // the child opens with an inclusive prefix of parent1
            let prefix_len = child
                .iter()
                .zip(p1.dto_indices())
                .take_while(|(c, p)| c == p)
                .count();
            assert!(prefix_len >= 1);
            let cut_time = catalog[child[prefix_len - 1]].stop_time;

            // everything after the cut comes from parent2, strictly later
            for &i in &child[prefix_len..] {
                assert!(catalog[i].start_time > cut_time);
                assert!(p2.dto_indices().contains(&i));
            }
        }
    }

    #[test]
    fn degenerate_parents_copy_parent1() {
        let instance = catalog();
        let single = plan_of(&instance, &[3]);
        let empty = plan_of(&instance, &[]);
        let other = plan_of(&instance, &[4, 5, 6]);
        let mut rng = StdRng::seed_from_u64(42);

        for strategy in [
            Crossover::SinglePoint,
            Crossover::TwoPoint,
            Crossover::TimeOrdered,
        ] {
            assert_eq!(strategy.combine(&single, &other, &mut rng), vec![3]);
            assert!(strategy.combine(&empty, &other, &mut rng).is_empty());
        }
    }

    #[test]
    fn parses_strategy_names() {
        assert_eq!(
            "single-point".parse::<Crossover>().unwrap(),
            Crossover::SinglePoint
        );
        assert_eq!("two-point".parse::<Crossover>().unwrap(), Crossover::TwoPoint);
        assert_eq!(
            "time-ordered".parse::<Crossover>().unwrap(),
            Crossover::TimeOrdered
        );

        let err = "tournament".parse::<Crossover>().unwrap_err();
        assert!(err.contains("unknown crossover strategy 'tournament'"));
    }
}
