//! Instant stream: global time-order merge of per-trajectory sequences

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};
use std::vec::IntoIter;

use contracts::{Sample, TrajectoryId};
use tracing::debug;

/// Head of one source in the merge heap
#[derive(Debug)]
struct Head {
    timestamp: f64,
    source: usize,
    position: usize,
    sample: Sample,
}

impl PartialEq for Head {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Head {}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Head {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .total_cmp(&other.timestamp)
            .then(self.source.cmp(&other.source))
            .then(self.position.cmp(&other.position))
    }
}

/// Globally time-ordered iterator over several sample sequences
///
/// Each source is consumed in its own order; the merge picks the smallest
/// head by `(timestamp, source index, position)`, so equal timestamps keep
/// source order. Sources are expected to be time ordered already; an
/// out-of-order source is passed through as is and left for the engine to
/// flag.
#[derive(Debug)]
pub struct InstantStream {
    sources: Vec<IntoIter<Sample>>,
    positions: Vec<usize>,
    heap: BinaryHeap<Reverse<Head>>,
    remaining: usize,
}

impl InstantStream {
    /// Merge the given sources
    pub fn new(sources: Vec<Vec<Sample>>) -> Self {
        let remaining = sources.iter().map(Vec::len).sum();
        let mut sources: Vec<_> = sources.into_iter().map(Vec::into_iter).collect();
        let mut positions = vec![0; sources.len()];
        let mut heap = BinaryHeap::with_capacity(sources.len());

        for (source, iter) in sources.iter_mut().enumerate() {
            if let Some(sample) = iter.next() {
                heap.push(Reverse(Head {
                    timestamp: sample.timestamp,
                    source,
                    position: 0,
                    sample,
                }));
                positions[source] = 1;
            }
        }

        debug!(sources = sources.len(), samples = remaining, "instant stream built");

        Self {
            sources,
            positions,
            heap,
            remaining,
        }
    }

    /// One source per trajectory, in id order
    pub fn from_trajectories(trajectories: BTreeMap<TrajectoryId, Vec<Sample>>) -> Self {
        Self::new(trajectories.into_values().collect())
    }

    /// Group a mixed sample list by trajectory (keeping each trajectory's
    /// relative order) and merge the groups
    pub fn from_grouped(samples: Vec<Sample>) -> Self {
        let mut trajectories: BTreeMap<TrajectoryId, Vec<Sample>> = BTreeMap::new();
        for sample in samples {
            trajectories
                .entry(sample.trajectory_id.clone())
                .or_default()
                .push(sample);
        }
        Self::from_trajectories(trajectories)
    }

    /// Stable sort of an arbitrary sample list by timestamp
    pub fn from_unsorted(mut samples: Vec<Sample>) -> Self {
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self::new(vec![samples])
    }

    /// Samples not yet yielded
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Iterator for InstantStream {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let Reverse(head) = self.heap.pop()?;
        self.remaining -= 1;

        let source = head.source;
        if let Some(sample) = self.sources[source].next() {
            let position = self.positions[source];
            self.positions[source] += 1;
            self.heap.push(Reverse(Head {
                timestamp: sample.timestamp,
                source,
                position,
                sample,
            }));
        }

        Some(head.sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for InstantStream {}
