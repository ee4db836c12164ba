//! Windowed priority-eviction engine shared by the queue-based strategies.
//!
//! Per trajectory the engine keeps:
//! - `committed`: points finalized by closed windows, append-only
//! - a window list: queued candidates linked by handle, in time order
//! - `held`: the newest sample, withheld from the queue in hold-back mode
//! - `buffered_priority`: evicted priority with no right neighbour yet
//!
//! The queue is shared by every trajectory and never exceeds `limit` once
//! [`WindowedEngine::add`] returns.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use contracts::{CompressionStats, Sample, TrajectoryId};
use tracing::{debug, instrument, trace, warn};

use crate::geometry::sed;
use crate::queue::{EntryKey, EvictionQueue};
use crate::strategy::{EvalContext, NeighborUpdate, PriorityStrategy, NEWEST_PRIORITY};

/// Queued window point
#[derive(Debug, Clone)]
pub struct Candidate {
    pub sample: Sample,
    prev: Option<EntryKey>,
    next: Option<EntryKey>,
}

#[derive(Debug, Default)]
struct TrajectoryState {
    committed: Vec<Sample>,
    head: Option<EntryKey>,
    tail: Option<EntryKey>,
    window_len: usize,
    buffered_priority: Option<f64>,
    held: Option<Sample>,
}

impl TrajectoryState {
    /// Nothing committed and nothing in the open window
    #[inline]
    fn is_bare(&self) -> bool {
        self.committed.is_empty() && self.window_len == 0
    }
}

/// Outcome of offering a sample to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Entered the eviction queue
    Queued,
    /// Withheld as the trajectory's newest point
    Held,
    /// Discarded by the admission filter
    Rejected,
}

/// Windowed engine for Squish / STTrace / STTrace-Optimal
#[derive(Debug)]
pub struct WindowedEngine {
    strategy: PriorityStrategy,
    limit: usize,
    hold_back_newest: bool,
    queue: EvictionQueue<Candidate>,
    trajectories: HashMap<TrajectoryId, TrajectoryState>,
    missing_reference: BTreeSet<TrajectoryId>,
}

impl WindowedEngine {
    pub fn new(strategy: PriorityStrategy, limit: usize, hold_back_newest: bool) -> Self {
        Self {
            strategy,
            limit,
            hold_back_newest,
            queue: EvictionQueue::with_capacity(limit + 1),
            trajectories: HashMap::new(),
            missing_reference: BTreeSet::new(),
        }
    }

    #[inline]
    pub fn strategy(&self) -> PriorityStrategy {
        self.strategy
    }

    #[inline]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Trajectories for which a replay evaluation found no ground truth
    pub fn missing_reference(&self) -> &BTreeSet<TrajectoryId> {
        &self.missing_reference
    }

    /// Points committed by closed windows
    pub fn committed(&self, id: &str) -> &[Sample] {
        self.trajectories
            .get(id)
            .map(|state| state.committed.as_slice())
            .unwrap_or_default()
    }

    /// Point withheld in hold-back mode
    pub fn held(&self, id: &str) -> Option<&Sample> {
        self.trajectories.get(id).and_then(|state| state.held.as_ref())
    }

    /// Open window of one trajectory in time order, with priorities
    pub fn window(&self, id: &str) -> Vec<(&Sample, f64)> {
        let Some(state) = self.trajectories.get(id) else {
            return Vec::new();
        };
        let mut points = Vec::with_capacity(state.window_len);
        let mut cursor = state.head;
        while let Some(key) = cursor {
            let (Some(candidate), Some(priority)) = (self.queue.get(key), self.queue.priority(key))
            else {
                break;
            };
            points.push((&candidate.sample, priority));
            cursor = candidate.next;
        }
        points
    }

    /// Offer a sample, then evict until the queue is back within budget
    #[instrument(
        level = "trace",
        name = "windowed_add",
        skip(self, ctx, sample, stats),
        fields(trajectory_id = %sample.trajectory_id, timestamp = sample.timestamp)
    )]
    pub fn add(
        &mut self,
        ctx: &EvalContext<'_>,
        sample: Sample,
        stats: &mut CompressionStats,
    ) -> Admission {
        let admission = if self.hold_back_newest {
            self.add_holding(ctx, sample)
        } else {
            self.add_direct(ctx, sample)
        };

        if admission == Admission::Rejected {
            stats.samples_rejected += 1;
            metrics::counter!("bwc_samples_rejected_total").increment(1);
            return admission;
        }

        while self.queue.len() > self.limit {
            if !self.remove_min(ctx, stats) {
                break;
            }
        }
        metrics::gauge!("bwc_queue_depth").set(self.queue.len() as f64);
        admission
    }

    fn add_direct(&mut self, ctx: &EvalContext<'_>, sample: Sample) -> Admission {
        if self.strategy.admission_filter()
            && self.queue.len() >= self.limit
            && !self.interesting(ctx, &sample)
        {
            trace!(trajectory_id = %sample.trajectory_id, "sample rejected by admission filter");
            return Admission::Rejected;
        }

        let id = sample.trajectory_id.clone();
        let first = self.trajectories.get(&id).is_none_or(TrajectoryState::is_bare);
        let priority = if first { f64::INFINITY } else { NEWEST_PRIORITY };
        self.append(sample, priority);
        self.refresh_antelast(ctx, &id);
        Admission::Queued
    }

    fn add_holding(&mut self, ctx: &EvalContext<'_>, sample: Sample) -> Admission {
        let id = sample.trajectory_id.clone();
        let state = self.trajectories.entry(id.clone()).or_default();

        if state.is_bare() {
            match state.held.take() {
                // emptied by evictions: the held point becomes the new start
                Some(held) => {
                    state.held = Some(sample);
                    self.append(held, f64::INFINITY);
                    return Admission::Held;
                }
                None => {
                    self.append(sample, f64::INFINITY);
                    return Admission::Queued;
                }
            }
        }

        let Some(released) = state.held.replace(sample) else {
            return Admission::Held;
        };

        // the new sample is the released point's right neighbour
        let mut priority = {
            let Self {
                strategy,
                queue,
                trajectories,
                missing_reference,
                ..
            } = self;
            let Some(state) = trajectories.get(&id) else {
                return Admission::Held;
            };
            let left = tail_sample(queue, state);
            score(
                strategy,
                ctx,
                left,
                &released,
                state.held.as_ref(),
                missing_reference,
            )
        };
        if self.strategy.accumulates() {
            if let Some(buffered) = self
                .trajectories
                .get_mut(&id)
                .and_then(|state| state.buffered_priority.take())
            {
                priority += buffered;
            }
        }
        self.append(released, priority);
        Admission::Held
    }

    /// Link a sample at the end of its trajectory's window list
    fn append(&mut self, sample: Sample, priority: f64) -> EntryKey {
        let state = self
            .trajectories
            .entry(sample.trajectory_id.clone())
            .or_default();
        let prev = state.tail;
        let key = self.queue.insert(
            Candidate {
                sample,
                prev,
                next: None,
            },
            priority,
        );
        match prev.and_then(|prev| self.queue.get_mut(prev)) {
            Some(candidate) => candidate.next = Some(key),
            None => state.head = Some(key),
        }
        state.tail = Some(key);
        state.window_len += 1;
        key
    }

    /// Re-evaluate the point that just stopped being the newest one
    fn refresh_antelast(&mut self, ctx: &EvalContext<'_>, id: &TrajectoryId) {
        let Some(state) = self.trajectories.get(id) else {
            return;
        };
        if state.window_len < 2 || (state.committed.is_empty() && state.window_len == 2) {
            // the antelast is the trajectory start and keeps its infinite priority
            return;
        }
        let Some(antelast) = state
            .tail
            .and_then(|tail| self.queue.get(tail))
            .and_then(|candidate| candidate.prev)
        else {
            return;
        };

        let mut priority = self.evaluate(ctx, antelast);
        if self.strategy.accumulates() {
            if let Some(buffered) = self
                .trajectories
                .get_mut(id)
                .and_then(|state| state.buffered_priority.take())
            {
                priority += buffered;
            }
        }
        self.queue.set_priority(antelast, priority);
    }

    /// Admission test: keep the sample only if the trajectory's current
    /// newest point would be worth more than the cheapest queued point.
    fn interesting(&self, ctx: &EvalContext<'_>, sample: &Sample) -> bool {
        let Some(state) = self.trajectories.get(&sample.trajectory_id) else {
            return true;
        };
        let Some((before, last)) = last_two(&self.queue, state) else {
            return true;
        };
        let Some(min) = self.queue.min_priority() else {
            return true;
        };
        sed(ctx.geometry, before, last, sample) > min
    }

    /// Priority of a queued point from its current neighbours
    fn evaluate(&mut self, ctx: &EvalContext<'_>, key: EntryKey) -> f64 {
        let Self {
            strategy,
            queue,
            trajectories,
            missing_reference,
            hold_back_newest,
            ..
        } = self;
        let Some(candidate) = queue.get(key) else {
            return f64::INFINITY;
        };
        let Some(state) = trajectories.get(&candidate.sample.trajectory_id) else {
            return f64::INFINITY;
        };

        let left = match candidate.prev {
            Some(prev) => queue.get(prev).map(|c| &c.sample),
            None => state.committed.last(),
        };
        let right = match candidate.next {
            Some(next) => queue.get(next).map(|c| &c.sample),
            None if *hold_back_newest => state.held.as_ref(),
            None => None,
        };
        score(strategy, ctx, left, &candidate.sample, right, missing_reference)
    }

    /// Evict the cheapest point and update its neighbours
    fn remove_min(&mut self, ctx: &EvalContext<'_>, stats: &mut CompressionStats) -> bool {
        let Some((key, removed, priority)) = self.queue.pop_min() else {
            return false;
        };
        stats.evictions += 1;
        metrics::counter!("bwc_evictions_total", "strategy" => self.strategy.kind().as_str())
            .increment(1);

        let Candidate { sample, prev, next } = removed;
        trace!(
            trajectory_id = %sample.trajectory_id,
            timestamp = sample.timestamp,
            priority,
            "evicted"
        );

        if let Some(candidate) = prev.and_then(|prev| self.queue.get_mut(prev)) {
            candidate.next = next;
        }
        if let Some(candidate) = next.and_then(|next| self.queue.get_mut(next)) {
            candidate.prev = prev;
        }
        let id = sample.trajectory_id;
        let Some(state) = self.trajectories.get_mut(&id) else {
            return true;
        };
        if state.head == Some(key) {
            state.head = next;
        }
        if state.tail == Some(key) {
            state.tail = prev;
        }
        state.window_len -= 1;

        match self.strategy.on_remove(priority) {
            NeighborUpdate::Add(amount) => {
                if next.is_none() && amount.is_finite() {
                    *state.buffered_priority.get_or_insert(0.0) += amount;
                }
                for neighbour in [prev, next].into_iter().flatten() {
                    if let Some(current) = self.queue.priority(neighbour) {
                        self.queue.set_priority(neighbour, current + amount);
                    }
                }
            }
            NeighborUpdate::Recompute => {
                for neighbour in [prev, next].into_iter().flatten() {
                    let priority = self.evaluate(ctx, neighbour);
                    self.queue.set_priority(neighbour, priority);
                }
            }
        }

        // the trajectory's only point is gone: its held point becomes the start
        if let Some(state) = self.trajectories.get_mut(&id) {
            if state.is_bare() {
                if let Some(held) = state.held.take() {
                    debug!(trajectory_id = %id, "held point promoted to trajectory start");
                    self.append(held, f64::INFINITY);
                }
            }
        }
        true
    }

    /// Commit every window list and empty the queue.
    ///
    /// Records `time - t` as commit delay for every queued point.
    #[instrument(level = "debug", name = "window_close", skip(self, stats), fields(queued = self.queue.len()))]
    pub fn close(&mut self, time: f64, stats: &mut CompressionStats) {
        for (_, candidate, _) in self.queue.iter() {
            let delay = time - candidate.sample.timestamp;
            stats.delays_s.push(delay);
            metrics::histogram!("bwc_commit_delay_seconds").record(delay);
        }

        let mut committed = 0u64;
        for state in self.trajectories.values_mut() {
            let mut cursor = state.head.take();
            while let Some(key) = cursor {
                let Some((candidate, _)) = self.queue.remove(key) else {
                    break;
                };
                cursor = candidate.next;
                state.committed.push(candidate.sample);
                committed += 1;
            }
            state.tail = None;
            state.window_len = 0;
        }
        if !self.queue.is_empty() {
            warn!(orphans = self.queue.len(), "queued points not linked to any window list");
            self.queue.clear();
        }

        stats.windows_closed += 1;
        metrics::counter!("bwc_window_flushes_total").increment(1);
        metrics::counter!("bwc_points_committed_total").increment(committed);
        metrics::gauge!("bwc_queue_depth").set(0.0);
        debug!(time, committed, "window closed");
    }

    /// Final close at `time`, then assemble every trajectory.
    ///
    /// Held points are appended last and their delay is measured to `time`.
    pub fn finish(
        mut self,
        time: f64,
        stats: &mut CompressionStats,
    ) -> BTreeMap<TrajectoryId, Vec<Sample>> {
        self.close(time, stats);

        self.trajectories
            .into_iter()
            .map(|(id, mut state)| {
                if let Some(held) = state.held.take() {
                    let delay = time - held.timestamp;
                    stats.delays_s.push(delay);
                    metrics::histogram!("bwc_commit_delay_seconds").record(delay);
                    metrics::counter!("bwc_points_committed_total").increment(1);
                    state.committed.push(held);
                }
                (id, state.committed)
            })
            .collect()
    }
}

/// Strategy evaluation, with missing ground truth scored as zero
fn score(
    strategy: &PriorityStrategy,
    ctx: &EvalContext<'_>,
    left: Option<&Sample>,
    point: &Sample,
    right: Option<&Sample>,
    missing_reference: &mut BTreeSet<TrajectoryId>,
) -> f64 {
    match strategy.evaluate(ctx, left, point, right) {
        Some(priority) => priority,
        None => {
            if missing_reference.insert(point.trajectory_id.clone()) {
                warn!(
                    trajectory_id = %point.trajectory_id,
                    "no ground-truth reference for trajectory, replay priorities default to 0"
                );
                metrics::counter!("bwc_data_quality_issues_total", "kind" => "missing_reference")
                    .increment(1);
            }
            0.0
        }
    }
}

/// Newest point of the extended trajectory (window tail, else last committed)
fn tail_sample<'a>(
    queue: &'a EvictionQueue<Candidate>,
    state: &'a TrajectoryState,
) -> Option<&'a Sample> {
    match state.tail {
        Some(tail) => queue.get(tail).map(|c| &c.sample),
        None => state.committed.last(),
    }
}

/// Two newest points of the extended trajectory, oldest first
fn last_two<'a>(
    queue: &'a EvictionQueue<Candidate>,
    state: &'a TrajectoryState,
) -> Option<(&'a Sample, &'a Sample)> {
    match state.tail.and_then(|tail| queue.get(tail)) {
        Some(last) => {
            let before = match last.prev {
                Some(prev) => queue.get(prev).map(|c| &c.sample),
                None => state.committed.last(),
            }?;
            Some((before, &last.sample))
        }
        None => match state.committed.as_slice() {
            [.., before, last] => Some((before, last)),
            _ => None,
        },
    }
}
