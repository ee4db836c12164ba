//! Compressor: window bookkeeping, data-quality checks and strategy dispatch.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use contracts::{
    CompressionOutput, CompressionStats, CompressorConfig, ContractError, DataQualityIssue,
    DataQualityKind, Sample, StrategyKind, TrajectoryId,
};
use tracing::{debug, info, instrument, warn};

use crate::dead_reckoning::{DeadReckoner, Reckoning};
use crate::geometry::{self, Geometry};
use crate::reference::ReferenceTrajectories;
use crate::strategy::{EvalContext, PriorityStrategy};
use crate::window::WindowClock;
use crate::windowed::{Admission, WindowedEngine};

/// What happened to a pushed sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Entered the eviction queue
    Queued,
    /// Withheld as its trajectory's newest point
    Held,
    /// Committed directly (dead reckoning)
    Committed,
    /// Discarded by the admission filter
    Rejected,
    /// Unusable timestamp, never seen by a strategy
    Dropped,
}

enum Backend {
    Windowed(WindowedEngine),
    DeadReckoning(DeadReckoner),
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windowed(engine) => f
                .debug_struct("Windowed")
                .field("strategy", &engine.strategy())
                .field("queued", &engine.queue_len())
                .finish(),
            Self::DeadReckoning(reckoner) => f
                .debug_struct("DeadReckoning")
                .field("trigger_m", &reckoner.trigger_m())
                .finish(),
        }
    }
}

/// Bandwidth-constrained trajectory compressor
///
/// Consumes one globally time-ordered sample stream and keeps at most
/// `limit` points in its eviction queue at any time.
#[derive(Debug)]
pub struct Compressor {
    config: CompressorConfig,
    geometry: Box<dyn Geometry>,
    reference: Option<ReferenceTrajectories>,
    backend: Backend,
    clock: WindowClock,
    stats: CompressionStats,
    issues: Vec<DataQualityIssue>,
    /// Latest timestamp per trajectory, for the ordering check
    last_seen: HashMap<TrajectoryId, f64>,
    max_timestamp: Option<f64>,
}

impl Compressor {
    /// Create a compressor for a strategy that needs no ground truth
    pub fn new(config: CompressorConfig) -> Result<Self, ContractError> {
        Self::build(config, None)
    }

    /// Create a compressor with a ground-truth reference
    pub fn with_reference(
        config: CompressorConfig,
        reference: ReferenceTrajectories,
    ) -> Result<Self, ContractError> {
        Self::build(config, Some(reference))
    }

    fn build(
        config: CompressorConfig,
        reference: Option<ReferenceTrajectories>,
    ) -> Result<Self, ContractError> {
        config.check()?;
        if config.requires_reference() && reference.is_none() {
            return Err(ContractError::missing_reference(config.strategy.as_str()));
        }

        let backend = match PriorityStrategy::from_config(&config) {
            Some(strategy) => Backend::Windowed(WindowedEngine::new(
                strategy,
                config.limit,
                config.hold_back_newest,
            )),
            None => Backend::DeadReckoning(DeadReckoner::new(&config.dead_reckoning)),
        };

        info!(
            strategy = config.strategy.as_str(),
            limit = config.limit,
            window_length_s = config.window_length_s,
            hold_back_newest = config.hold_back_newest,
            "compressor created"
        );

        Ok(Self {
            geometry: geometry::for_metric(config.metric),
            clock: WindowClock::new(config.window_length_s),
            config,
            reference,
            backend,
            stats: CompressionStats::default(),
            issues: Vec::new(),
            last_seen: HashMap::new(),
            max_timestamp: None,
        })
    }

    /// Replace the metric-selected geometry
    pub fn with_geometry(mut self, geometry: Box<dyn Geometry>) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn config(&self) -> &CompressorConfig {
        &self.config
    }

    pub fn strategy(&self) -> StrategyKind {
        self.config.strategy
    }

    /// Counters so far
    pub fn stats(&self) -> &CompressionStats {
        &self.stats
    }

    /// Data-quality issues detected so far
    pub fn issues(&self) -> &[DataQualityIssue] {
        &self.issues
    }

    /// Current eviction queue size (always 0 for dead reckoning)
    pub fn queue_len(&self) -> usize {
        match &self.backend {
            Backend::Windowed(engine) => engine.queue_len(),
            Backend::DeadReckoning(_) => 0,
        }
    }

    /// End of the open window
    pub fn window_end(&self) -> Option<f64> {
        self.clock.end()
    }

    /// Committed points of one trajectory
    pub fn committed(&self, id: &str) -> &[Sample] {
        match &self.backend {
            Backend::Windowed(engine) => engine.committed(id),
            Backend::DeadReckoning(reckoner) => reckoner.committed(id),
        }
    }

    /// Held (not yet admitted) point of one trajectory
    pub fn held(&self, id: &str) -> Option<&Sample> {
        match &self.backend {
            Backend::Windowed(engine) => engine.held(id),
            Backend::DeadReckoning(reckoner) => reckoner.held(id),
        }
    }

    /// Open window of one trajectory with priorities
    pub fn window(&self, id: &str) -> Vec<(&Sample, f64)> {
        match &self.backend {
            Backend::Windowed(engine) => engine.window(id),
            Backend::DeadReckoning(_) => Vec::new(),
        }
    }

    /// Process one sample
    #[instrument(
        level = "trace",
        name = "compressor_push",
        skip(self, sample),
        fields(trajectory_id = %sample.trajectory_id, timestamp = sample.timestamp)
    )]
    pub fn push(&mut self, sample: Sample) -> PushOutcome {
        self.stats.samples_in += 1;
        metrics::counter!("bwc_samples_received_total").increment(1);

        let timestamp = sample.timestamp;
        if !timestamp.is_finite() {
            self.report(
                sample.trajectory_id.clone(),
                DataQualityKind::NonFiniteTimestamp,
                None,
            );
            return PushOutcome::Dropped;
        }

        self.check_order(&sample);
        self.max_timestamp = Some(self.max_timestamp.map_or(timestamp, |m| m.max(timestamp)));

        let outcome = match &mut self.backend {
            Backend::Windowed(engine) => {
                if self.clock.advance(timestamp) {
                    engine.close(timestamp, &mut self.stats);
                }
                let ctx = EvalContext {
                    geometry: self.geometry.as_ref(),
                    reference: self.reference.as_ref(),
                };
                match engine.add(&ctx, sample, &mut self.stats) {
                    Admission::Queued => PushOutcome::Queued,
                    Admission::Held => PushOutcome::Held,
                    Admission::Rejected => PushOutcome::Rejected,
                }
            }
            Backend::DeadReckoning(reckoner) => {
                match reckoner.push(self.geometry.as_ref(), sample, &mut self.stats) {
                    Reckoning::Anchored | Reckoning::Committed => PushOutcome::Committed,
                    Reckoning::Held => PushOutcome::Held,
                }
            }
        };

        self.stats.max_queue_depth = self.stats.max_queue_depth.max(self.queue_len());
        outcome
    }

    /// Push every sample of an iterator
    pub fn extend<I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = Sample>,
    {
        for sample in samples {
            self.push(sample);
        }
    }

    /// Final close at the latest timestamp seen, then assemble the output
    #[instrument(level = "debug", name = "compressor_finish", skip(self))]
    pub fn finish(mut self) -> CompressionOutput {
        let time = self.max_timestamp.unwrap_or(0.0);

        let mut trajectories = match self.backend {
            Backend::Windowed(engine) => {
                let missing: Vec<TrajectoryId> =
                    engine.missing_reference().iter().cloned().collect();
                let trajectories = engine.finish(time, &mut self.stats);
                for id in missing {
                    self.issues.push(DataQualityIssue {
                        trajectory_id: id,
                        kind: DataQualityKind::MissingReference,
                        timestamp: None,
                    });
                }
                trajectories
            }
            Backend::DeadReckoning(reckoner) => reckoner.finish(time, &mut self.stats),
        };

        // every id that ever pushed a valid sample gets an entry
        for id in self.last_seen.keys() {
            trajectories.entry(id.clone()).or_default();
        }
        let empty: Vec<TrajectoryId> = trajectories
            .iter()
            .filter(|(_, samples)| samples.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        for id in empty {
            trajectories.remove(&id);
            warn!(trajectory_id = %id, "trajectory has no retained point");
            metrics::counter!("bwc_data_quality_issues_total", "kind" => DataQualityKind::EmptyTrajectory.as_str())
                .increment(1);
            self.issues.push(DataQualityIssue {
                trajectory_id: id,
                kind: DataQualityKind::EmptyTrajectory,
                timestamp: None,
            });
        }

        self.stats.retained_per_trajectory = trajectories
            .iter()
            .map(|(id, samples)| (id.clone(), samples.len()))
            .collect::<BTreeMap<_, _>>();

        if !self.issues.is_empty() {
            warn!(issues = self.issues.len(), "data-quality issues detected");
        }
        info!(
            samples_in = self.stats.samples_in,
            retained = self.stats.retained_total(),
            evictions = self.stats.evictions,
            rejected = self.stats.samples_rejected,
            windows = self.stats.windows_closed,
            "compression finished"
        );

        CompressionOutput {
            trajectories,
            issues: self.issues,
            stats: self.stats,
        }
    }

    fn check_order(&mut self, sample: &Sample) {
        let previous = self
            .last_seen
            .insert(sample.trajectory_id.clone(), sample.timestamp);
        if let Some(previous) = previous {
            if sample.timestamp <= previous {
                debug!(previous, "non-increasing timestamp");
                self.report(
                    sample.trajectory_id.clone(),
                    DataQualityKind::NonIncreasingTimestamp,
                    Some(sample.timestamp),
                );
            }
        }
    }

    fn report(&mut self, trajectory_id: TrajectoryId, kind: DataQualityKind, timestamp: Option<f64>) {
        warn!(
            trajectory_id = %trajectory_id,
            kind = kind.as_str(),
            timestamp = ?timestamp,
            "data-quality issue"
        );
        metrics::counter!("bwc_data_quality_issues_total", "kind" => kind.as_str()).increment(1);
        self.issues.push(DataQualityIssue {
            trajectory_id,
            kind,
            timestamp,
        });
    }
}

/// Compress a whole sample stream in one call
pub fn compress<I>(
    config: CompressorConfig,
    reference: Option<ReferenceTrajectories>,
    samples: I,
) -> Result<CompressionOutput, ContractError>
where
    I: IntoIterator<Item = Sample>,
{
    let mut compressor = match reference {
        Some(reference) => Compressor::with_reference(config, reference)?,
        None => Compressor::new(config)?,
    };
    compressor.extend(samples);
    Ok(compressor.finish())
}
