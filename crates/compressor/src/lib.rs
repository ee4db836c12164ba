//! # Compressor
//!
//! Bandwidth-constrained, windowed trajectory simplification.
//!
//! Responsibilities:
//! - fixed-length windows over one globally time-ordered sample stream
//! - a shared eviction queue capped at `limit` points across all trajectories
//! - Squish / STTrace / STTrace-Optimal priorities, plus dead reckoning
//! - hold-back (delay-instrumented) mode and commit delay measurement
//! - finalized per-trajectory output with data-quality diagnostics
//!
//! ## Usage
//!
//! ```ignore
//! use compressor::{Compressor, CompressorConfig, StrategyKind};
//!
//! let config = CompressorConfig {
//!     strategy: StrategyKind::StTrace,
//!     limit: 50,
//!     window_length_s: 900.0,
//!     ..Default::default()
//! };
//!
//! let mut compressor = Compressor::new(config)?;
//! for sample in stream {
//!     compressor.push(sample);
//! }
//! let output = compressor.finish();
//! ```

mod dead_reckoning;
mod engine;
pub mod evaluate;
pub mod geometry;
mod queue;
mod reference;
mod strategy;
mod window;
mod windowed;

pub use dead_reckoning::{DeadReckoner, Reckoning};
pub use engine::{compress, Compressor, PushOutcome};
pub use geometry::{Geometry, HaversineGeometry, PlanarGeometry};
pub use queue::{EntryKey, EvictionQueue};
pub use reference::ReferenceTrajectories;
pub use strategy::{EvalContext, NeighborUpdate, PriorityStrategy, ReplaySampling, NEWEST_PRIORITY};
pub use window::WindowClock;
pub use windowed::{Admission, Candidate, WindowedEngine};

// Re-export contracts types
pub use contracts::{
    CompressionOutput, CompressionStats, CompressorConfig, DataQualityIssue, DataQualityKind,
    DeadReckoningConfig, DistanceMetric, Sample, StrategyKind, TrajectoryId,
};
