//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the bandwidth-constrained
//! trajectory compressor. Business crates depend on this crate only; reverse
//! dependencies are prohibited.
//!
//! ## Time Model
//! - Timestamps are seconds (f64) on a single clock shared by all trajectories
//! - Within one trajectory, timestamps are expected to be strictly increasing

mod compressor_config;
mod error;
mod output;
mod sample;
mod trajectory_id;

pub use compressor_config::*;
pub use error::*;
pub use output::*;
pub use sample::*;
pub use trajectory_id::TrajectoryId;
