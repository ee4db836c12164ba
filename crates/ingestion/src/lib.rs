//! # Ingestion
//!
//! Sample ingestion module.
//!
//! Responsibilities:
//! - Merge per-trajectory sample sequences into one globally time-ordered stream
//! - Read samples from JSON-lines input
//! - Generate mock trajectories for tests and demos
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{read_json_lines, InstantStream};
//!
//! let samples = read_json_lines(std::io::BufReader::new(file))?;
//! for sample in InstantStream::from_unsorted(samples) {
//!     compressor.push(sample);
//! }
//! ```
//!
//! ## Mock Trajectories
//!
//! ```ignore
//! use ingestion::MockTrajectory;
//!
//! let samples = MockTrajectory::straight("vessel_1", 100).interval_s(10.0).generate();
//! ```

mod error;
mod mock;
mod reader;
mod stream;

// Re-exports
pub use contracts::Sample;
pub use error::{IngestionError, Result};
pub use mock::MockTrajectory;
pub use reader::{read_json_lines, JsonLinesReader, ReadStats};
pub use stream::InstantStream;
