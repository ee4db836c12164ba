//! JSON-lines sample reader
//!
//! One `Sample` object per line; blank lines and `#` comments are skipped.

use std::io::BufRead;

use contracts::Sample;
use tracing::{debug, warn};

use crate::error::{IngestionError, Result};

/// Reader counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Lines consumed, including skipped ones
    pub lines: usize,

    /// Samples produced
    pub samples: usize,

    /// Blank or comment lines
    pub skipped: usize,
}

/// Streaming JSON-lines reader
///
/// Yields `Err` for the first malformed line and stops afterwards.
pub struct JsonLinesReader<R> {
    lines: std::io::Lines<R>,
    stats: ReadStats,
    failed: bool,
}

impl<R: BufRead> JsonLinesReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            stats: ReadStats::default(),
            failed: false,
        }
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }
}

impl<R: BufRead> Iterator for JsonLinesReader<R> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    self.failed = true;
                    return Some(Err(IngestionError::Io {
                        line: self.stats.lines + 1,
                        source,
                    }));
                }
            };
            self.stats.lines += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                self.stats.skipped += 1;
                continue;
            }

            return match serde_json::from_str::<Sample>(trimmed) {
                Ok(sample) => {
                    self.stats.samples += 1;
                    metrics::counter!("bwc_ingestion_samples_read_total").increment(1);
                    Some(Ok(sample))
                }
                Err(e) => {
                    self.failed = true;
                    metrics::counter!("bwc_ingestion_parse_errors_total").increment(1);
                    warn!(line = self.stats.lines, error = %e, "malformed sample line");
                    Some(Err(IngestionError::ParseFailed {
                        line: self.stats.lines,
                        message: e.to_string(),
                    }))
                }
            };
        }
    }
}

/// Read every sample from a JSON-lines source
pub fn read_json_lines<R: BufRead>(reader: R) -> Result<Vec<Sample>> {
    let mut reader = JsonLinesReader::new(reader);
    let samples = reader.by_ref().collect::<Result<Vec<_>>>()?;

    let stats = reader.stats();
    debug!(
        lines = stats.lines,
        samples = stats.samples,
        skipped = stats.skipped,
        "json lines read"
    );
    Ok(samples)
}
