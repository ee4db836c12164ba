//! Pipeline orchestrator - reads samples, runs the compressor, writes output.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use compressor::{evaluate, geometry, Compressor, ReferenceTrajectories};
use contracts::{CompressionOutput, CompressorConfig, Sample, TrajectoryId};
use ingestion::{read_json_lines, InstantStream};
use observability::{record_compression_output, record_replay_error};
use tracing::{info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated compressor configuration
    pub compressor: CompressorConfig,

    /// JSON-lines input
    pub input: PathBuf,

    /// Ground truth for optimal-replay strategies (None = the input itself)
    pub reference: Option<PathBuf>,

    /// Output file (None = stdout)
    pub output: Option<PathBuf>,

    /// Compute replay error per trajectory
    pub evaluate: bool,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let samples = read_samples(&self.config.input)?;
        let samples_read = samples.len();
        info!(samples = samples_read, input = %self.config.input.display(), "Samples loaded");

        let originals = group(&samples);
        let reference = self.load_reference(&samples)?;

        let mut compressor = match reference {
            Some(reference) => Compressor::with_reference(self.config.compressor.clone(), reference)?,
            None => Compressor::new(self.config.compressor.clone())?,
        };
        compressor.extend(InstantStream::from_grouped(samples));
        let output = compressor.finish();

        record_compression_output(&output, self.config.compressor.strategy.as_str());
        for issue in &output.issues {
            warn!(
                trajectory_id = %issue.trajectory_id,
                kind = issue.kind.as_str(),
                timestamp = ?issue.timestamp,
                "data-quality issue"
            );
        }

        let mut stats = PipelineStats {
            samples_read,
            trajectories: originals.len(),
            delays: output.stats.delay_summary(),
            ..Default::default()
        };
        stats.metrics.update(&output);

        if self.config.evaluate {
            let geometry = geometry::for_metric(self.config.compressor.metric);
            for (id, compressed) in &output.trajectories {
                let Some(original) = originals.get(id) else {
                    continue;
                };
                let error = evaluate::replay_error(geometry.as_ref(), original, compressed);
                record_replay_error(error.mean_m, error.max_m);
                stats.metrics.record_replay_error(error.mean_m);
                stats.replay.insert(id.clone(), error);
            }
        }

        write_output(&output, self.config.output.as_deref())?;

        stats.duration = start_time.elapsed();
        info!(
            retained = output.stats.retained_total(),
            ratio = format!("{:.4}", output.stats.compression_ratio()),
            duration_secs = stats.duration.as_secs_f64(),
            "Compression completed"
        );

        Ok(stats)
    }

    fn load_reference(&self, samples: &[Sample]) -> Result<Option<ReferenceTrajectories>> {
        if !self.config.compressor.requires_reference() {
            return Ok(None);
        }

        let reference = match &self.config.reference {
            Some(path) => {
                let truth = read_samples(path)?;
                info!(samples = truth.len(), reference = %path.display(), "Reference loaded");
                ReferenceTrajectories::from_samples(&truth)
            }
            None => {
                info!("Using the input as ground-truth reference");
                ReferenceTrajectories::from_samples(samples)
            }
        };
        Ok(Some(reference))
    }
}

fn read_samples(path: &Path) -> Result<Vec<Sample>> {
    if !path.exists() {
        return Err(CliError::input_not_found(path.display().to_string()).into());
    }
    let file = File::open(path).map_err(CliError::from)?;
    let samples = read_json_lines(BufReader::new(file))
        .map_err(CliError::from)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(samples)
}

/// Per-trajectory copies of the input, time ordered
fn group(samples: &[Sample]) -> BTreeMap<TrajectoryId, Vec<Sample>> {
    let mut groups: BTreeMap<TrajectoryId, Vec<Sample>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry(sample.trajectory_id.clone())
            .or_default()
            .push(sample.clone());
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    }
    groups
}

fn write_output(output: &CompressionOutput, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(CliError::from)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, output).map_err(CliError::from)?;
            writer.flush().map_err(CliError::from)?;
            info!(output = %path.display(), "Output written");
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, output).map_err(CliError::from)?;
            writeln!(writer).map_err(CliError::from)?;
        }
    }
    Ok(())
}
