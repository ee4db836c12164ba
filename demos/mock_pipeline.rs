//! Mock Pipeline Example
//!
//! Compresses a synthetic fleet with every strategy and compares the results.
//! Runs without any input file.
//!
//! Run with: cargo run --bin mock_pipeline [config.toml]

use compressor::{compress, evaluate, geometry, ReferenceTrajectories};
use config_loader::ConfigLoader;
use contracts::{CompressorConfig, Sample, StrategyKind};
use ingestion::{InstantStream, MockTrajectory};
use observability::{CompressionMetricsAggregator, LogFormat, ObservabilityConfig};

const STRATEGIES: [StrategyKind; 5] = [
    StrategyKind::Squish,
    StrategyKind::StTrace,
    StrategyKind::StTraceOptimal,
    StrategyKind::StTraceOptimalRegular,
    StrategyKind::DeadReckoning,
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init_with_config(ObservabilityConfig {
        log_format: LogFormat::Compact,
        metrics_port: None,
        default_log_level: "warn".to_string(),
    })?;

    tracing::info!("Starting Mock Pipeline Demo");

    // ==== Stage 1: Use default config or load from file ====
    let base = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading compressor config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        CompressorConfig {
            window_length_s: 600.0,
            limit: 40,
            eval_delta_s: Some(10.0),
            ..Default::default()
        }
    };

    // ==== Stage 2: Generate the fleet ====
    let fleet = create_fleet();
    let samples: usize = fleet.iter().map(Vec::len).sum();
    let reference = ReferenceTrajectories::from_samples(fleet.iter().flatten());
    println!(
        "Fleet: {} vessels, {} samples, window {}s, limit {}\n",
        fleet.len(),
        samples,
        base.window_length_s,
        base.limit
    );

    // ==== Stage 3: Compress with every strategy ====
    println!(
        "{:<26} {:>8} {:>8} {:>10} {:>10} {:>10}",
        "strategy", "kept", "ratio", "mean m", "max m", "delay p95"
    );
    for strategy in STRATEGIES {
        for hold_back in [false, true] {
            if hold_back && !strategy.uses_queue() {
                continue;
            }
            let config = CompressorConfig {
                strategy,
                hold_back_newest: hold_back,
                eval_delta_s: base.eval_delta_s.or(Some(10.0)),
                ..base.clone()
            };
            run(config, &fleet, &reference)?;
        }
    }

    Ok(())
}

fn run(
    config: CompressorConfig,
    fleet: &[Vec<Sample>],
    reference: &ReferenceTrajectories,
) -> Result<(), Box<dyn std::error::Error>> {
    let label = format!(
        "{}{}",
        config.strategy.as_str(),
        if config.hold_back_newest { " (delay)" } else { "" }
    );
    let geometry = geometry::for_metric(config.metric);
    let reference = config.requires_reference().then(|| reference.clone());

    let output = compress(config, reference, InstantStream::new(fleet.to_vec()))?;

    let mut aggregator = CompressionMetricsAggregator::new();
    aggregator.update(&output);
    for track in fleet {
        if let Some(kept) = output.trajectory(&track[0].trajectory_id) {
            let error = evaluate::replay_error(geometry.as_ref(), track, kept);
            aggregator.record_replay_error(error.mean_m);
        }
    }

    let summary = aggregator.summary();
    let p95 = output
        .stats
        .delay_summary()
        .map(|d| format!("{:.1}s", d.p95_s))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<26} {:>8} {:>7.2}% {:>10.2} {:>10.2} {:>10}",
        label,
        summary.retained,
        summary.compression_ratio * 100.0,
        summary.replay_error_m.mean,
        summary.replay_error_m.max,
        p95
    );
    Ok(())
}

/// Five vessels: straight runs, slow turns and a zig-zag
fn create_fleet() -> Vec<Vec<Sample>> {
    let mut fleet = vec![
        MockTrajectory::straight("219000001", 360)
            .interval_s(10.0)
            .speed_mps(6.0)
            .with_motion()
            .generate(),
        MockTrajectory::straight("219000002", 360)
            .interval_s(10.0)
            .heading(90.0)
            .start(-5_000.0, 2_000.0)
            .speed_mps(4.0)
            .with_motion()
            .generate(),
        MockTrajectory::turning("219000003", 360, 0.2)
            .interval_s(10.0)
            .start(3_000.0, -3_000.0)
            .with_motion()
            .generate(),
        MockTrajectory::turning("219000004", 240, -0.5)
            .interval_s(15.0)
            .start_time(3.0)
            .start(8_000.0, 8_000.0)
            .generate(),
    ];

    // zig-zag: alternate headings every 20 samples
    let mut zigzag = Vec::new();
    let mut start = (0.0, -8_000.0);
    for leg in 0..9 {
        let heading = if leg % 2 == 0 { 45.0 } else { 135.0 };
        let samples = MockTrajectory::straight("219000005", 20)
            .interval_s(20.0)
            .start_time(leg as f64 * 400.0 + 7.0)
            .start(start.0, start.1)
            .heading(heading)
            .with_motion()
            .generate();
        if let Some(last) = samples.last() {
            start = (last.position.x, last.position.y);
        }
        zigzag.extend(samples);
    }
    fleet.push(zigzag);

    fleet
}
