//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - contract smoke tests
//! - config file -> stream -> compressor -> output runs
//! - invariants over seeded random walks

#[cfg(test)]
mod contract_tests {
    use contracts::{CompressorConfig, StrategyKind};

    #[test]
    fn test_contracts_compile() {
        assert!(CompressorConfig::default().check().is_ok());
        assert!(StrategyKind::StTraceOptimal.requires_reference());
        assert!(!StrategyKind::DeadReckoning.uses_queue());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;

    use compressor::{compress, Compressor, ReferenceTrajectories};
    use config_loader::ConfigLoader;
    use contracts::{
        CompressorConfig, DataQualityKind, DeadReckoningConfig, Sample, StrategyKind,
        KNOTS_TO_MPS,
    };
    use ingestion::{read_json_lines, InstantStream, MockTrajectory};
    use observability::CompressionMetricsAggregator;

    fn timestamps(samples: &[Sample]) -> Vec<f64> {
        samples.iter().map(|s| s.timestamp).collect()
    }

    fn config(strategy: StrategyKind, limit: usize, window_length_s: f64) -> CompressorConfig {
        CompressorConfig {
            strategy,
            limit,
            window_length_s,
            ..Default::default()
        }
    }

    /// End-to-end: TOML file + JSON-lines input -> InstantStream -> Compressor
    #[test]
    fn test_e2e_file_pipeline() {
        let dir = tempfile::tempdir().unwrap();

        let config_path = dir.path().join("compressor.toml");
        std::fs::write(
            &config_path,
            "window_length_s = 50.0\nlimit = 8\nstrategy = \"st_trace\"\n",
        )
        .unwrap();

        let input_path = dir.path().join("samples.jsonl");
        let mut input = std::fs::File::create(&input_path).unwrap();
        let tracks = [
            MockTrajectory::straight("v1", 60).generate(),
            MockTrajectory::turning("v2", 60, 6.0).start(500.0, 0.0).generate(),
        ];
        for sample in tracks.iter().flatten() {
            writeln!(input, "{}", serde_json::to_string(sample).unwrap()).unwrap();
        }
        drop(input);

        let config = ConfigLoader::load_from_path(&config_path).unwrap();
        let file = std::fs::File::open(&input_path).unwrap();
        let samples = read_json_lines(std::io::BufReader::new(file)).unwrap();
        assert_eq!(samples.len(), 120);

        let output = compress(config, None, InstantStream::from_grouped(samples)).unwrap();

        assert_eq!(output.stats.samples_in, 120);
        assert_eq!(output.trajectories.len(), 2);
        assert!(output.issues.is_empty());
        for samples in output.trajectories.values() {
            assert_eq!(samples.first().map(|s| s.timestamp), Some(0.0));
        }
        // windows [0, 50] and (50, 100]
        assert_eq!(output.stats.windows_closed, 2);
        assert!(output.stats.retained_total() <= 16);

        let mut aggregator = CompressionMetricsAggregator::new();
        aggregator.update(&output);
        assert_eq!(aggregator.retained, output.stats.retained_total() as u64);
    }

    /// 5 collinear points, limit 3, Squish: both endpoints and exactly 3 points
    #[test]
    fn test_collinear_squish_keeps_endpoints() {
        let samples: Vec<Sample> = (0..5)
            .map(|i| Sample::new("T1", i as f64, i as f64 * 10.0, 0.0))
            .collect();
        let output = compress(config(StrategyKind::Squish, 3, 100.0), None, samples).unwrap();

        let kept = timestamps(output.trajectory("T1").unwrap());
        assert_eq!(kept.len(), 3);
        assert_eq!(kept.first(), Some(&0.0));
        assert_eq!(kept.last(), Some(&4.0));
    }

    /// Removing a point adds its priority to its surviving neighbours
    #[test]
    fn test_squish_priority_propagation() {
        let mut compressor = Compressor::new(config(StrategyKind::Squish, 3, 100.0)).unwrap();
        compressor.push(Sample::new("a", 0.0, 0.0, 0.0));
        compressor.push(Sample::new("a", 1.0, 1.0, 5.0));
        compressor.push(Sample::new("a", 2.0, 2.0, 0.0));

        let before: Vec<f64> = compressor.window("a").iter().map(|(_, p)| *p).collect();
        assert!((before[1] - 5.0).abs() < 1e-9);

        // refreshes t=2 to 2.5, then evicts it
        compressor.push(Sample::new("a", 3.0, 3.0, 0.0));

        let after: Vec<(f64, f64)> = compressor
            .window("a")
            .iter()
            .map(|(s, p)| (s.timestamp, *p))
            .collect();
        assert_eq!(after.len(), 3);
        assert_eq!(after[1].0, 1.0);
        assert!((after[1].1 - (5.0 + 2.5)).abs() < 1e-9);
        assert_eq!(compressor.stats().evictions, 1);
    }

    /// Below budget nothing is evicted and the output is the input
    #[test]
    fn test_no_op_below_budget() {
        let tracks: Vec<Vec<Sample>> = (0..3)
            .map(|i| {
                MockTrajectory::turning(format!("t{i}"), 4, 20.0)
                    .start_time(i as f64 * 0.1)
                    .generate()
            })
            .collect();

        for strategy in [StrategyKind::Squish, StrategyKind::StTrace] {
            let output = compress(
                config(strategy, 12, 1000.0),
                None,
                InstantStream::new(tracks.clone()),
            )
            .unwrap();

            assert_eq!(output.stats.evictions, 0);
            assert_eq!(output.stats.samples_rejected, 0);
            for track in &tracks {
                let id = &track[0].trajectory_id;
                assert_eq!(output.trajectory(id).unwrap(), track.as_slice());
            }
        }
    }

    /// Followed prediction is held; a broken prediction commits held + new
    #[test]
    fn test_dead_reckoning_hold_then_commit() {
        let config = CompressorConfig {
            strategy: StrategyKind::DeadReckoning,
            dead_reckoning: DeadReckoningConfig { threshold_m: 10.0 },
            ..Default::default()
        };
        let mut compressor = Compressor::new(config).unwrap();
        let knots = 10.0 / KNOTS_TO_MPS;

        compressor.push(Sample::new("v", 0.0, 0.0, 0.0).with_motion(knots, 0.0));
        // 1000 m north after 100 s, 1.5 m off the prediction
        compressor.push(Sample::new("v", 100.0, 1.5, 1000.0).with_motion(knots, 0.0));
        assert_eq!(compressor.committed("v").len(), 1);
        assert_eq!(compressor.held("v").map(|s| s.timestamp), Some(100.0));

        compressor.push(Sample::new("v", 200.0, 400.0, 1900.0).with_motion(knots, 45.0));
        assert_eq!(timestamps(compressor.committed("v")), vec![0.0, 100.0, 200.0]);
        assert!(compressor.held("v").is_none());
    }

    #[test]
    fn test_optimal_strategies_with_reference() {
        let track = MockTrajectory::turning("v", 40, 9.0).interval_s(2.0).generate();
        let reference = ReferenceTrajectories::from_samples(&track);

        for (strategy, eval_delta_s) in [
            (StrategyKind::StTraceOptimal, None),
            (StrategyKind::StTraceOptimalRegular, Some(0.5)),
        ] {
            let config = CompressorConfig {
                eval_delta_s,
                ..config(strategy, 10, 1000.0)
            };
            let output = compress(config, Some(reference.clone()), track.clone()).unwrap();
            let kept = output.trajectory("v").unwrap();
            assert_eq!(kept.len(), 10);
            assert_eq!(kept[0].timestamp, 0.0);
            assert!(output.issues.is_empty());
        }
    }

    #[test]
    fn test_optimal_without_reference_is_rejected() {
        let result = Compressor::new(config(StrategyKind::StTraceOptimal, 10, 100.0));
        assert!(matches!(
            result,
            Err(contracts::ContractError::MissingReference { .. })
        ));
    }

    #[test]
    fn test_data_quality_issues_are_reported() {
        let samples = vec![
            Sample::new("a", 0.0, 0.0, 0.0),
            Sample::new("a", 1.0, 1.0, 0.0),
            Sample::new("a", 1.0, 2.0, 0.0),
            Sample::new("b", f64::NAN, 0.0, 0.0),
        ];
        let output = compress(config(StrategyKind::Squish, 10, 100.0), None, samples).unwrap();

        let kinds: Vec<DataQualityKind> = output.issues.iter().map(|i| i.kind).collect();
        assert!(kinds.contains(&DataQualityKind::NonIncreasingTimestamp));
        assert!(kinds.contains(&DataQualityKind::NonFiniteTimestamp));
        // the permissive path keeps the duplicate in sequence order
        assert_eq!(output.trajectory("a").map(|s| s.len()), Some(3));
        assert!(output.trajectory("b").is_none());
    }

    #[test]
    fn test_hold_back_records_delays() {
        let track = MockTrajectory::turning("v", 30, 12.0).generate();
        let config = CompressorConfig {
            hold_back_newest: true,
            ..config(StrategyKind::StTrace, 5, 10.0)
        };
        let output = compress(config, None, track).unwrap();

        let retained = output.stats.retained_total();
        assert_eq!(output.stats.delays_s.len(), retained);
        assert!(output.stats.delays_s.iter().all(|d| *d >= 0.0));
        assert!(output.stats.delay_summary().is_some());
    }
}

#[cfg(test)]
mod property_tests {
    use std::collections::{BTreeMap, HashMap};

    use compressor::{geometry, Compressor, DeadReckoner, PushOutcome, ReferenceTrajectories};
    use contracts::{CompressorConfig, DeadReckoningConfig, Sample, StrategyKind, TrajectoryId};
    use ingestion::InstantStream;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Random walks with strictly increasing per-trajectory timestamps
    fn random_walks(seed: u64, trajectories: usize, points: usize) -> Vec<Vec<Sample>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..trajectories)
            .map(|i| {
                let id = TrajectoryId::from(format!("walk{i}"));
                let mut t = rng.random_range(0.0..20.0);
                let (mut x, mut y) = (rng.random_range(-1e3..1e3), rng.random_range(-1e3..1e3));
                (0..points)
                    .map(|_| {
                        let sample = Sample::new(id.clone(), t, x, y);
                        t += rng.random_range(1.0..30.0);
                        x += rng.random_range(-50.0..50.0);
                        y += rng.random_range(-50.0..50.0);
                        sample
                    })
                    .collect()
            })
            .collect()
    }

    fn configs() -> Vec<CompressorConfig> {
        let base = CompressorConfig {
            limit: 15,
            window_length_s: 300.0,
            ..Default::default()
        };
        vec![
            CompressorConfig {
                strategy: StrategyKind::Squish,
                ..base.clone()
            },
            CompressorConfig {
                strategy: StrategyKind::StTrace,
                ..base.clone()
            },
            CompressorConfig {
                strategy: StrategyKind::StTrace,
                admission_filter: false,
                ..base.clone()
            },
            CompressorConfig {
                strategy: StrategyKind::StTrace,
                hold_back_newest: true,
                ..base.clone()
            },
            CompressorConfig {
                strategy: StrategyKind::Squish,
                hold_back_newest: true,
                ..base.clone()
            },
            CompressorConfig {
                strategy: StrategyKind::StTraceOptimal,
                ..base.clone()
            },
            CompressorConfig {
                strategy: StrategyKind::StTraceOptimalRegular,
                eval_delta_s: Some(5.0),
                ..base.clone()
            },
            CompressorConfig {
                strategy: StrategyKind::DeadReckoning,
                dead_reckoning: DeadReckoningConfig { threshold_m: 40.0 },
                ..base
            },
        ]
    }

    /// `needle` appears in `haystack` in order
    fn is_subsequence(needle: &[Sample], haystack: &[Sample]) -> bool {
        let mut rest = haystack.iter();
        needle.iter().all(|n| rest.any(|h| h == n))
    }

    #[test]
    fn test_budget_and_time_order_hold_for_every_strategy() {
        for seed in 0..5 {
            let walks = random_walks(seed, 6, 80);
            let originals: HashMap<TrajectoryId, Vec<Sample>> = walks
                .iter()
                .map(|w| (w[0].trajectory_id.clone(), w.clone()))
                .collect();
            let reference = ReferenceTrajectories::from_samples(walks.iter().flatten());

            for config in configs() {
                let limit = config.limit;
                let label = format!("seed {seed} {:?}", config.strategy);
                let mut compressor = if config.requires_reference() {
                    Compressor::with_reference(config, reference.clone()).unwrap()
                } else {
                    Compressor::new(config).unwrap()
                };

                for sample in InstantStream::new(walks.clone()) {
                    compressor.push(sample);
                    assert!(compressor.queue_len() <= limit, "{label}: budget exceeded");
                }

                let output = compressor.finish();
                assert!(output.issues.is_empty(), "{label}: {:?}", output.issues);
                assert_eq!(output.trajectories.len(), 6, "{label}");

                for (id, kept) in &output.trajectories {
                    assert!(
                        kept.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
                        "{label}: {id} not strictly increasing"
                    );
                    assert!(is_subsequence(kept, &originals[id]), "{label}: {id}");
                    assert_eq!(kept[0], originals[id][0], "{label}: {id} lost its start");
                }
            }
        }
    }

    #[test]
    fn test_dead_reckoning_commits_only_on_divergence() {
        let threshold_m = 40.0;
        let config = CompressorConfig {
            strategy: StrategyKind::DeadReckoning,
            dead_reckoning: DeadReckoningConfig { threshold_m },
            ..Default::default()
        };
        let planar = geometry::for_metric(config.metric);
        let mut shadow = DeadReckoner::new(&config.dead_reckoning);
        let mut shadow_stats = Default::default();
        let mut compressor = Compressor::new(config).unwrap();

        for sample in InstantStream::new(random_walks(42, 4, 120)) {
            let divergence = shadow.divergence(planar.as_ref(), &sample);
            shadow.push(planar.as_ref(), sample.clone(), &mut shadow_stats);

            match (compressor.push(sample), divergence) {
                (PushOutcome::Committed, Some(d)) => assert!(d > threshold_m / 2.0),
                (PushOutcome::Held, Some(d)) => assert!(d <= threshold_m / 2.0),
                (PushOutcome::Committed, None) => {}
                (outcome, divergence) => panic!("unexpected {outcome:?} / {divergence:?}"),
            }
        }
    }

    #[test]
    fn test_same_input_same_output() {
        let walks = random_walks(9, 5, 60);
        let run = |strategy| {
            let config = CompressorConfig {
                strategy,
                limit: 12,
                window_length_s: 200.0,
                ..Default::default()
            };
            compressor::compress(config, None, InstantStream::new(walks.clone()))
                .unwrap()
                .trajectories
        };

        for strategy in [StrategyKind::Squish, StrategyKind::StTrace] {
            let first: BTreeMap<_, _> = run(strategy);
            let second: BTreeMap<_, _> = run(strategy);
            assert_eq!(first, second);
        }
    }
}
