//! End-to-end tests for the INS-only and INS/GPS Kalman solutions
//!
//! These tests run the full experiment loop and check the behaviour a user of the
//! simulator relies on:
//! - a perfect sensor suite reproduces the ground truth exactly
//! - an uncorrected accelerometer bias drifts quadratically, as ½·b·t²
//! - GPS fusion bounds that drift to the GPS accuracy
//! - a run is fully determined by its seed and configuration
//!
//! The numeric bounds in the scenario tests are not design goals. They are conservative
//! envelopes around the analytic error budgets (bias drift of 100 m and a dead-reckoning
//! noise contribution of roughly 18 m at 100 s) so that every seed passes comfortably.

use ins1d::kalman::{KalmanConfig, KalmanFilter1D};
use ins1d::linalg::is_positive_semi_definite;
use ins1d::motion::MotionModel;
use ins1d::noise::NoiseGenerator;
use ins1d::sensors::{AccelerometerConfig, AccelerometerSensor, GpsConfig, GpsSensor};
use ins1d::sim::{AccelerationProfile, SimulationConfig, SimulationResult, run_simulation};
use ins1d::{FusionError, State1D};

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("ins1d_{}_{}", std::process::id(), name))
}

fn close(a: f64, b: f64, rel: f64) -> bool {
    (a - b).abs() <= rel * a.abs().max(b.abs()).max(1.0)
}

#[test]
fn zero_noise_kalman_tracks_truth_exactly() {
    let config = SimulationConfig {
        accel_bias: 0.0,
        accel_noise_std: 0.0,
        gps_noise_std: 0.0,
        ..Default::default()
    };
    let result = run_simulation(&config).unwrap();
    assert_eq!(result.len(), 1001);
    for record in &result.records {
        assert!(
            close(record.kalman_position, record.true_position, 1e-9),
            "t = {}: {} vs {}",
            record.time,
            record.kalman_position,
            record.true_position
        );
        assert!(close(record.kalman_velocity, record.true_velocity, 1e-9));
        assert!(close(record.ins_position, record.true_position, 1e-9));
        if let Some(z) = record.gps_measurement {
            assert_eq!(z, record.true_position);
        }
    }
}

#[test]
fn bias_drift_is_quadratic() {
    let bias = 0.05;
    let config = SimulationConfig {
        accel_bias: bias,
        accel_noise_std: 0.0,
        ..Default::default()
    };
    let result = run_simulation(&config).unwrap();
    for record in &result.records {
        let expected = 0.5 * bias * record.time * record.time;
        assert!(
            (record.ins_error() - expected).abs() < 1e-6,
            "t = {}: drift {} expected {}",
            record.time,
            record.ins_error(),
            expected
        );
    }
    let (ins_final, _) = result.final_errors();
    assert!((ins_final - 250.0).abs() < 1e-6);
}

#[test]
fn bias_drift_dominates_noise_over_long_horizons() {
    let bias = 0.2;
    for seed in 1..=5 {
        let config = SimulationConfig {
            accel_bias: bias,
            seed,
            ..Default::default()
        };
        let result = run_simulation(&config).unwrap();
        let (ins_final, _) = result.final_errors();
        let expected = 0.5 * bias * 100.0 * 100.0;
        assert!(
            (ins_final - expected).abs() < 0.1 * expected,
            "seed {}: drift {} expected about {}",
            seed,
            ins_final,
            expected
        );
    }
}

#[test]
fn kalman_bounds_drift_in_reference_scenario() {
    let mut ins_sum = 0.0;
    let mut kalman_rms_sum = 0.0;
    let seeds = 1..=10u64;
    let n = seeds.clone().count() as f64;
    for seed in seeds {
        let config = SimulationConfig {
            seed,
            ..Default::default()
        };
        let result = run_simulation(&config).unwrap();
        assert_eq!(result.gps_fix_count(), 100);
        let (ins_final, kalman_final) = result.final_errors();
        assert!(
            kalman_final.abs() < 10.0,
            "seed {}: Kalman error {}",
            seed,
            kalman_final
        );
        assert!(kalman_final.abs() < ins_final.abs());
        let stats = result.statistics();
        assert!(stats.kalman.rms < stats.ins_only.rms);
        ins_sum += ins_final.abs();
        kalman_rms_sum += stats.kalman.rms;
    }
    assert!(ins_sum / n > 60.0, "mean INS-only error {}", ins_sum / n);
    assert!(
        kalman_rms_sum / n < 5.0,
        "mean Kalman RMS {}",
        kalman_rms_sum / n
    );
}

#[test]
fn short_scenario_keeps_fused_error_small() {
    for seed in 1..=10u64 {
        let config = SimulationConfig {
            total_time: 10.0,
            seed,
            ..Default::default()
        };
        let result = run_simulation(&config).unwrap();
        assert_eq!(result.len(), 101);
        assert_eq!(result.gps_fix_count(), 10);
        let (_, kalman_final) = result.final_errors();
        assert!(kalman_final.abs() < 10.0);
    }
}

#[test]
fn identical_seeds_reproduce_runs() {
    let config = SimulationConfig {
        seed: 2024,
        ..Default::default()
    };
    let a = run_simulation(&config).unwrap();
    let b = run_simulation(&config).unwrap();
    assert_eq!(a.records, b.records);

    let other = run_simulation(&SimulationConfig {
        seed: 2025,
        ..Default::default()
    })
    .unwrap();
    assert_ne!(a.records, other.records);
}

#[test]
fn run_uses_one_noise_sequence_in_fixed_order() {
    // Rebuild the loop by hand: accelerometer draw, then GPS draw when due, all from a
    // single generator seeded once.
    let config = SimulationConfig {
        total_time: 20.0,
        seed: 9,
        ..Default::default()
    };
    let result = run_simulation(&config).unwrap();

    let motion = MotionModel::new(config.dt).unwrap();
    let accel = AccelerometerSensor::new(config.accelerometer_config()).unwrap();
    let gps = GpsSensor::new(config.gps_config(), config.dt).unwrap();
    let mut filter = KalmanFilter1D::new(config.kalman_config()).unwrap();
    let mut noise = NoiseGenerator::new(config.seed);
    let mut truth = config.initial_state;
    let mut ins = config.initial_state;
    for k in 1..=config.num_steps() {
        let a = config.profile.acceleration_at((k - 1) as f64 * config.dt);
        truth = motion.propagate(&truth, a);
        let measured = accel.measure(a, &mut noise);
        let fix = gps
            .is_due(k)
            .then(|| gps.measure(truth.position, &mut noise));
        ins = motion.propagate(&ins, measured);
        filter.step(measured, fix).unwrap();

        let record = &result.records[k];
        assert_eq!(record.true_state(), truth);
        assert_eq!(record.ins_state(), ins);
        assert_eq!(record.kalman_state(), filter.state());
        assert_eq!(record.gps_measurement, fix);
    }
}

#[test]
fn covariance_stays_valid_and_shrinks_on_updates() {
    let dt = 0.1;
    let motion = MotionModel::new(dt).unwrap();
    let accel = AccelerometerSensor::new(AccelerometerConfig {
        bias: 0.02,
        noise_std: 0.1,
    })
    .unwrap();
    let gps = GpsSensor::new(
        GpsConfig {
            noise_std: 3.0,
            period_s: 0.5,
        },
        dt,
    )
    .unwrap();
    let mut filter = KalmanFilter1D::new(KalmanConfig::diagonal(
        dt,
        0.5,
        3.0,
        State1D::default(),
        100.0,
        10.0,
    ))
    .unwrap();
    let mut noise = NoiseGenerator::new(77);
    let mut truth = State1D::default();
    let profile = AccelerationProfile::Sinusoid {
        amplitude: 1.0,
        angular_frequency: 0.3,
    };
    for k in 1..=2000 {
        let a = profile.acceleration_at(k as f64 * dt);
        truth = motion.propagate(&truth, a);
        filter.predict(accel.measure(a, &mut noise));
        let prior = *filter.covariance();
        assert!(is_positive_semi_definite(&prior, 1e-9));
        if gps.is_due(k) {
            filter.update(gps.measure(truth.position, &mut noise)).unwrap();
            let post = filter.covariance();
            assert!(post[(0, 0)] <= prior[(0, 0)]);
            assert!(post[(1, 1)] <= prior[(1, 1)]);
            assert!(post[(0, 0)] >= 0.0 && post[(1, 1)] >= 0.0);
            assert!(is_positive_semi_definite(post, 1e-9));
        }
    }
    // Converged well below the initial uncertainty
    let (sigma_pos, _) = filter.uncertainty();
    assert!(sigma_pos < 3.0);
}

#[test]
fn degenerate_update_aborts_the_run() {
    let config = SimulationConfig {
        gps_noise_std: 0.0,
        process_noise_std: 0.0,
        initial_covariance: [[0.0, 0.0], [0.0, 0.0]],
        ..Default::default()
    };
    match run_simulation(&config) {
        Err(FusionError::NumericDegeneracy {
            innovation_covariance,
        }) => assert_eq!(innovation_covariance, 0.0),
        other => panic!("expected a numeric degeneracy, got {:?}", other.map(|r| r.len())),
    }
}

#[test]
fn fractional_gps_period_is_applied() {
    let config = SimulationConfig {
        total_time: 10.0,
        gps_period: 0.25,
        ..Default::default()
    };
    let result = run_simulation(&config).unwrap();
    // Epochs at 0.25 s spacing over 10 s, excluding the initial record
    assert_eq!(result.gps_fix_count(), 40);
    assert!(result.records[3].gps_measurement.is_some());
    assert!(result.records[4].gps_measurement.is_none());
}

#[test]
fn csv_round_trip() {
    let config = SimulationConfig {
        total_time: 3.0,
        ..Default::default()
    };
    let result = run_simulation(&config).unwrap();
    let path = temp_path("results.csv");
    result.write_csv(&path).unwrap();
    let loaded = SimulationResult::from_csv(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded.records, result.records);
    assert_eq!(loaded.gps_fix_count(), 3);
}

#[test]
fn config_files_round_trip() {
    let config = SimulationConfig {
        dt: 0.05,
        total_time: 30.0,
        accel_bias: -0.01,
        seed: 7,
        initial_state: State1D::new(10.0, 1.5),
        initial_covariance: [[25.0, 0.0], [0.0, 4.0]],
        profile: AccelerationProfile::Sinusoid {
            amplitude: 0.4,
            angular_frequency: 0.2,
        },
        ..Default::default()
    };
    for ext in ["json", "yaml", "toml"] {
        let path = temp_path(&format!("config.{}", ext));
        config.to_file(&path).unwrap();
        let loaded = SimulationConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config, "{} round trip", ext);
    }
}

#[test]
fn partial_config_file_uses_defaults() {
    let path = temp_path("partial.toml");
    std::fs::write(&path, "total_time = 12.0\nseed = 3\n\n[profile]\nkind = \"constant\"\nvalue = 0.25\n").unwrap();
    let loaded = SimulationConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded.total_time, 12.0);
    assert_eq!(loaded.seed, 3);
    assert_eq!(loaded.profile, AccelerationProfile::Constant { value: 0.25 });
    assert_eq!(loaded.dt, SimulationConfig::default().dt);
    assert!(loaded.validate().is_ok());
}
