//! Pipeline Integration Tests
//!
//! Runs the full batch pipeline (returns, three concurrent detectors,
//! fusion) over synthetic one-minute price series.

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use volwatch_core::{AlarmLabel, DetectorSource, Observation, Timestamp};
use volwatch_fusion::TradingSession;
use volwatch_ports::DetectorError;
use volwatch_runner::{
    BocpeModelConfig, PipelineConfig, PipelineError, RegimePipeline, load_config_from_str,
};

/// Monday 2024-03-04 14:00 UTC plus `m` minutes
fn t(m: i64) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap() + Duration::minutes(m)
}

/// Prices whose log returns alternate +a/-a, one per minute, per phase
fn prices(phases: &[(f64, usize)]) -> Vec<Observation> {
    let mut price = 500.0_f64;
    let mut observations = vec![Observation::new(t(0), Decimal::from_f64(price).unwrap())];
    for &(amplitude, count) in phases {
        for _ in 0..count {
            let i = observations.len();
            let sign = if i % 2 == 1 { 1.0 } else { -1.0 };
            price *= (sign * amplitude).exp();
            observations.push(Observation::new(
                t(i as i64),
                Decimal::from_f64(price).unwrap(),
            ));
        }
    }
    observations
}

fn calm_burst_calm() -> Vec<Observation> {
    prices(&[(2.5e-4, 60), (2.5e-3, 150), (2.5e-5, 300)])
}

#[tokio::test]
async fn test_default_pipeline_flags_volatility_burst() {
    let _ = env_logger::try_init();
    let pipeline = RegimePipeline::with_default_config().unwrap();
    let observations = calm_burst_calm();

    let report = pipeline.run(observations.clone()).await.unwrap();

    assert_eq!(report.observations, observations.len());
    assert_eq!(report.returns, observations.len() - 1);
    assert_eq!(report.calibration_version, "spy-1min-v1");
    assert_eq!(
        report.calibration_version,
        pipeline.config().calibration.version
    );
    assert_eq!(report.page_hinkley.source, DetectorSource::PageHinkley);
    assert_eq!(report.page_hinkley.last_observed, Some(t(510)));

    let first_high = report
        .page_hinkley
        .alarms
        .iter()
        .find(|a| a.label == AlarmLabel::High)
        .map(|a| a.timestamp)
        .expect("burst should raise a high alarm");
    let first_low = report
        .page_hinkley
        .alarms
        .iter()
        .find(|a| a.label == AlarmLabel::Low)
        .map(|a| a.timestamp)
        .expect("collapse should raise a low alarm");
    assert!(first_high < first_low);

    assert!(!report.fusion.regime_windows.is_empty());
    let session = TradingSession::default();
    assert!(
        report
            .fusion
            .regime_minutes
            .iter()
            .all(|m| session.contains(&m.timestamp))
    );
    assert!(
        report
            .fusion
            .high_risk
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp)
    );
}

#[tokio::test]
async fn test_runs_are_deterministic_and_order_independent() {
    let pipeline = RegimePipeline::with_default_config().unwrap();
    let observations = calm_burst_calm();
    let mut shuffled = observations.clone();
    shuffled.reverse();

    let first = pipeline.run(observations).await.unwrap();
    let second = pipeline.run(shuffled).await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.cusum, second.cusum);
    assert_eq!(first.page_hinkley, second.page_hinkley);
    assert_eq!(first.bocpe, second.bocpe);
    assert_eq!(first.fusion, second.fusion);
}

#[tokio::test]
async fn test_non_positive_price_is_rejected() {
    let pipeline = RegimePipeline::with_default_config().unwrap();
    let observations = vec![
        Observation::new(t(0), dec!(500)),
        Observation::new(t(1), dec!(0)),
        Observation::new(t(2), dec!(501)),
    ];

    let err = pipeline.run(observations).await.unwrap_err();

    assert!(matches!(err, PipelineError::Input(_)));
    assert!(matches!(
        err.detector_error(),
        Some(DetectorError::MissingInput(_))
    ));
}

#[tokio::test]
async fn test_empty_and_single_observation_runs_are_empty() {
    let pipeline = RegimePipeline::with_default_config().unwrap();

    for observations in [Vec::new(), vec![Observation::new(t(0), dec!(500))]] {
        let report = pipeline.run(observations).await.unwrap();
        assert_eq!(report.returns, 0);
        assert!(report.cusum.alarms.is_empty());
        assert!(report.page_hinkley.alarms.is_empty());
        assert!(report.bocpe.alarms.is_empty());
        assert!(report.fusion.high_risk.is_empty());
    }
}

#[tokio::test]
async fn test_numerical_instability_names_the_detector() {
    let json = r#"{
        "bocpe": {
            "hazard": 0.01,
            "threshold": 0.5,
            "model": { "model": "mean_shift", "prior_mean": 0.0, "prior_precision": 1e12, "obs_var": 1e-12 }
        }
    }"#;
    let pipeline = RegimePipeline::new(load_config_from_str(json).unwrap()).unwrap();
    let observations = vec![
        Observation::new(t(0), dec!(100)),
        Observation::new(t(1), dec!(200)),
    ];

    let err = pipeline.run(observations).await.unwrap_err();

    match err {
        PipelineError::Detector { detector, error } => {
            assert_eq!(detector, DetectorSource::Bocpe);
            assert!(matches!(error, DetectorError::NumericalInstability(_)));
        }
        other => panic!("expected detector failure, got {other}"),
    }
}

#[test]
fn test_invalid_config_is_rejected_up_front() {
    let config = PipelineConfig {
        quorum: 5,
        ..Default::default()
    };
    assert!(RegimePipeline::new(config).is_err());

    let mut config = PipelineConfig::default();
    config.bocpe.model = BocpeModelConfig::VarianceShift(volwatch_detectors::VarianceShift {
        prior_alpha: 0.5,
        prior_beta: 1e-6,
        vol_threshold: 1e-6,
    });
    assert!(RegimePipeline::new(config).is_err());
}

#[tokio::test]
async fn test_report_exports_as_json() {
    let pipeline = RegimePipeline::with_default_config().unwrap();

    let report = pipeline.run(calm_burst_calm()).await.unwrap();
    let json = report.to_json().unwrap();

    assert!(json.contains(&report.run_id.to_string()));
    assert!(json.contains("\"page_hinkley\""));
    assert!(json.contains("\"high volatility\""));
}
