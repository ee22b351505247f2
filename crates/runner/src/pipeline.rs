//! Batch pipeline
//!
//! Sorts the observations, derives log returns once, then runs the three
//! detectors concurrently on blocking workers. Each worker owns its
//! detector and only shares the immutable return slice. Fusion starts once
//! every worker has finished.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use volwatch_core::{DetectorSource, Observation, ObservationSeries, Return, Timestamp};
use volwatch_fusion::{DetectorStream, FusionLayer, FusionReport};

use crate::config::{ConfigError, PipelineConfig, load_default_config};
use crate::error::PipelineError;
use crate::factory::build_detector;

/// Everything produced by one run, ready for export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeReport {
    pub run_id: Uuid,
    /// Calibration the Page-Hinkley stream ran with
    pub calibration_version: String,
    pub observations: usize,
    pub returns: usize,
    pub cusum: DetectorStream,
    pub page_hinkley: DetectorStream,
    pub bocpe: DetectorStream,
    pub fusion: FusionReport,
}

impl RegimeReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub struct RegimePipeline {
    config: PipelineConfig,
    fusion: FusionLayer,
}

impl RegimePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fusion = config.fusion_layer()?;
        Ok(Self { config, fusion })
    }

    /// Pipeline over the embedded default configuration
    pub fn with_default_config() -> Result<Self, ConfigError> {
        Self::new(load_default_config()?)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every detector over the series and fuse their alarms
    ///
    /// Observations may arrive in any order. Each call builds fresh
    /// detectors, so repeated runs over the same input agree.
    pub async fn run(&self, observations: Vec<Observation>) -> Result<RegimeReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let series = ObservationSeries::from_unsorted(observations);
        let returns: Arc<[Return]> = series
            .returns()
            .map_err(|e| PipelineError::Input(e.into()))?
            .into();
        let last_observed = returns.last().map(|r| r.timestamp);
        info!(
            "Run {}: {} observations, {} returns",
            run_id,
            series.len(),
            returns.len()
        );

        let (cusum, page_hinkley, bocpe) = tokio::try_join!(
            self.run_detector(DetectorSource::Cusum, returns.clone(), last_observed),
            self.run_detector(DetectorSource::PageHinkley, returns.clone(), last_observed),
            self.run_detector(DetectorSource::Bocpe, returns.clone(), last_observed),
        )?;

        let fusion = self.fusion.fuse(&cusum, &page_hinkley, &bocpe);
        info!(
            "Run {} complete: {} high risk events",
            run_id,
            fusion.high_risk.len()
        );

        Ok(RegimeReport {
            run_id,
            calibration_version: self.config.calibration.version.clone(),
            observations: series.len(),
            returns: returns.len(),
            cusum,
            page_hinkley,
            bocpe,
            fusion,
        })
    }

    async fn run_detector(
        &self,
        source: DetectorSource,
        returns: Arc<[Return]>,
        last_observed: Option<Timestamp>,
    ) -> Result<DetectorStream, PipelineError> {
        let mut detector = build_detector(&self.config, source)
            .map_err(|error| PipelineError::Detector { detector: source, error })?;

        let alarms = tokio::task::spawn_blocking(move || detector.observe_all(&returns))
            .await?
            .map_err(|error| PipelineError::Detector { detector: source, error })?;
        debug!("{} raised {} alarms", source, alarms.len());

        Ok(DetectorStream::new(source, alarms, last_observed))
    }
}
