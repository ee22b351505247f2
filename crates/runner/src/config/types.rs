use serde::{Deserialize, Serialize};
use volwatch_detectors::{BocpeConfig, CusumConfig, MeanShift, VarianceShift, VolatilityCalibration};
use volwatch_fusion::{DEFAULT_QUORUM, TradingSession};

/// Observation model selected for BOCPE
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum BocpeModelConfig {
    MeanShift(MeanShift),
    VarianceShift(VarianceShift),
}

impl Default for BocpeModelConfig {
    fn default() -> Self {
        BocpeModelConfig::VarianceShift(VarianceShift::default())
    }
}

/// BOCPE section of the pipeline config
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BocpeSettings {
    pub hazard: f64,
    pub threshold: f64,
    #[serde(default)]
    pub max_run_length: Option<usize>,
    #[serde(default)]
    pub model: BocpeModelConfig,
}

impl Default for BocpeSettings {
    fn default() -> Self {
        let base = BocpeConfig::default();
        Self {
            hazard: base.hazard,
            threshold: base.threshold,
            max_run_length: base.max_run_length,
            model: BocpeModelConfig::default(),
        }
    }
}

impl BocpeSettings {
    pub fn detector_config(&self) -> BocpeConfig {
        BocpeConfig {
            hazard: self.hazard,
            threshold: self.threshold,
            max_run_length: self.max_run_length,
        }
    }
}

fn default_quorum() -> usize {
    DEFAULT_QUORUM
}

/// Full configuration of a detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub cusum: CusumConfig,
    #[serde(default)]
    pub bocpe: BocpeSettings,
    /// Versioned density constants for the Page-Hinkley detector
    #[serde(default)]
    pub calibration: VolatilityCalibration,
    #[serde(default)]
    pub session: TradingSession,
    #[serde(default = "default_quorum")]
    pub quorum: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cusum: CusumConfig::default(),
            bocpe: BocpeSettings::default(),
            calibration: VolatilityCalibration::default(),
            session: TradingSession::default(),
            quorum: DEFAULT_QUORUM,
        }
    }
}
