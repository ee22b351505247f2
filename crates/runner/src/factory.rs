//! Detector factory
//!
//! Builds boxed detectors from a validated [`PipelineConfig`], either by
//! stream or by the short names used in config files and logs.

use volwatch_core::DetectorSource;
use volwatch_detectors::{Bocpe, CusumDetector, VolatilityRegimeStream};
use volwatch_ports::{AlarmSource, DetectorError, DetectorResult};

use crate::config::{BocpeModelConfig, PipelineConfig};

/// Construct the detector feeding the given stream
pub fn build_detector(
    config: &PipelineConfig,
    source: DetectorSource,
) -> DetectorResult<Box<dyn AlarmSource>> {
    Ok(match source {
        DetectorSource::Cusum => Box::new(CusumDetector::new(config.cusum)?),
        DetectorSource::PageHinkley => {
            Box::new(VolatilityRegimeStream::new(config.calibration.clone())?)
        }
        DetectorSource::Bocpe => {
            let bocpe_config = config.bocpe.detector_config();
            match config.bocpe.model {
                BocpeModelConfig::MeanShift(model) => Box::new(Bocpe::new(bocpe_config, model)?),
                BocpeModelConfig::VarianceShift(model) => {
                    Box::new(Bocpe::new(bocpe_config, model)?)
                }
            }
        }
    })
}

/// Resolve a detector name (case-insensitive) to its stream
pub fn detector_source(name: &str) -> DetectorResult<DetectorSource> {
    match name.trim().to_ascii_lowercase().as_str() {
        "cusum" => Ok(DetectorSource::Cusum),
        "regime" | "page_hinkley" | "pagehinkley" => Ok(DetectorSource::PageHinkley),
        "bocpe" => Ok(DetectorSource::Bocpe),
        other => Err(DetectorError::invalid(
            "detector",
            format!("unknown detector name '{other}'"),
        )),
    }
}

pub fn build_detector_by_name(
    config: &PipelineConfig,
    name: &str,
) -> DetectorResult<Box<dyn AlarmSource>> {
    build_detector(config, detector_source(name)?)
}
