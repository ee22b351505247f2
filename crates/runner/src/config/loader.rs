use std::path::Path;
use thiserror::Error;
use volwatch_core::DetectorSource;
use volwatch_fusion::FusionLayer;
use volwatch_ports::DetectorError;

use super::types::PipelineConfig;
use crate::factory::build_detector;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    InvalidParameter(#[from] DetectorError),
}

/// Load pipeline configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<PipelineConfig, ConfigError> {
    let config: PipelineConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<PipelineConfig, ConfigError> {
    let default_config = include_str!("pipeline_config.json");
    load_config_from_str(default_config)
}

impl PipelineConfig {
    /// Build every detector and the fusion layer once, discarding them
    pub fn validate(&self) -> Result<(), ConfigError> {
        for source in DetectorSource::ALL {
            build_detector(self, source)?;
        }
        FusionLayer::new(self.session.clone(), self.quorum)?;
        Ok(())
    }

    pub fn fusion_layer(&self) -> Result<FusionLayer, ConfigError> {
        Ok(FusionLayer::new(self.session.clone(), self.quorum)?)
    }
}
