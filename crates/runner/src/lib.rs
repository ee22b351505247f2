//! Volwatch Runner - batch regime detection
//!
//! Wires configuration, the detector factory and the fusion layer into a
//! single async entry point:
//!
//! ```text
//!   observations ──► sort ──► log returns
//!                                │ Arc<[Return]>
//!             ┌──────────────────┼──────────────────┐
//!             ▼                  ▼                  ▼
//!      spawn_blocking     spawn_blocking     spawn_blocking
//!          CUSUM           Page-Hinkley          BOCPE
//!             └──────────────────┼──────────────────┘
//!                                ▼ try_join!
//!                          FusionLayer::fuse
//!                                ▼
//!                           RegimeReport
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod pipeline;

pub use config::{
    BocpeModelConfig, BocpeSettings, ConfigError, PipelineConfig, load_config,
    load_config_from_str, load_default_config,
};
pub use error::PipelineError;
pub use factory::{build_detector, build_detector_by_name, detector_source};
pub use pipeline::{RegimePipeline, RegimeReport};
