//! Volwatch Core Domain
//!
//! Pure domain types for the volatility regime engine: observations,
//! the log-return transform, alarm and regime records, and rolling
//! dispersion statistics.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod alarm;
pub mod error;
pub mod observation;
pub mod stats;
pub mod values;

// Re-export commonly used types at crate root
pub use alarm::{
    Alarm, AlarmLabel, DetectorSource, FlaggedMinute, HighRiskEvent, RegimeWindow, RiskLabel,
    VolatilityRegime,
};
pub use error::InputError;
pub use observation::{Observation, ObservationSeries, Return, log_returns};
pub use stats::RollingStd;
pub use values::{Price, Timestamp};
