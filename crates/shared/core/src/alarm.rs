//! Alarm and regime records
//!
//! Detectors emit [`Alarm`]s. The fusion layer derives [`RegimeWindow`]s,
//! [`FlaggedMinute`]s and [`HighRiskEvent`]s from them. All labels come from
//! closed sets so any sink can consume the records as-is.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::values::Timestamp;

/// Which detector stream produced an alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorSource {
    Cusum,
    /// Page-Hinkley style volatility regime test
    PageHinkley,
    Bocpe,
}

impl DetectorSource {
    pub const ALL: [DetectorSource; 3] = [
        DetectorSource::Cusum,
        DetectorSource::PageHinkley,
        DetectorSource::Bocpe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorSource::Cusum => "cusum",
            DetectorSource::PageHinkley => "page_hinkley",
            DetectorSource::Bocpe => "bocpe",
        }
    }
}

impl fmt::Display for DetectorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Volatility classification attached to BOCPE variance-model alarms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolatilityRegime {
    #[serde(rename = "High Volatility")]
    High,
    #[serde(rename = "Low Volatility")]
    Low,
}

impl fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolatilityRegime::High => f.write_str("High Volatility"),
            VolatilityRegime::Low => f.write_str("Low Volatility"),
        }
    }
}

/// Alarm label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmLabel {
    ChangePoint,
    High,
    Low,
    RegimeTag(VolatilityRegime),
}

impl AlarmLabel {
    /// Labels that start a high-volatility window
    pub fn opens_window(&self) -> bool {
        matches!(
            self,
            AlarmLabel::High | AlarmLabel::RegimeTag(VolatilityRegime::High)
        )
    }

    /// Labels that end a high-volatility window
    pub fn closes_window(&self) -> bool {
        matches!(
            self,
            AlarmLabel::Low | AlarmLabel::RegimeTag(VolatilityRegime::Low)
        )
    }
}

impl fmt::Display for AlarmLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlarmLabel::ChangePoint => f.write_str("change_point"),
            AlarmLabel::High => f.write_str("high"),
            AlarmLabel::Low => f.write_str("low"),
            AlarmLabel::RegimeTag(regime) => write!(f, "{regime}"),
        }
    }
}

/// Point alarm emitted by a detector update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub timestamp: Timestamp,
    pub source: DetectorSource,
    pub label: AlarmLabel,
}

impl Alarm {
    pub fn new(timestamp: Timestamp, source: DetectorSource, label: AlarmLabel) -> Self {
        Self {
            timestamp,
            source,
            label,
        }
    }
}

/// Labels produced by the fusion layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "high volatility")]
    HighVolatility,
    #[serde(rename = "high risk")]
    HighRisk,
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLabel::HighVolatility => f.write_str("high volatility"),
            RiskLabel::HighRisk => f.write_str("high risk"),
        }
    }
}

/// High-volatility interval of a single detector stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeWindow {
    pub start: Timestamp,
    pub end: Timestamp,
    pub source: DetectorSource,
    pub regime_label: RiskLabel,
}

/// A trading-session minute inside some regime window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedMinute {
    pub timestamp: Timestamp,
    pub regime: RiskLabel,
}

/// Timestamp flagged by a quorum of independent detector streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighRiskEvent {
    pub timestamp: Timestamp,
    pub regime: RiskLabel,
}

impl HighRiskEvent {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            regime: RiskLabel::HighRisk,
        }
    }
}
