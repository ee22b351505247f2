//! Per-detector windowing
//!
//! Turns a stream's point alarms into high-volatility windows: each "high"
//! alarm opens a window that runs to the next strictly later "low" alarm of
//! the same stream, or to the last observed timestamp when no such alarm
//! exists. Windows are then expanded into the individual session minutes
//! they cover.

use chrono::Duration;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use volwatch_core::{
    Alarm, DetectorSource, FlaggedMinute, RegimeWindow, RiskLabel, Timestamp,
};

use crate::session::TradingSession;

/// Completed output of one detector run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorStream {
    pub source: DetectorSource,
    /// Alarms in emission order
    pub alarms: Vec<Alarm>,
    /// Last timestamp the detector was fed, if any
    pub last_observed: Option<Timestamp>,
}

impl DetectorStream {
    pub fn new(source: DetectorSource, alarms: Vec<Alarm>, last_observed: Option<Timestamp>) -> Self {
        Self {
            source,
            alarms,
            last_observed,
        }
    }

    /// Where an unclosed window ends
    fn horizon(&self) -> Option<Timestamp> {
        self.last_observed
            .or_else(|| self.alarms.iter().map(|a| a.timestamp).max())
    }
}

/// Pair every opening alarm with the next later closing alarm
pub fn regime_windows(stream: &DetectorStream) -> Vec<RegimeWindow> {
    let mut highs: Vec<Timestamp> = stream
        .alarms
        .iter()
        .filter(|a| a.label.opens_window())
        .map(|a| a.timestamp)
        .collect();
    let mut lows: Vec<Timestamp> = stream
        .alarms
        .iter()
        .filter(|a| a.label.closes_window())
        .map(|a| a.timestamp)
        .collect();
    highs.sort();
    lows.sort();

    let Some(horizon) = stream.horizon() else {
        return Vec::new();
    };

    let mut windows = Vec::with_capacity(highs.len());
    for start in highs {
        let idx = lows.partition_point(|low| *low <= start);
        let end = lows.get(idx).copied().unwrap_or(horizon);
        if end < start {
            debug!(
                "[{}] Dropping window opened at {} after stream horizon {}",
                stream.source, start, end
            );
            continue;
        }
        windows.push(RegimeWindow {
            start,
            end,
            source: stream.source,
            regime_label: RiskLabel::HighVolatility,
        });
    }
    windows
}

/// Every in-session minute covered by the windows, sorted and deduplicated
///
/// Minutes step from each window's start in one-minute increments up to
/// and including its end.
pub fn flagged_minutes(windows: &[RegimeWindow], session: &TradingSession) -> Vec<FlaggedMinute> {
    let mut minutes = BTreeSet::new();
    for window in windows {
        let mut ts = window.start;
        while ts <= window.end {
            if session.contains(&ts) {
                minutes.insert(ts);
            }
            ts += Duration::minutes(1);
        }
    }

    minutes
        .into_iter()
        .map(|timestamp| FlaggedMinute {
            timestamp,
            regime: RiskLabel::HighVolatility,
        })
        .collect()
}

/// Windows and minutes for one stream in a single call
pub fn high_volatility_minutes(
    stream: &DetectorStream,
    session: &TradingSession,
) -> (Vec<RegimeWindow>, Vec<FlaggedMinute>) {
    let windows = regime_windows(stream);
    let minutes = flagged_minutes(&windows, session);
    debug!(
        "[{}] {} windows, {} high volatility minutes",
        stream.source,
        windows.len(),
        minutes.len()
    );
    (windows, minutes)
}
