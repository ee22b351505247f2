//! Cross-detector quorum
//!
//! A timestamp becomes a [`HighRiskEvent`] only when at least `quorum`
//! distinct streams flagged it. Repeated flags from one stream count once.

use std::collections::{BTreeMap, BTreeSet};
use volwatch_core::{Alarm, FlaggedMinute, HighRiskEvent, Timestamp};

/// Default number of agreeing streams
pub const DEFAULT_QUORUM: usize = 2;

/// Timestamps flagged by at least `quorum` of the given streams, ascending
pub fn quorum_timestamps<'a, I, S>(streams: I, quorum: usize) -> Vec<Timestamp>
where
    I: IntoIterator<Item = S>,
    S: IntoIterator<Item = &'a Timestamp>,
{
    let mut counts: BTreeMap<Timestamp, usize> = BTreeMap::new();
    for stream in streams {
        let distinct: BTreeSet<Timestamp> = stream.into_iter().copied().collect();
        for ts in distinct {
            *counts.entry(ts).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .filter(|&(_, count)| count >= quorum)
        .map(|(ts, _)| ts)
        .collect()
}

/// Pool CUSUM change points with both detectors' high-volatility minutes
pub fn high_risk_events(
    cusum_alarms: &[Alarm],
    bocpe_minutes: &[FlaggedMinute],
    regime_minutes: &[FlaggedMinute],
    quorum: usize,
) -> Vec<HighRiskEvent> {
    let cusum: Vec<Timestamp> = cusum_alarms.iter().map(|a| a.timestamp).collect();
    let bocpe: Vec<Timestamp> = bocpe_minutes.iter().map(|m| m.timestamp).collect();
    let regime: Vec<Timestamp> = regime_minutes.iter().map(|m| m.timestamp).collect();

    quorum_timestamps([&cusum, &bocpe, &regime], quorum)
        .into_iter()
        .map(HighRiskEvent::new)
        .collect()
}
