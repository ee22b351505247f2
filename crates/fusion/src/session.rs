//! Trading session calendar
//!
//! Flagged minutes only count when the market is open. The default session
//! is the NYSE cash session expressed in UTC with DST slack
//! (13:30-21:00, Monday-Friday), inclusive at both ends.

use chrono::{Datelike, Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use volwatch_core::Timestamp;
use volwatch_ports::{DetectorError, DetectorResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingSession {
    /// Session open (UTC, inclusive)
    pub open: NaiveTime,
    /// Session close (UTC, inclusive)
    pub close: NaiveTime,
    /// Days the session runs
    pub trading_days: Vec<Weekday>,
}

impl Default for TradingSession {
    fn default() -> Self {
        Self {
            open: time_of_day(13, 30),
            close: time_of_day(21, 0),
            trading_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

impl TradingSession {
    pub fn validate(&self) -> DetectorResult<()> {
        if self.open > self.close {
            return Err(DetectorError::invalid(
                "session",
                format!("open {} is after close {}", self.open, self.close),
            ));
        }
        if self.trading_days.is_empty() {
            return Err(DetectorError::invalid("trading_days", "no trading days"));
        }
        Ok(())
    }

    /// Is the market open at this instant?
    pub fn contains(&self, ts: &Timestamp) -> bool {
        if !self.trading_days.contains(&ts.weekday()) {
            return false;
        }
        let time = ts.time();
        self.open <= time && time <= self.close
    }
}

fn time_of_day(hour: i64, minute: i64) -> NaiveTime {
    NaiveTime::MIN + Duration::minutes(hour * 60 + minute)
}
