//! Two-sided CUSUM
//!
//! Accumulates one-sided evidence of a sustained shift away from a baseline
//! `mu`. Per step:
//!
//! ```text
//! gp <- max(0, gp + x - (mu + k))
//! gn <- min(0, gn + x - (mu - k))
//! ```
//!
//! Triggers when `gp > h` or `gn < -h`, then resets both sums to zero.

use log::debug;
use serde::{Deserialize, Serialize};
use volwatch_core::{Alarm, AlarmLabel, DetectorSource, Return};
use volwatch_ports::{AlarmSource, DetectorError, DetectorResult};

/// CUSUM parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CusumConfig {
    /// Slack (reference value) around the baseline
    pub k: f64,
    /// Decision threshold, must be positive
    pub h: f64,
    /// Baseline mean
    pub mu: f64,
}

impl Default for CusumConfig {
    fn default() -> Self {
        Self {
            k: 0.5,
            h: 5.0,
            mu: 0.0,
        }
    }
}

impl CusumConfig {
    pub fn validate(&self) -> DetectorResult<()> {
        if !self.k.is_finite() {
            return Err(DetectorError::invalid("k", format!("{} is not finite", self.k)));
        }
        if !self.mu.is_finite() {
            return Err(DetectorError::invalid("mu", format!("{} is not finite", self.mu)));
        }
        if !(self.h.is_finite() && self.h > 0.0) {
            return Err(DetectorError::invalid(
                "h",
                format!("{} must be a positive finite threshold", self.h),
            ));
        }
        Ok(())
    }
}

/// Evidence sums and step counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CusumState {
    pub gp: f64,
    pub gn: f64,
    pub t: u64,
}

impl CusumState {
    /// Pure transition: returns the next state and whether it triggered
    ///
    /// A trigger zeroes `gp` and `gn`; `t` keeps counting.
    pub fn step(self, config: &CusumConfig, x: f64) -> (CusumState, bool) {
        let gp = (self.gp + x - (config.mu + config.k)).max(0.0);
        let gn = (self.gn + x - (config.mu - config.k)).min(0.0);
        let t = self.t + 1;

        if gp > config.h || gn < -config.h {
            (CusumState { gp: 0.0, gn: 0.0, t }, true)
        } else {
            (CusumState { gp, gn, t }, false)
        }
    }
}

/// CUSUM detector owning its configuration and state
#[derive(Debug, Clone)]
pub struct CusumDetector {
    config: CusumConfig,
    state: CusumState,
}

impl CusumDetector {
    pub fn new(config: CusumConfig) -> DetectorResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: CusumState::default(),
        })
    }

    /// Feed one observation; returns true on a change-point trigger
    pub fn update(&mut self, x: f64) -> bool {
        let (next, triggered) = self.state.step(&self.config, x);
        self.state = next;
        triggered
    }

    pub fn state(&self) -> CusumState {
        self.state
    }

    pub fn config(&self) -> &CusumConfig {
        &self.config
    }
}

impl AlarmSource for CusumDetector {
    fn source(&self) -> DetectorSource {
        DetectorSource::Cusum
    }

    fn observe(&mut self, ret: &Return) -> DetectorResult<Option<Alarm>> {
        if !self.update(ret.value) {
            return Ok(None);
        }
        debug!("CUSUM change point at {} (t={})", ret.timestamp, self.state.t);
        Ok(Some(Alarm::new(
            ret.timestamp,
            DetectorSource::Cusum,
            AlarmLabel::ChangePoint,
        )))
    }

    fn reset(&mut self) {
        self.state = CusumState::default();
    }
}
