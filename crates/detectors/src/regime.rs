//! Page-Hinkley style volatility regime detector
//!
//! Works on the rolling standard deviation of returns rather than on the
//! returns themselves, so it reacts to dispersion shifts that CUSUM misses.
//! Each step adds the log-likelihood ratio
//! `L = ln f_high(x) - ln f_low(x)` between two log-normal densities to a
//! running sum `S` and tracks the excursions `g_pos = S - min(S)` and
//! `g_neg = max(S) - S` since the last trigger.

use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use volwatch_core::{
    Alarm, AlarmLabel, DetectorSource, InputError, Return, RollingStd, Timestamp,
};
use volwatch_ports::{AlarmSource, DetectorError, DetectorResult};

/// Excursion above which a regime trigger fires
pub const DECISION_THRESHOLD: f64 = 250.0;

/// Number of returns in the rolling dispersion window
pub const DISPERSION_WINDOW: usize = 30;

/// Log-densities of a dispersion value under the baseline and elevated hypotheses
pub trait VolatilityLikelihood: Send + Sync {
    /// Returns `(ln f_low(x_std), ln f_high(x_std))`
    fn log_densities(&self, x_std: f64) -> (f64, f64);
}

/// Offline-fitted log-normal constants, versioned so runs are reproducible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityCalibration {
    /// Calibration identifier recorded alongside results
    pub version: String,
    /// Mean of ln(rolling std)
    pub log_mu: f64,
    /// Standard deviation of ln(rolling std)
    pub log_sigma: f64,
    /// Hypotheses are centred at `log_mu - separation` and `log_mu + separation`
    pub separation: f64,
}

impl Default for VolatilityCalibration {
    fn default() -> Self {
        Self {
            version: "spy-1min-v1".to_string(),
            log_mu: -8.288934,
            log_sigma: 0.625188,
            separation: 0.2,
        }
    }
}

impl VolatilityCalibration {
    pub fn validate(&self) -> DetectorResult<()> {
        if !self.log_mu.is_finite() {
            return Err(DetectorError::invalid(
                "log_mu",
                format!("{} is not finite", self.log_mu),
            ));
        }
        if !(self.log_sigma.is_finite() && self.log_sigma > 0.0) {
            return Err(DetectorError::invalid(
                "log_sigma",
                format!("{} must be positive", self.log_sigma),
            ));
        }
        if !(self.separation.is_finite() && self.separation > 0.0) {
            return Err(DetectorError::invalid(
                "separation",
                format!("{} must be positive", self.separation),
            ));
        }
        Ok(())
    }

    fn log_normal_ln_pdf(&self, x: f64, centre: f64) -> f64 {
        let z = x.ln() - centre;
        -(x * self.log_sigma * (2.0 * PI).sqrt()).ln()
            - z * z / (2.0 * self.log_sigma * self.log_sigma)
    }
}

impl VolatilityLikelihood for VolatilityCalibration {
    fn log_densities(&self, x_std: f64) -> (f64, f64) {
        (
            self.log_normal_ln_pdf(x_std, self.log_mu - self.separation),
            self.log_normal_ln_pdf(x_std, self.log_mu + self.separation),
        )
    }
}

/// Regime trigger direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegimeSignal {
    High,
    Low,
}

impl RegimeSignal {
    pub fn label(self) -> AlarmLabel {
        match self {
            RegimeSignal::High => AlarmLabel::High,
            RegimeSignal::Low => AlarmLabel::Low,
        }
    }
}

/// Accumulator state since the last trigger
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeState {
    pub s: f64,
    pub min: f64,
    pub max: f64,
    pub g_pos: f64,
    pub g_neg: f64,
    pub t: u64,
}

impl RegimeState {
    /// Pure transition on one log-likelihood ratio
    ///
    /// A trigger zeroes everything except `t`. "high" wins if both
    /// excursions cross on the same step.
    pub fn step(self, llr: f64) -> (RegimeState, Option<RegimeSignal>) {
        let t = self.t + 1;
        let s = self.s + llr;
        let min = self.min.min(s);
        let max = self.max.max(s);
        let g_pos = s - min;
        let g_neg = max - s;

        let signal = if g_pos > DECISION_THRESHOLD {
            Some(RegimeSignal::High)
        } else if g_neg > DECISION_THRESHOLD {
            Some(RegimeSignal::Low)
        } else {
            None
        };

        match signal {
            Some(_) => (
                RegimeState {
                    t,
                    ..Default::default()
                },
                signal,
            ),
            None => (
                RegimeState {
                    s,
                    min,
                    max,
                    g_pos,
                    g_neg,
                    t,
                },
                None,
            ),
        }
    }
}

/// Two-sided sequential likelihood-ratio test on return dispersion
#[derive(Debug, Clone)]
pub struct RegimeDetector<M = VolatilityCalibration> {
    model: M,
    state: RegimeState,
    high_list: Vec<Timestamp>,
    low_list: Vec<Timestamp>,
}

impl RegimeDetector<VolatilityCalibration> {
    pub fn new(calibration: VolatilityCalibration) -> DetectorResult<Self> {
        calibration.validate()?;
        Ok(Self::with_model(calibration))
    }
}

impl<M: VolatilityLikelihood> RegimeDetector<M> {
    /// Use an arbitrary density pair
    pub fn with_model(model: M) -> Self {
        Self {
            model,
            state: RegimeState::default(),
            high_list: Vec::new(),
            low_list: Vec::new(),
        }
    }

    /// Feed one rolling standard deviation
    ///
    /// Triggers are appended to the high/low histories in arrival order.
    pub fn update(
        &mut self,
        x_std: f64,
        timestamp: Timestamp,
    ) -> DetectorResult<Option<RegimeSignal>> {
        if !(x_std.is_finite() && x_std > 0.0) {
            return Err(InputError::NonPositiveDispersion {
                timestamp,
                value: x_std,
            }
            .into());
        }

        let (ln_low, ln_high) = self.model.log_densities(x_std);
        let (next, signal) = self.state.step(ln_high - ln_low);
        self.state = next;

        match signal {
            Some(RegimeSignal::High) => self.high_list.push(timestamp),
            Some(RegimeSignal::Low) => self.low_list.push(timestamp),
            None => {}
        }
        Ok(signal)
    }

    pub fn state(&self) -> RegimeState {
        self.state
    }

    /// Timestamps of "high" triggers, oldest first
    pub fn high_history(&self) -> &[Timestamp] {
        &self.high_list
    }

    /// Timestamps of "low" triggers, oldest first
    pub fn low_history(&self) -> &[Timestamp] {
        &self.low_list
    }

    /// Back to construction state, histories included
    pub fn reset(&mut self) {
        self.state = RegimeState::default();
        self.high_list.clear();
        self.low_list.clear();
    }
}

/// Regime detector fed from returns through a rolling dispersion window
///
/// Each dispersion value is stamped with the newest return in its window,
/// not with the price observation preceding it. Alarms (and the windows
/// fused from them) therefore land on the minute whose return completed
/// the window, one minute after a price-indexed alignment would put them.
#[derive(Debug, Clone)]
pub struct VolatilityRegimeStream<M = VolatilityCalibration> {
    detector: RegimeDetector<M>,
    window: RollingStd,
}

impl VolatilityRegimeStream<VolatilityCalibration> {
    pub fn new(calibration: VolatilityCalibration) -> DetectorResult<Self> {
        Ok(Self::from_detector(RegimeDetector::new(calibration)?))
    }
}

impl<M: VolatilityLikelihood> VolatilityRegimeStream<M> {
    pub fn from_detector(detector: RegimeDetector<M>) -> Self {
        Self {
            detector,
            window: RollingStd::new(DISPERSION_WINDOW),
        }
    }

    pub fn detector(&self) -> &RegimeDetector<M> {
        &self.detector
    }
}

impl<M: VolatilityLikelihood> AlarmSource for VolatilityRegimeStream<M> {
    fn source(&self) -> DetectorSource {
        DetectorSource::PageHinkley
    }

    fn observe(&mut self, ret: &Return) -> DetectorResult<Option<Alarm>> {
        let Some(x_std) = self.window.push_and_std(ret.value) else {
            return Ok(None);
        };
        if !(x_std > 0.0) {
            debug!("Skipping flat dispersion window ending {}", ret.timestamp);
            return Ok(None);
        }

        let signal = self.detector.update(x_std, ret.timestamp)?;
        Ok(signal.map(|s| {
            debug!("Volatility regime {:?} at {} (std={:.6})", s, ret.timestamp, x_std);
            Alarm::new(ret.timestamp, DetectorSource::PageHinkley, s.label())
        }))
    }

    fn reset(&mut self) {
        self.detector.reset();
        self.window.clear();
    }
}
