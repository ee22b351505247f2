//! Bayesian Online Change Point Estimation
//!
//! Maintains a posterior over run length (steps since the last change
//! point), following Adams & MacKay (2007). Per observation `x` with
//! constant hazard `H`:
//!
//! ```text
//! growth_l   = p_l * q_l(x) * (1 - H)        run continues at l + 1
//! change     = sum_l p_l * q_l(x) * H         run restarts at 0
//! p'         = [change, growth_0, growth_1, ...] / evidence
//! ```
//!
//! The detector never hard-resets; a change point only re-weights the
//! hypotheses. It triggers when `P(run_length = 0) >= threshold` or when
//! the MAP run length drops, which signals that the posterior has
//! concentrated on a change that already happened.
//!
//! Note that `change / evidence` is always exactly `H` before truncation,
//! so the threshold rule only fires for `threshold <= hazard`; in practice
//! the MAP drop carries detection.

mod model;
mod posterior;

pub use model::{ConjugateModel, GammaPrecision, GaussianMean, MeanShift, VarianceShift};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use volwatch_core::{Alarm, AlarmLabel, DetectorSource, Return, VolatilityRegime};
use volwatch_ports::{AlarmSource, DetectorError, DetectorResult};

use posterior::RunLengthPosterior;

/// Model-independent BOCPE parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BocpeConfig {
    /// Prior probability of a change point at any step, in (0, 1)
    pub hazard: f64,
    /// Change-point probability that triggers an alarm, in (0, 1)
    pub threshold: f64,
    /// Keep at most `max_run_length + 1` hypotheses
    pub max_run_length: Option<usize>,
}

impl Default for BocpeConfig {
    fn default() -> Self {
        Self {
            hazard: 1.0 / 250.0,
            threshold: 0.2,
            max_run_length: None,
        }
    }
}

impl BocpeConfig {
    pub fn validate(&self) -> DetectorResult<()> {
        if !(self.hazard > 0.0 && self.hazard < 1.0) {
            return Err(DetectorError::invalid(
                "hazard",
                format!("{} must be in (0, 1)", self.hazard),
            ));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(DetectorError::invalid(
                "threshold",
                format!("{} must be in (0, 1)", self.threshold),
            ));
        }
        match self.max_run_length {
            Some(0) => {
                return Err(DetectorError::invalid(
                    "max_run_length",
                    "must be at least 1",
                ));
            }
            Some(n) if n.checked_add(1).is_none() => {
                return Err(DetectorError::invalid(
                    "max_run_length",
                    format!("{n} leaves no room for the change-point slot"),
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Result of one BOCPE update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BocpeSignal {
    pub triggered: bool,
    /// Volatility label of the MAP hypothesis (variance-shift model only)
    pub regime: Option<VolatilityRegime>,
}

/// Observable summary of the posterior
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BocpeSnapshot {
    pub t: u64,
    pub cp_prob: f64,
    pub map_run_length: usize,
    pub posterior_peak_prob: f64,
    pub current_regime: Option<VolatilityRegime>,
}

/// BOCPE detector over a conjugate observation model
#[derive(Debug, Clone)]
pub struct Bocpe<M: ConjugateModel> {
    config: BocpeConfig,
    model: M,
    posterior: RunLengthPosterior<M::Params>,
    t: u64,
    cp_prob: f64,
    map_run_length: usize,
    current_regime: Option<VolatilityRegime>,
}

impl<M: ConjugateModel> Bocpe<M> {
    pub fn new(config: BocpeConfig, model: M) -> DetectorResult<Self> {
        config.validate()?;
        model.validate()?;

        let posterior = RunLengthPosterior::new(model.prior(), config.max_run_length);
        Ok(Self {
            config,
            model,
            posterior,
            t: 0,
            cp_prob: 0.0,
            map_run_length: 0,
            current_regime: None,
        })
    }

    /// Feed one observation
    ///
    /// On `NumericalInstability` the posterior and counters are left as
    /// they were before the call.
    pub fn update(&mut self, x: f64) -> DetectorResult<BocpeSignal> {
        self.posterior.update(&self.model, self.config.hazard, x)?;

        let new_map = self.posterior.map_run_length();
        let new_cp_prob = self.posterior.probs()[0];
        let map_dropped = self.t > 0 && new_map < self.map_run_length;
        let triggered = new_cp_prob >= self.config.threshold || map_dropped;

        self.current_regime = self.model.regime(&self.posterior.params()[new_map]);
        self.cp_prob = new_cp_prob;
        self.map_run_length = new_map;
        self.t += 1;

        Ok(BocpeSignal {
            triggered,
            regime: self.current_regime,
        })
    }

    pub fn state(&self) -> BocpeSnapshot {
        BocpeSnapshot {
            t: self.t,
            cp_prob: self.cp_prob,
            map_run_length: self.map_run_length,
            posterior_peak_prob: self.posterior.probs()[self.map_run_length],
            current_regime: self.current_regime,
        }
    }

    /// Current run-length distribution, index = run length
    pub fn run_length_probs(&self) -> &[f64] {
        self.posterior.probs()
    }

    pub fn config(&self) -> &BocpeConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Back to the single prior hypothesis
    pub fn reset(&mut self) {
        self.posterior.reset(self.model.prior());
        self.t = 0;
        self.cp_prob = 0.0;
        self.map_run_length = 0;
        self.current_regime = None;
    }
}

impl<M: ConjugateModel> AlarmSource for Bocpe<M> {
    fn source(&self) -> DetectorSource {
        DetectorSource::Bocpe
    }

    fn observe(&mut self, ret: &Return) -> DetectorResult<Option<Alarm>> {
        let signal = match self.update(ret.value) {
            Ok(signal) => signal,
            Err(e) => {
                warn!("BOCPE update failed at {}: {}", ret.timestamp, e);
                return Err(e);
            }
        };
        if !signal.triggered {
            return Ok(None);
        }

        let label = signal
            .regime
            .map(AlarmLabel::RegimeTag)
            .unwrap_or(AlarmLabel::ChangePoint);
        debug!(
            "BOCPE {} at {} (cp_prob={:.4}, map_run_length={})",
            label, ret.timestamp, self.cp_prob, self.map_run_length
        );
        Ok(Some(Alarm::new(ret.timestamp, DetectorSource::Bocpe, label)))
    }

    fn reset(&mut self) {
        Bocpe::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_detector(config: BocpeConfig) -> Bocpe<MeanShift> {
        Bocpe::new(config, MeanShift::default()).unwrap()
    }

    #[test]
    fn test_invalid_arguments_are_rejected() {
        let bad_configs = [
            BocpeConfig {
                hazard: 0.0,
                ..Default::default()
            },
            BocpeConfig {
                hazard: 1.0,
                ..Default::default()
            },
            BocpeConfig {
                threshold: 0.0,
                ..Default::default()
            },
            BocpeConfig {
                threshold: 1.0,
                ..Default::default()
            },
            BocpeConfig {
                max_run_length: Some(0),
                ..Default::default()
            },
        ];
        for config in bad_configs {
            let err = Bocpe::new(config, MeanShift::default()).unwrap_err();
            assert!(matches!(err, DetectorError::InvalidParameter { .. }));
        }

        let bad_models = [
            MeanShift {
                prior_precision: 0.0,
                ..Default::default()
            },
            MeanShift {
                obs_var: 0.0,
                ..Default::default()
            },
        ];
        for model in bad_models {
            let err = Bocpe::new(BocpeConfig::default(), model).unwrap_err();
            assert!(matches!(err, DetectorError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_stable_data_advances_without_triggering() {
        let mut detector = mean_detector(BocpeConfig {
            hazard: 0.05,
            threshold: 0.9,
            max_run_length: None,
        });

        let triggers: Vec<bool> = [0.01, -0.02, 0.01, 0.0]
            .iter()
            .map(|&x| detector.update(x).unwrap().triggered)
            .collect();
        let state = detector.state();

        assert_eq!(triggers, vec![false, false, false, false]);
        assert_eq!(state.t, 4);
        assert!((0.0..=1.0).contains(&state.cp_prob));
        assert!(state.posterior_peak_prob <= 1.0);
        assert_eq!(state.current_regime, None);
    }

    #[test]
    fn test_respects_max_run_length_truncation() {
        let mut detector = mean_detector(BocpeConfig {
            hazard: 0.05,
            threshold: 0.99,
            max_run_length: Some(3),
        });

        for x in [0.1, 0.0, -0.1, 0.2, -0.2, 0.1] {
            detector.update(x).unwrap();
            assert!(detector.run_length_probs().len() <= 4);
        }

        let probs = detector.run_length_probs();
        assert_eq!(probs.len(), 4);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_distribution_stays_normalized() {
        let mut detector = mean_detector(BocpeConfig {
            hazard: 0.01,
            threshold: 0.5,
            max_run_length: Some(20),
        });

        for i in 0..200 {
            let magnitude = if i < 100 { 0.1 } else { 3.0 };
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            detector.update(magnitude * sign).unwrap();
            let total: f64 = detector.run_length_probs().iter().sum();
            assert!((total - 1.0).abs() < 1e-12, "step {i}: total {total}");
        }
    }

    #[test]
    fn test_mean_shift_is_detected() {
        let mut detector = mean_detector(BocpeConfig {
            hazard: 0.01,
            threshold: 0.5,
            max_run_length: Some(100),
        });

        for _ in 0..50 {
            detector.update(0.0).unwrap();
        }
        let fired = (0..10).any(|_| detector.update(6.0).unwrap().triggered);

        assert!(fired, "a 6-sigma level shift should trigger within 10 steps");
    }

    #[test]
    fn test_numerical_instability_is_surfaced() {
        let mut detector = Bocpe::new(
            BocpeConfig::default(),
            MeanShift {
                prior_mean: 0.0,
                prior_precision: 1e12,
                obs_var: 1e-12,
            },
        )
        .unwrap();
        detector.update(0.0).unwrap();

        let err = detector.update(1e6).unwrap_err();

        assert!(matches!(err, DetectorError::NumericalInstability(_)));
        assert_eq!(detector.state().t, 1);
    }

    #[test]
    fn test_variance_model_labels_regime() {
        let model = VarianceShift {
            prior_alpha: 2.0,
            prior_beta: 1e-6,
            vol_threshold: 1e-5,
        };
        let mut detector = Bocpe::new(
            BocpeConfig {
                hazard: 0.01,
                threshold: 0.5,
                max_run_length: Some(200),
            },
            model,
        )
        .unwrap();

        for i in 0..100 {
            let x = if i % 2 == 0 { 0.0005 } else { -0.0005 };
            detector.update(x).unwrap();
        }
        assert_eq!(detector.state().current_regime, Some(VolatilityRegime::Low));

        let mut saw_high = false;
        for i in 0..100 {
            let x = if i % 2 == 0 { 0.02 } else { -0.02 };
            let signal = detector.update(x).unwrap();
            saw_high |= signal.triggered && signal.regime == Some(VolatilityRegime::High);
        }
        assert!(saw_high);
        assert_eq!(detector.state().current_regime, Some(VolatilityRegime::High));
    }

    #[test]
    fn test_oversized_max_run_length_is_rejected() {
        let config = BocpeConfig {
            hazard: 0.01,
            threshold: 0.5,
            max_run_length: Some(usize::MAX),
        };
        let err = Bocpe::new(config, MeanShift::default()).unwrap_err();
        assert!(matches!(
            err,
            DetectorError::InvalidParameter {
                name: "max_run_length",
                ..
            }
        ));

        // Large but representable caps construct without reserving them
        let mut detector = mean_detector(BocpeConfig {
            max_run_length: Some(usize::MAX - 1),
            ..config
        });
        assert!(!detector.update(0.0).unwrap().triggered);
        assert_eq!(detector.config().max_run_length, Some(usize::MAX - 1));
    }

    #[test]
    fn test_change_point_mass_at_threshold_triggers() {
        let mut detector = mean_detector(BocpeConfig {
            hazard: 0.3,
            threshold: 0.3,
            max_run_length: None,
        });

        let signal = detector.update(0.0).unwrap();

        assert!(signal.triggered);
        assert!((detector.state().cp_prob - 0.3).abs() < 1e-12);
        assert_eq!(detector.state().map_run_length, 1);
        assert_eq!(detector.model(), &MeanShift::default());
    }

    #[test]
    fn test_first_update_never_triggers_on_run_length() {
        // P(r=0) = 0.45 stays under the threshold; MAP moves 0 -> 1
        let mut detector = mean_detector(BocpeConfig {
            hazard: 0.45,
            threshold: 0.9,
            max_run_length: None,
        });

        let signal = detector.update(0.0).unwrap();

        assert!(!signal.triggered);
        assert_eq!(detector.state().t, 1);

        // After a reset the first update is again exempt
        detector.reset();
        assert!(!detector.update(0.0).unwrap().triggered);
    }

    #[test]
    fn test_reset_restores_prior() {
        let mut detector = mean_detector(BocpeConfig::default());
        for x in [0.1, 0.2, 0.3] {
            detector.update(x).unwrap();
        }

        detector.reset();

        assert_eq!(detector.run_length_probs(), &[1.0]);
        assert_eq!(detector.state().t, 0);
    }
}
