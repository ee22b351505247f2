//! Conjugate observation models for BOCPE
//!
//! Each run-length hypothesis carries its own posterior parameters. A model
//! knows its prior, its one-observation posterior update, and the
//! predictive density of the next observation.

use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;
use std::f64::consts::PI;
use std::fmt::Debug;
use volwatch_core::VolatilityRegime;
use volwatch_ports::{DetectorError, DetectorResult};

/// Conjugate prior/likelihood pair driving the run-length recursion
pub trait ConjugateModel: Clone + Send + Sync {
    /// Posterior parameters of a single run-length hypothesis
    type Params: Copy + Debug + Send + Sync;

    /// Reject parameters outside their documented domain
    fn validate(&self) -> DetectorResult<()>;

    /// Parameters of a run that has seen no observations
    fn prior(&self) -> Self::Params;

    /// Log predictive density of `x` under `params`
    fn log_predictive(&self, params: &Self::Params, x: f64) -> f64;

    /// Parameters after absorbing one more observation
    fn posterior(&self, params: &Self::Params, x: f64) -> Self::Params;

    /// Optional volatility label for a hypothesis
    fn regime(&self, _params: &Self::Params) -> Option<VolatilityRegime> {
        None
    }
}

/// Gaussian posterior over the mean
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianMean {
    pub mean: f64,
    pub precision: f64,
}

/// Mean shifts with known observation variance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanShift {
    pub prior_mean: f64,
    pub prior_precision: f64,
    pub obs_var: f64,
}

impl Default for MeanShift {
    fn default() -> Self {
        Self {
            prior_mean: 0.0,
            prior_precision: 1.0,
            obs_var: 1.0,
        }
    }
}

impl ConjugateModel for MeanShift {
    type Params = GaussianMean;

    fn validate(&self) -> DetectorResult<()> {
        if !self.prior_mean.is_finite() {
            return Err(DetectorError::invalid(
                "prior_mean",
                format!("{} is not finite", self.prior_mean),
            ));
        }
        if !(self.prior_precision.is_finite() && self.prior_precision > 0.0) {
            return Err(DetectorError::invalid(
                "prior_precision",
                format!("{} must be positive", self.prior_precision),
            ));
        }
        if !(self.obs_var.is_finite() && self.obs_var > 0.0) {
            return Err(DetectorError::invalid(
                "obs_var",
                format!("{} must be positive", self.obs_var),
            ));
        }
        Ok(())
    }

    fn prior(&self) -> GaussianMean {
        GaussianMean {
            mean: self.prior_mean,
            precision: self.prior_precision,
        }
    }

    fn log_predictive(&self, params: &GaussianMean, x: f64) -> f64 {
        let var = self.obs_var + 1.0 / params.precision;
        let diff = x - params.mean;
        -0.5 * (2.0 * PI * var).ln() - 0.5 * diff * diff / var
    }

    fn posterior(&self, params: &GaussianMean, x: f64) -> GaussianMean {
        let obs_prec = 1.0 / self.obs_var;
        let precision = params.precision + obs_prec;
        GaussianMean {
            mean: (params.precision * params.mean + obs_prec * x) / precision,
            precision,
        }
    }
}

/// Gamma posterior over the precision of zero-mean returns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaPrecision {
    pub alpha: f64,
    pub beta: f64,
}

impl GammaPrecision {
    /// E[variance] = beta / (alpha - 1), finite while alpha > 1
    pub fn expected_variance(&self) -> f64 {
        self.beta / (self.alpha - 1.0)
    }
}

/// Variance shifts with unknown precision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceShift {
    pub prior_alpha: f64,
    pub prior_beta: f64,
    /// Expected variance above which a hypothesis is "High Volatility"
    pub vol_threshold: f64,
}

impl Default for VarianceShift {
    fn default() -> Self {
        Self {
            prior_alpha: 2.0,
            prior_beta: 1e-6,
            vol_threshold: 1e-6,
        }
    }
}

impl ConjugateModel for VarianceShift {
    type Params = GammaPrecision;

    fn validate(&self) -> DetectorResult<()> {
        if !(self.prior_alpha.is_finite() && self.prior_alpha > 1.0) {
            return Err(DetectorError::invalid(
                "prior_alpha",
                format!("{} must exceed 1 for a finite expected variance", self.prior_alpha),
            ));
        }
        if !(self.prior_beta.is_finite() && self.prior_beta > 0.0) {
            return Err(DetectorError::invalid(
                "prior_beta",
                format!("{} must be positive", self.prior_beta),
            ));
        }
        if !(self.vol_threshold.is_finite() && self.vol_threshold > 0.0) {
            return Err(DetectorError::invalid(
                "vol_threshold",
                format!("{} must be positive", self.vol_threshold),
            ));
        }
        Ok(())
    }

    fn prior(&self) -> GammaPrecision {
        GammaPrecision {
            alpha: self.prior_alpha,
            beta: self.prior_beta,
        }
    }

    /// Student-t predictive in closed form
    fn log_predictive(&self, params: &GammaPrecision, x: f64) -> f64 {
        let GammaPrecision { alpha, beta } = *params;
        ln_gamma(alpha + 0.5)
            - ln_gamma(alpha)
            - 0.5 * (2.0 * PI * beta).ln()
            - (alpha + 0.5) * (x * x / (2.0 * beta)).ln_1p()
    }

    fn posterior(&self, params: &GammaPrecision, x: f64) -> GammaPrecision {
        GammaPrecision {
            alpha: params.alpha + 0.5,
            beta: params.beta + 0.5 * x * x,
        }
    }

    fn regime(&self, params: &GammaPrecision) -> Option<VolatilityRegime> {
        if params.expected_variance() > self.vol_threshold {
            Some(VolatilityRegime::High)
        } else {
            Some(VolatilityRegime::Low)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_shift_predictive_matches_normal_pdf() {
        let model = MeanShift::default();
        let prior = model.prior();
        // Predictive variance = 1 + 1/1 = 2
        let expected = -0.5 * (2.0 * PI * 2.0).ln() - 0.25;
        assert_relative_eq!(model.log_predictive(&prior, 1.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_mean_shift_posterior_pulls_toward_observation() {
        let model = MeanShift::default();
        let post = model.posterior(&model.prior(), 2.0);
        assert_relative_eq!(post.precision, 2.0);
        assert_relative_eq!(post.mean, 1.0);
    }

    #[test]
    fn test_student_t_predictive_integrates_to_one() {
        let model = VarianceShift {
            prior_alpha: 3.0,
            prior_beta: 2.0,
            vol_threshold: 1.0,
        };
        let prior = model.prior();
        let dx = 0.001;
        let mass: f64 = (-100_000..=100_000)
            .map(|i| model.log_predictive(&prior, i as f64 * dx).exp() * dx)
            .sum();
        assert_relative_eq!(mass, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_variance_regime_classification() {
        let model = VarianceShift {
            prior_alpha: 2.0,
            prior_beta: 1.0,
            vol_threshold: 0.5,
        };
        // E[var] = 1 / (2 - 1) = 1 > 0.5
        assert_eq!(model.regime(&model.prior()), Some(VolatilityRegime::High));

        let calm = GammaPrecision {
            alpha: 11.0,
            beta: 1.0,
        };
        assert_eq!(model.regime(&calm), Some(VolatilityRegime::Low));
    }

    #[test]
    fn test_variance_model_validation() {
        let bad_alpha = VarianceShift {
            prior_alpha: 1.0,
            ..Default::default()
        };
        assert!(bad_alpha.validate().is_err());

        let bad_beta = VarianceShift {
            prior_beta: 0.0,
            ..Default::default()
        };
        assert!(bad_beta.validate().is_err());
    }
}
