//! Volwatch Streaming Detectors
//!
//! Three independent online detectors, each owning its private state and
//! updated once per incoming value in timestamp order:
//!
//! - [`CusumDetector`]: two-sided cumulative sum for sustained mean shifts
//! - [`RegimeDetector`]: Page-Hinkley style likelihood-ratio test on rolling
//!   return dispersion ("high" / "low" volatility regimes)
//! - [`Bocpe`]: Bayesian online change point estimation with mean-shift and
//!   variance-shift observation models
//!
//! All three implement [`volwatch_ports::AlarmSource`] so a batch driver can
//! run them side by side over the same return sequence.
//!
//! ```text
//!                 returns
//!       ┌────────────┼─────────────┐
//!       ▼            ▼             ▼
//!    CUSUM     rolling std(30)   BOCPE
//!       │            ▼             │
//!       │      Page-Hinkley        │
//!       ▼            ▼             ▼
//!  change_point   high/low    change_point | High/Low Volatility
//! ```

pub mod bocpe;
pub mod cusum;
pub mod regime;

pub use bocpe::{
    Bocpe, BocpeConfig, BocpeSignal, BocpeSnapshot, ConjugateModel, GammaPrecision, GaussianMean,
    MeanShift, VarianceShift,
};
pub use cusum::{CusumConfig, CusumDetector, CusumState};
pub use regime::{
    DECISION_THRESHOLD, DISPERSION_WINDOW, RegimeDetector, RegimeSignal, RegimeState,
    VolatilityCalibration, VolatilityLikelihood, VolatilityRegimeStream,
};
