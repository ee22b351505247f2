//! Volwatch Fusion Layer
//!
//! Pure, stateless reconciliation of completed detector outputs:
//!
//! 1. **Windowing**: high/low point alarms of one stream (Page-Hinkley,
//!    variance-model BOCPE) become high-volatility windows, expanded into
//!    in-session minutes.
//! 2. **Quorum**: CUSUM change points and both streams' minutes are pooled;
//!    any timestamp flagged by at least two distinct streams is promoted to
//!    a high-risk event.
//!
//! Fusion runs only after every detector finished its batch and never
//! touches detector internals, so repeated runs over the same inputs give
//! identical output.

pub mod quorum;
pub mod session;
pub mod windowing;

pub use quorum::{DEFAULT_QUORUM, high_risk_events, quorum_timestamps};
pub use session::TradingSession;
pub use windowing::{DetectorStream, flagged_minutes, high_volatility_minutes, regime_windows};

use log::info;
use serde::{Deserialize, Serialize};
use volwatch_core::{FlaggedMinute, HighRiskEvent, RegimeWindow};
use volwatch_ports::{DetectorError, DetectorResult};

/// Everything derived from one set of detector outputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionReport {
    pub regime_windows: Vec<RegimeWindow>,
    pub regime_minutes: Vec<FlaggedMinute>,
    pub bocpe_windows: Vec<RegimeWindow>,
    pub bocpe_minutes: Vec<FlaggedMinute>,
    pub high_risk: Vec<HighRiskEvent>,
}

/// Session calendar plus quorum size
#[derive(Debug, Clone, PartialEq)]
pub struct FusionLayer {
    session: TradingSession,
    quorum: usize,
}

impl Default for FusionLayer {
    fn default() -> Self {
        Self {
            session: TradingSession::default(),
            quorum: DEFAULT_QUORUM,
        }
    }
}

impl FusionLayer {
    /// Quorum must be between 1 and the number of pooled streams (3)
    pub fn new(session: TradingSession, quorum: usize) -> DetectorResult<Self> {
        session.validate()?;
        if !(1..=3).contains(&quorum) {
            return Err(DetectorError::invalid(
                "quorum",
                format!("{quorum} must be between 1 and 3"),
            ));
        }
        Ok(Self { session, quorum })
    }

    pub fn session(&self) -> &TradingSession {
        &self.session
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// Window both regime streams and run the quorum
    pub fn fuse(
        &self,
        cusum: &DetectorStream,
        regime: &DetectorStream,
        bocpe: &DetectorStream,
    ) -> FusionReport {
        let (regime_windows, regime_minutes) = high_volatility_minutes(regime, &self.session);
        let (bocpe_windows, bocpe_minutes) = high_volatility_minutes(bocpe, &self.session);

        let high_risk = high_risk_events(
            &cusum.alarms,
            &bocpe_minutes,
            &regime_minutes,
            self.quorum,
        );
        info!(
            "Fusion: {} change points, {} + {} high volatility minutes, {} high risk",
            cusum.alarms.len(),
            regime_minutes.len(),
            bocpe_minutes.len(),
            high_risk.len()
        );

        FusionReport {
            regime_windows,
            regime_minutes,
            bocpe_windows,
            bocpe_minutes,
            high_risk,
        }
    }
}
