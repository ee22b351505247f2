//! Observations and the log-return transform
//!
//! Every detector consumes log returns `r_t = ln(p_t / p_{t-1})`. The first
//! observation of a series produces no return.

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::values::{Price, Timestamp};

/// A single (timestamp, price) observation from the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: Timestamp,
    pub price: Price,
}

impl Observation {
    pub fn new(timestamp: Timestamp, price: Price) -> Self {
        Self { timestamp, price }
    }

    /// Price as a strictly positive, finite float
    fn positive_price(&self) -> Result<f64, InputError> {
        if self.price <= Price::ZERO {
            return Err(InputError::NonPositivePrice {
                timestamp: self.timestamp,
                price: self.price,
            });
        }
        match self.price.to_f64() {
            Some(p) if p.is_finite() && p > 0.0 => Ok(p),
            _ => Err(InputError::UnrepresentablePrice {
                timestamp: self.timestamp,
                price: self.price,
            }),
        }
    }
}

/// Log return stamped with the timestamp of the later observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Return {
    pub timestamp: Timestamp,
    pub value: f64,
}

impl Return {
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Compute one log return per consecutive observation pair
///
/// Fails on the first non-positive (or unrepresentable) price; nothing
/// downstream ever sees an undefined logarithm.
pub fn log_returns(observations: &[Observation]) -> Result<Vec<Return>, InputError> {
    let Some(first) = observations.first() else {
        return Ok(Vec::new());
    };

    let mut prev = first.positive_price()?;
    let mut returns = Vec::with_capacity(observations.len().saturating_sub(1));

    for obs in &observations[1..] {
        let price = obs.positive_price()?;
        returns.push(Return::new(obs.timestamp, (price / prev).ln()));
        prev = price;
    }

    Ok(returns)
}

/// Observation sequence sorted ascending by timestamp
///
/// Sorting is stable; duplicate timestamps are kept in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationSeries {
    observations: Vec<Observation>,
}

impl ObservationSeries {
    pub fn from_unsorted(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        Self { observations }
    }

    pub fn as_slice(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.observations.last().map(|o| o.timestamp)
    }

    pub fn returns(&self) -> Result<Vec<Return>, InputError> {
        log_returns(&self.observations)
    }
}
