use thiserror::Error;

use crate::values::{Price, Timestamp};

/// Input contract violations detected before any detector sees the data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Non-positive price {price} at {timestamp}")]
    NonPositivePrice { timestamp: Timestamp, price: Price },

    #[error("Price {price} at {timestamp} has no finite floating-point value")]
    UnrepresentablePrice { timestamp: Timestamp, price: Price },

    #[error("Non-positive dispersion {value} at {timestamp}")]
    NonPositiveDispersion { timestamp: Timestamp, value: f64 },
}
