//! Volwatch Ports
//!
//! Port definitions (traits) and the error taxonomy shared by every
//! detector and by the batch driver.

mod detector;
mod error;

pub use detector::AlarmSource;
pub use error::{DetectorError, DetectorResult};
