//! Fixed-window rolling dispersion

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Rolling mean and sample standard deviation over the last `window_size` values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollingStd {
    /// Values in the window
    values: VecDeque<f64>,
    /// Window size
    window_size: usize,
    /// Running sum for O(1) mean updates
    sum: f64,
}

impl RollingStd {
    /// Create a new rolling calculator
    ///
    /// A sample deviation needs two values, so sizes below 2 are raised
    /// to 2; [`RollingStd::window_size`] reports the effective size.
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(2);
        Self {
            values: VecDeque::with_capacity(window_size),
            window_size,
            sum: 0.0,
        }
    }

    /// Add a value, evicting the oldest once the window is full
    #[inline]
    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.window_size {
            if let Some(removed) = self.values.pop_front() {
                self.sum -= removed;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    /// Push a value and return the window's standard deviation once full
    pub fn push_and_std(&mut self, value: f64) -> Option<f64> {
        self.push(value);
        if self.is_full() { self.std_dev() } else { None }
    }

    /// Current mean
    #[inline]
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.sum / self.values.len() as f64)
    }

    /// Sample variance (n - 1 denominator)
    pub fn variance(&self) -> Option<f64> {
        if self.values.len() < 2 {
            return None;
        }
        // Recompute the mean from the window; the running sum drifts.
        let n = self.values.len() as f64;
        let mean = self.values.iter().sum::<f64>() / n;
        let sum_sq_diff: f64 = self.values.iter().map(|&x| (x - mean) * (x - mean)).sum();
        Some(sum_sq_diff / (n - 1.0))
    }

    /// Sample standard deviation
    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check if window is full
    #[inline]
    pub fn is_full(&self) -> bool {
        self.values.len() >= self.window_size
    }

    /// Clear all values
    pub fn clear(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }

    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }
}
