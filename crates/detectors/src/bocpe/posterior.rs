//! Run-length posterior with bounded, double-buffered storage
//!
//! Index `l` holds hypothesis "run length = l". Storage is two pairs of
//! buffers allocated once at `max_run_length + 1` capacity; each update
//! writes the next distribution into the spare pair and swaps on success,
//! so a failed update leaves the current posterior untouched.

use volwatch_ports::{DetectorError, DetectorResult};

use super::model::ConjugateModel;

/// Hypotheses reserved up front; buffers grow from here towards the cap
const INITIAL_HYPOTHESES: usize = 256;

#[derive(Debug, Clone)]
pub(crate) struct RunLengthPosterior<P> {
    probs: Vec<f64>,
    params: Vec<P>,
    next_probs: Vec<f64>,
    next_params: Vec<P>,
    /// Maximum number of hypotheses kept, if bounded
    capacity: Option<usize>,
}

impl<P: Copy> RunLengthPosterior<P> {
    pub(crate) fn new(prior: P, max_run_length: Option<usize>) -> Self {
        let capacity = max_run_length.map(|n| n.saturating_add(1));
        let alloc = capacity.map_or(INITIAL_HYPOTHESES, |cap| cap.min(INITIAL_HYPOTHESES));
        let mut probs = Vec::with_capacity(alloc);
        let mut params = Vec::with_capacity(alloc);
        probs.push(1.0);
        params.push(prior);

        Self {
            probs,
            params,
            // One slot of headroom for the pre-truncation growth step
            next_probs: Vec::with_capacity(alloc + 1),
            next_params: Vec::with_capacity(alloc + 1),
            capacity,
        }
    }

    pub(crate) fn reset(&mut self, prior: P) {
        self.probs.clear();
        self.params.clear();
        self.probs.push(1.0);
        self.params.push(prior);
    }

    pub(crate) fn probs(&self) -> &[f64] {
        &self.probs
    }

    pub(crate) fn params(&self) -> &[P] {
        &self.params
    }

    /// One step of the run-length recursion
    pub(crate) fn update<M>(&mut self, model: &M, hazard: f64, x: f64) -> DetectorResult<()>
    where
        M: ConjugateModel<Params = P>,
    {
        self.next_probs.clear();
        self.next_params.clear();

        // Slot 0 ("just changed") is filled once all change-point mass is known
        self.next_probs.push(0.0);
        let mut cp_mass = 0.0;
        for (&p, params) in self.probs.iter().zip(&self.params) {
            let joint = p * model.log_predictive(params, x).exp();
            cp_mass += joint * hazard;
            self.next_probs.push(joint * (1.0 - hazard));
        }
        self.next_probs[0] = cp_mass;

        normalize(&mut self.next_probs, "evidence collapsed in run-length update")?;

        self.next_params.push(model.posterior(&model.prior(), x));
        self.next_params
            .extend(self.params.iter().map(|params| model.posterior(params, x)));

        if let Some(cap) = self.capacity {
            if self.next_probs.len() > cap {
                self.next_probs.truncate(cap);
                self.next_params.truncate(cap);
                normalize(&mut self.next_probs, "evidence collapsed after truncation")?;
            }
        }

        std::mem::swap(&mut self.probs, &mut self.next_probs);
        std::mem::swap(&mut self.params, &mut self.next_params);
        Ok(())
    }

    /// Most probable run length (first index on ties)
    pub(crate) fn map_run_length(&self) -> usize {
        let mut best = 0;
        for (idx, &p) in self.probs.iter().enumerate().skip(1) {
            if p > self.probs[best] {
                best = idx;
            }
        }
        best
    }
}

fn normalize(probs: &mut [f64], context: &str) -> DetectorResult<()> {
    let total: f64 = probs.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(DetectorError::NumericalInstability(format!(
            "{context} (total = {total})"
        )));
    }
    for p in probs.iter_mut() {
        *p /= total;
    }
    Ok(())
}
