use std::sync::Arc;

use rand::Rng;

use crate::config::EndpointSpec;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum Strategy {
    Uniform,
    Weighted { cumulative: Vec<u64>, total: u64 },
}

/// Picks the endpoint for each dispatched request.
///
/// Built once per run from the frozen config, so the total weight is computed
/// once rather than per draw.
#[derive(Debug, Clone)]
pub struct Selector {
    endpoints: Vec<Arc<EndpointSpec>>,
    strategy: Strategy,
}

impl Selector {
    pub fn new(endpoints: &[EndpointSpec], use_weights: bool) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }

        let strategy = if use_weights {
            if let Some(ep) = endpoints.iter().find(|ep| ep.weight == 0) {
                return Err(Error::InvalidWeight(ep.key().to_string()));
            }

            let mut total = 0u64;
            let cumulative = endpoints
                .iter()
                .map(|ep| {
                    total += u64::from(ep.weight);
                    total
                })
                .collect();
            Strategy::Weighted { cumulative, total }
        } else {
            Strategy::Uniform
        };

        Ok(Self {
            endpoints: endpoints.iter().cloned().map(Arc::new).collect(),
            strategy,
        })
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// `None` when selection is uniform.
    pub fn total_weight(&self) -> Option<u64> {
        match &self.strategy {
            Strategy::Uniform => None,
            Strategy::Weighted { total, .. } => Some(*total),
        }
    }

    pub fn select<R: Rng>(&self, rng: &mut R) -> &Arc<EndpointSpec> {
        let last = self.endpoints.len() - 1;
        let idx = match &self.strategy {
            Strategy::Uniform => rng.gen_range(0..self.endpoints.len()),
            Strategy::Weighted { cumulative, total } => {
                let r = rng.gen_range(0..*total);
                // First endpoint whose cumulative weight exceeds the draw.
                cumulative.iter().position(|&c| c > r).unwrap_or(last)
            }
        };
        &self.endpoints[idx]
    }
}
