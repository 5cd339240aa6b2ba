use serde::Serialize;
use std::collections::BTreeMap;

use super::{EnsembleError, ModelId};

/// Per-model coefficients of the ensemble's convex combination. Always sums to 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleWeights(BTreeMap<ModelId, f64>);

impl EnsembleWeights {
    pub fn equal<I>(members: I) -> Result<Self, EnsembleError>
    where
        I: IntoIterator<Item = ModelId>,
    {
        Self::normalized(members, &BTreeMap::new())
    }

    /// Validates `raw` against `members` and rescales it to sum to 1. Members without
    /// an entry get the equal-split share `1 / N` before rescaling.
    pub fn normalized<I>(members: I, raw: &BTreeMap<ModelId, f64>) -> Result<Self, EnsembleError>
    where
        I: IntoIterator<Item = ModelId>,
    {
        let members: Vec<ModelId> = members.into_iter().collect();
        if members.is_empty() {
            return Err(EnsembleError::NoModels);
        }

        if let Some(unknown) = raw.keys().find(|id| !members.contains(id)) {
            return Err(EnsembleError::UnknownModel(*unknown));
        }
        if let Some((id, value)) = raw.iter().find(|(_, v)| !v.is_finite() || **v < 0.0) {
            return Err(EnsembleError::InvalidWeight {
                id: *id,
                value: *value,
            });
        }

        let default_share = 1.0 / members.len() as f64;
        let filled: BTreeMap<ModelId, f64> = members
            .iter()
            .map(|id| (*id, raw.get(id).copied().unwrap_or(default_share)))
            .collect();

        // Entries are finite, so dividing by the largest keeps the sum finite.
        let largest = filled.values().copied().fold(0.0, f64::max);
        if largest <= 0.0 {
            return Err(EnsembleError::ZeroWeights);
        }
        let total: f64 = filled.values().map(|weight| weight / largest).sum();

        Ok(Self(
            filled
                .into_iter()
                .map(|(id, weight)| (id, weight / largest / total))
                .collect(),
        ))
    }

    pub fn get(&self, id: ModelId) -> f64 {
        self.0.get(&id).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelId, f64)> + '_ {
        self.0.iter().map(|(id, weight)| (*id, *weight))
    }

    pub fn as_map(&self) -> &BTreeMap<ModelId, f64> {
        &self.0
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}
