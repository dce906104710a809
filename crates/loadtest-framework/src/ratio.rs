//! Operation kinds and weighted, clustered selection between them.

use crate::error::ConfigError;
use loadtest_generator::RunLength;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A named category of generated load, e.g. `read` or `write`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationKind(String);

impl OperationKind {
    /// Kind names are case-insensitive and stored lowercase.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn read() -> Self {
        Self::new("read")
    }

    pub fn write() -> Self {
        Self::new("write")
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable table of operation kinds with positive weights.
///
/// Kinds whose weight is absent, NaN or zero are "not requested" and are
/// never sampled.
#[derive(Debug, Clone)]
pub struct RatioTable {
    kinds: Vec<OperationKind>,
    weights: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl RatioTable {
    /// Build a table, failing if no kind ends up with a positive weight or
    /// if any weight is negative or infinite.
    pub fn new<I>(ratios: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (OperationKind, Option<f64>)>,
    {
        let mut entries: Vec<(OperationKind, f64)> = Vec::new();
        for (kind, weight) in ratios {
            let Some(weight) = weight else { continue };
            if weight.is_nan() || weight == 0.0 {
                continue;
            }
            if weight < 0.0 || weight.is_infinite() {
                return Err(ConfigError::InvalidWeight {
                    kind: kind.to_string(),
                    weight,
                });
            }
            match entries.iter_mut().find(|(k, _)| *k == kind) {
                Some(entry) => entry.1 = weight,
                None => entries.push((kind, weight)),
            }
        }

        if entries.is_empty() {
            return Err(ConfigError::EmptyRatioTable);
        }

        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let (kinds, weights): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        let index = WeightedIndex::new(&weights).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            kinds,
            weights,
            index,
        })
    }

    /// Kinds that can be sampled, in name order.
    pub fn kinds(&self) -> &[OperationKind] {
        &self.kinds
    }

    pub fn weight(&self, kind: &OperationKind) -> Option<f64> {
        self.position(kind).map(|i| self.weights[i])
    }

    /// Normalized probability of drawing `kind` in a single draw.
    pub fn probability(&self, kind: &OperationKind) -> f64 {
        let total: f64 = self.weights.iter().sum();
        self.weight(kind).map_or(0.0, |w| w / total)
    }


    /// Clustered draw: keeps returning the current kind until its run is
    /// used up, then draws a new kind and a new run length from `clustering`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        clustering: &RunLength,
        run: &mut ClusterRun,
    ) -> OperationKind {
        let current = match run.current {
            Some(i) if run.remaining > 0 => i,
            _ => {
                let i = self.draw(rng);
                run.current = Some(i);
                run.remaining = clustering.sample(rng).max(1);
                i
            }
        };
        run.remaining -= 1;
        self.kinds[current].clone()
    }

    /// One independent weighted draw, as an index into `kinds`.
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.index.sample(rng)
    }

    fn position(&self, kind: &OperationKind) -> Option<usize> {
        self.kinds.iter().position(|k| k == kind)
    }
}

/// Progress through the current run of a clustered sampler.
#[derive(Debug, Clone, Default)]
pub struct ClusterRun {
    current: Option<usize>,
    remaining: u64,
}

/// Chooses the operation kind for each generated row.
pub trait OpSelector: Send {
    fn next_kind(&mut self) -> OperationKind;
}

/// Clustered weighted selection over a shared `RatioTable`.
///
/// Each producer owns its own sampler; the table itself is shared read-only.
pub struct OpSampler {
    table: Arc<RatioTable>,
    clustering: RunLength,
    rng: StdRng,
    run: ClusterRun,
}

impl OpSampler {
    pub fn new(table: Arc<RatioTable>, clustering: RunLength, seed: u64) -> Self {
        Self {
            table,
            clustering,
            rng: StdRng::seed_from_u64(seed),
            run: ClusterRun::default(),
        }
    }
}

impl OpSelector for OpSampler {
    fn next_kind(&mut self) -> OperationKind {
        self.table
            .sample(&mut self.rng, &self.clustering, &mut self.run)
    }
}

/// Always selects the same kind (single-command runs).
pub struct FixedOpSelector(OperationKind);

impl FixedOpSelector {
    pub fn new(kind: OperationKind) -> Self {
        Self(kind)
    }
}

impl OpSelector for FixedOpSelector {
    fn next_kind(&mut self) -> OperationKind {
        self.0.clone()
    }
}
