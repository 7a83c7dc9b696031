//! DAG algorithm identifiers and the name lookup used by the epoch decoder

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// DAG-based mining algorithms the daemon can generate caches for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DagAlgo {
    /// Reference algorithm, assumed when an epoch announcement names none
    #[default]
    Ethash,
    Etchash,
    Ubqhash,
}

impl DagAlgo {
    pub const ALL: [DagAlgo; 3] = [DagAlgo::Ethash, DagAlgo::Etchash, DagAlgo::Ubqhash];

    pub fn name(self) -> &'static str {
        match self {
            DagAlgo::Ethash => "ethash",
            DagAlgo::Etchash => "etchash",
            DagAlgo::Ubqhash => "ubqhash",
        }
    }
}

impl fmt::Display for DagAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown algorithm \"{0}\"")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for DagAlgo {
    type Err = UnknownAlgorithm;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|algo| algo.name() == name)
            .ok_or_else(|| UnknownAlgorithm(name.to_string()))
    }
}

/// Algorithm name to code lookup.
///
/// The epoch decoder only ever asks for names it received from the broker;
/// deployments with extra algorithms plug in their own table.
pub trait AlgorithmLookup: Send + Sync {
    fn code_for_name(&self, name: &str) -> Option<DagAlgo>;
}

/// Lookup over the built-in [`DagAlgo`] names (exact, case-sensitive)
#[derive(Debug, Clone, Copy, Default)]
pub struct KnownAlgorithms;

impl AlgorithmLookup for KnownAlgorithms {
    fn code_for_name(&self, name: &str) -> Option<DagAlgo> {
        name.parse().ok()
    }
}
