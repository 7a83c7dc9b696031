//! Wire-level protocol shared with the rest of the mining stack
//!
//! Topic names, payload grammars, and the algorithm name table.

pub mod algorithm;
pub mod decoder;
pub mod topics;

pub use algorithm::{AlgorithmLookup, DagAlgo, KnownAlgorithms, UnknownAlgorithm};
pub use decoder::{DecodeError, TopicDecoder, Update};
pub use topics::*;
