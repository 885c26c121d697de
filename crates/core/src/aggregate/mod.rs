//! Landscape summaries built from fires and spread vectors

pub mod probability;
pub mod shed;

pub use probability::{
    burn_probability, ignition_probability, source_sink_ratio, BurnProbabilityOptions, HexProbability,
    ProbabilityRun, SourceSinkRow,
};
pub use shed::{fireplain, fireshed, AreaOfConcernOptions, Shed};
