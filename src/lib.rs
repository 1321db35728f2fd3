pub mod config;
pub mod data_models;
pub mod enricher;
pub mod enumerator;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod sanitizer;
pub mod sources;
pub mod tenure;
pub mod writer;

pub use error::HarvestError;
pub use pipeline::HarvestPipeline;
