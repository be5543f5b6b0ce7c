pub mod client;
pub mod config;
pub mod executor;
pub mod harvest;
pub mod model;
pub mod server;
pub mod sink;
pub mod traits;

mod api;

// Re-export common types for convenience
pub use client::RadioGardenClient;
pub use executor::*;
pub use harvest::{HarvestPipeline, HarvestResult, HarvestStats, PipelineError, PlaceSelection};
pub use model::*;
pub use traits::*;
