//! Harvest module - bounded-concurrency place/channel expansion.
//!
//! - **Row building**: [`row::build_row`] flattens a place, a channel and its
//!   resolved stream into one [`OutputRow`](crate::model::OutputRow)
//! - **Pipeline**: [`pipeline::HarvestPipeline`] fans out one unit per place
//!   and merges the results

pub mod pipeline;
pub mod row;

pub use pipeline::{HarvestPipeline, HarvestResult, HarvestStats, PipelineError, PlaceSelection};
pub use row::{build_row, channel_id_from_url, RowError};
