pub mod enrich;
pub mod filter;
pub mod persist;
pub mod pipeline;

pub use enrich::{enrich, enrich_at};
pub use filter::{filter, FilterOptions};
pub use persist::persist;
pub use pipeline::{Pipeline, PipelineConfig, RunSummary};
