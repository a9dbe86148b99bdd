pub mod data_loader;
pub mod errors;
pub mod export;
pub mod graph;
pub mod pipeline;
pub mod plan;
pub mod plan_execution;

pub use errors::{EtlError, EtlResult};
pub use plan::Plan;
pub use plan_execution::{run_etl, RunSummary};
