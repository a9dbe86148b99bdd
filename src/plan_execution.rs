use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::data_loader;
use crate::errors::EtlResult;
use crate::export::{self, WrittenFile};
use crate::pipeline::Transformer;
use crate::plan::Plan;

/// What a completed run produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub rows_loaded: usize,
    pub degraded_cells: usize,
    pub unmatched_movies: usize,
    pub unmatched_credits: usize,
    pub warnings: Vec<String>,
    /// Record count per collection, in output file order
    pub collections: IndexMap<&'static str, usize>,
    pub files: Vec<WrittenFile>,
}

/// Load, transform and write in one blocking call
pub fn run_etl(plan: &Plan) -> EtlResult<RunSummary> {
    info!("Starting ETL process");

    info!("Loading data...");
    let dataset = data_loader::load_dataset(
        &plan.movies_path(),
        &plan.credits_path(),
        &plan.load_options(),
    )?;

    info!("Transforming data...");
    let graph = Transformer::new(plan.transform_options()).transform(&dataset.rows)?;

    info!("Writing data...");
    let files = export::write_graph(&graph, &plan.output_dir)?;

    if !dataset.warnings.is_empty() {
        warn!(
            "Run finished with {} warnings; see above for details",
            dataset.warnings.len()
        );
    }
    info!(
        "ETL process completed: {} files written to {}",
        files.len(),
        plan.output_dir.display()
    );

    Ok(RunSummary {
        rows_loaded: dataset.rows.len(),
        degraded_cells: dataset.degraded_cells,
        unmatched_movies: dataset.unmatched_movies,
        unmatched_credits: dataset.unmatched_credits,
        warnings: dataset.warnings,
        collections: graph.stats(),
        files,
    })
}

/// Read a plan file; relative directories resolve against the file's location
pub fn load_plan(plan_file_path: &Path) -> Result<Plan> {
    let content = fs::read_to_string(plan_file_path)
        .with_context(|| format!("Failed to read plan file {}", plan_file_path.display()))?;
    let plan: Plan = serde_yaml::from_str(&content)
        .map_err(|e| anyhow!("Invalid plan file {}: {}", plan_file_path.display(), e))?;
    Ok(plan.resolve_relative_to(plan_file_path))
}

/// Write a plan file holding the defaults
pub fn init_plan(plan_file_path: &Path) -> Result<()> {
    if plan_file_path.exists() {
        return Err(anyhow!(
            "Refusing to overwrite existing plan file {}",
            plan_file_path.display()
        ));
    }
    if let Some(parent) = plan_file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let serialized_plan = serde_yaml::to_string(&Plan::default())?;
    fs::write(plan_file_path, serialized_plan)?;
    info!("Wrote default plan to {}", plan_file_path.display());
    Ok(())
}
