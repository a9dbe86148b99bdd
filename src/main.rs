use anyhow::Result;
use clap::{Parser, Subcommand};
use movie_graph::plan::{JoinMode, Plan};
use movie_graph::plan_execution;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert the movies and credits CSV files into graph import files
    Run {
        /// Plan file; command line options override its values
        #[clap(short, long)]
        plan: Option<PathBuf>,
        /// Directory containing input files
        #[clap(short, long)]
        input: Option<PathBuf>,
        /// Directory to save output files
        #[clap(short, long)]
        output: Option<PathBuf>,
        /// Filename for movies data
        #[clap(long)]
        movies: Option<String>,
        /// Filename for credits data
        #[clap(long)]
        credits: Option<String>,
        #[clap(long, value_enum)]
        join: Option<JoinMode>,
        /// Only use the first N movies
        #[clap(long)]
        sample_size: Option<usize>,
        #[clap(long)]
        cast_limit: Option<usize>,
    },
    /// Write a plan file holding the default settings
    Init {
        #[clap(short, long)]
        plan: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    match args.command {
        Commands::Run {
            plan,
            input,
            output,
            movies,
            credits,
            join,
            sample_size,
            cast_limit,
        } => {
            let mut plan = match plan {
                Some(path) => plan_execution::load_plan(&path)?,
                None => Plan::default(),
            };
            if let Some(input) = input {
                plan.input_dir = input;
            }
            if let Some(output) = output {
                plan.output_dir = output;
            }
            if let Some(movies) = movies {
                plan.movies_file = movies;
            }
            if let Some(credits) = credits {
                plan.credits_file = credits;
            }
            if let Some(join) = join {
                plan.join = join;
            }
            if sample_size.is_some() {
                plan.sample_size = sample_size;
            }
            if let Some(cast_limit) = cast_limit {
                plan.cast_limit = cast_limit;
            }

            match movie_graph::run_etl(&plan) {
                Ok(summary) => {
                    for (collection, count) in &summary.collections {
                        info!("- {}: {}", collection, count);
                    }
                }
                Err(e) => {
                    error!("ETL run failed ({}): {}", e.error_code(), e);
                    return Err(e.into());
                }
            }
        }
        Commands::Init { plan } => {
            info!("Initializing plan: {}", plan.display());
            plan_execution::init_plan(&plan)?;
        }
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level.as_str().to_ascii_lowercase()))
        .without_time()
        .init();
}
