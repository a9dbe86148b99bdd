//! ## Structure
//! This module contains the data structures for the plan file that drives a run.
//!
//! ```text
//! Plan
//!   ├── input_dir: PathBuf
//!   ├── output_dir: PathBuf
//!   ├── movies_file: String
//!   ├── credits_file: String
//!   ├── join: JoinMode
//!   │   ├── Inner
//!   │   └── Left
//!   ├── cast_limit: usize
//!   ├── director_job: String
//!   └── sample_size: Option<usize>
//! ```
//!
//! Every field has a default, so an empty YAML document is a valid plan.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MOVIES_FILE: &str = "tmdb_5000_movies.csv";
pub const DEFAULT_CREDITS_FILE: &str = "tmdb_5000_credits.csv";
pub const DEFAULT_CAST_LIMIT: usize = 10;
pub const DEFAULT_DIRECTOR_JOB: &str = "Director";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Plan {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub movies_file: String,
    pub credits_file: String,
    pub join: JoinMode,
    pub cast_limit: usize,
    pub director_job: String,
    pub sample_size: Option<usize>,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/raw"),
            output_dir: PathBuf::from("data/processed"),
            movies_file: DEFAULT_MOVIES_FILE.to_string(),
            credits_file: DEFAULT_CREDITS_FILE.to_string(),
            join: JoinMode::default(),
            cast_limit: DEFAULT_CAST_LIMIT,
            director_job: DEFAULT_DIRECTOR_JOB.to_string(),
            sample_size: None,
        }
    }
}

impl Plan {
    pub fn movies_path(&self) -> PathBuf {
        self.input_dir.join(&self.movies_file)
    }

    pub fn credits_path(&self) -> PathBuf {
        self.input_dir.join(&self.credits_file)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            join: self.join,
            sample_size: self.sample_size,
        }
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            cast_limit: self.cast_limit,
            director_job: self.director_job.clone(),
        }
    }

    /// Rebase relative directories onto the directory holding the plan file
    pub fn resolve_relative_to(mut self, plan_file_path: &Path) -> Self {
        let base = plan_file_path.parent().unwrap_or(Path::new(""));
        if self.input_dir.is_relative() {
            self.input_dir = base.join(&self.input_dir);
        }
        if self.output_dir.is_relative() {
            self.output_dir = base.join(&self.output_dir);
        }
        self
    }
}

/// How movie rows without a credits counterpart are treated
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum JoinMode {
    /// Drop movie rows with no credits row, and credits rows with no movie row
    #[default]
    Inner,
    /// Keep every movie row; missing credits become empty cast and crew
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadOptions {
    pub join: JoinMode,
    /// Only the first N rows of the movies table take part in the join
    pub sample_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    /// Number of billed cast entries per movie that become ACTED_IN edges
    pub cast_limit: usize,
    /// Crew job that selects DIRECTED edges, matched exactly
    pub director_job: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            cast_limit: DEFAULT_CAST_LIMIT,
            director_job: DEFAULT_DIRECTOR_JOB.to_string(),
        }
    }
}
