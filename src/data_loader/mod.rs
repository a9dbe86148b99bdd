//! Loader stage: reads the movies and credits CSV files, joins them on the
//! movie identifier and turns every joined row into a [`MovieRow`].
//!
//! Structural problems (missing files, no usable join key) abort the load.
//! Everything below that is absorbed: absent scalar columns are synthesized
//! with defaults, and embedded-collection cells that no decoder accepts
//! become empty lists with a warning.

pub mod embedded;
pub mod literal;

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::errors::{LoadError, LoadResult};
use crate::graph::{id_from_f64, EntityId, MovieRow};
use crate::plan::{JoinMode, LoadOptions};
use embedded::{decode_cell, is_null_marker, EMBEDDED_COLUMNS};

pub const JOIN_KEY: &str = "id";
pub const CREDITS_JOIN_KEY_ALIAS: &str = "movie_id";

pub const TEXT_COLUMNS: [&str; 3] = ["title", "release_date", "overview"];
pub const INTEGER_COLUMNS: [&str; 3] = ["budget", "revenue", "vote_count"];
pub const FLOAT_COLUMNS: [&str; 2] = ["popularity", "vote_average"];

/// A CSV source held in memory as named columns of raw cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnTable {
    name: String,
    columns: IndexMap<String, Vec<String>>,
    row_count: usize,
}

impl ColumnTable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn from_path(name: &str, path: &Path) -> LoadResult<Self> {
        if !path.exists() {
            return Err(LoadError::SourceNotFound {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path)?;
        Self::from_reader(name, path, file)
    }

    pub fn from_reader<R: Read>(name: &str, path: &Path, reader: R) -> LoadResult<Self> {
        let csv_error = |source: csv::Error| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        let mut row_count = 0;
        for result in reader.records() {
            let record = result.map_err(csv_error)?;
            for (i, column) in cells.iter_mut().enumerate() {
                column.push(record.get(i).unwrap_or_default().to_string());
            }
            row_count += 1;
        }

        let mut table = Self::new(name);
        for (header, column) in headers.into_iter().zip(cells) {
            if table.columns.contains_key(&header) {
                warn!("{}: duplicate column '{}', keeping the first", name, header);
                continue;
            }
            table.columns.insert(header, column);
        }
        table.row_count = row_count;
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn column(&self, column: &str) -> Option<&[String]> {
        self.columns.get(column).map(Vec::as_slice)
    }

    pub fn cell(&self, column: &str, row: usize) -> Option<&str> {
        self.columns
            .get(column)
            .and_then(|cells| cells.get(row))
            .map(String::as_str)
    }

    /// Rename a column in place, keeping its position
    pub fn rename_column(&mut self, from: &str, to: &str) {
        self.columns = std::mem::take(&mut self.columns)
            .into_iter()
            .map(|(name, cells)| {
                if name == from {
                    (to.to_string(), cells)
                } else {
                    (name, cells)
                }
            })
            .collect();
    }

    pub fn drop_column(&mut self, column: &str) -> Option<Vec<String>> {
        self.columns.shift_remove(column)
    }

    /// Add a column holding the same value in every row
    pub fn fill_column(&mut self, column: &str, value: &str) {
        self.columns
            .insert(column.to_string(), vec![value.to_string(); self.row_count]);
    }

    /// Keep only the first `n` rows
    pub fn truncate(&mut self, n: usize) {
        if n >= self.row_count {
            return;
        }
        for cells in self.columns.values_mut() {
            cells.truncate(n);
        }
        self.row_count = n;
    }

    fn parsed_keys(&self) -> LoadResult<Vec<EntityId>> {
        let cells = self.column(JOIN_KEY).ok_or_else(|| {
            LoadError::Schema(format!("{} has no '{}' column", self.name, JOIN_KEY))
        })?;
        cells
            .iter()
            .enumerate()
            .map(|(row, value)| {
                parse_id(value).ok_or_else(|| LoadError::InvalidJoinKey {
                    source_name: self.name.clone(),
                    row,
                    value: value.clone(),
                })
            })
            .collect()
    }
}

/// Result of the load stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedDataset {
    pub rows: Vec<MovieRow>,
    /// Human readable notes about absorbed problems (degraded cells, synthesized columns)
    pub warnings: Vec<String>,
    /// Number of embedded-collection cells that no decoder accepted
    pub degraded_cells: usize,
    /// Movie rows dropped by an inner join
    pub unmatched_movies: usize,
    /// Credits rows without a movie row
    pub unmatched_credits: usize,
}

/// Read, join and decode both sources
pub fn load_dataset(
    movies_path: &Path,
    credits_path: &Path,
    options: &LoadOptions,
) -> LoadResult<LoadedDataset> {
    // Fail on a missing file before reading either one
    for path in [movies_path, credits_path] {
        if !path.exists() {
            return Err(LoadError::SourceNotFound {
                path: PathBuf::from(path),
            });
        }
    }

    info!("Reading movies from {}", movies_path.display());
    let mut movies = ColumnTable::from_path("movies", movies_path)?;
    info!("Reading credits from {}", credits_path.display());
    let mut credits = ColumnTable::from_path("credits", credits_path)?;
    debug!("movies columns: {:?}", movies.headers());
    debug!("credits columns: {:?}", credits.headers());

    if let Some(sample_size) = options.sample_size {
        info!("Sampling the first {} movies", sample_size);
        movies.truncate(sample_size);
    }

    resolve_credits_join_key(&mut credits)?;
    let join = join_tables(&movies, &credits, options.join)?;
    let mut dataset = rows_from_table(join.table)?;
    dataset.unmatched_movies = join.unmatched_movies;
    dataset.unmatched_credits = join.unmatched_credits;

    info!(
        "Loaded {} rows ({} degraded cells, {} warnings)",
        dataset.rows.len(),
        dataset.degraded_cells,
        dataset.warnings.len()
    );
    Ok(dataset)
}

/// Normalize the credits foreign key to `id`
pub fn resolve_credits_join_key(credits: &mut ColumnTable) -> LoadResult<()> {
    if credits.has_column(CREDITS_JOIN_KEY_ALIAS) {
        if credits.drop_column(JOIN_KEY).is_some() {
            warn!(
                "{} has both '{}' and '{}', joining on '{}'",
                credits.name(),
                CREDITS_JOIN_KEY_ALIAS,
                JOIN_KEY,
                CREDITS_JOIN_KEY_ALIAS
            );
        }
        debug!(
            "Renaming '{}' to '{}' in {}",
            CREDITS_JOIN_KEY_ALIAS,
            JOIN_KEY,
            credits.name()
        );
        credits.rename_column(CREDITS_JOIN_KEY_ALIAS, JOIN_KEY);
        Ok(())
    } else if credits.has_column(JOIN_KEY) {
        Ok(())
    } else {
        Err(LoadError::Schema(format!(
            "{} has neither '{}' nor '{}' column",
            credits.name(),
            JOIN_KEY,
            CREDITS_JOIN_KEY_ALIAS
        )))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub table: ColumnTable,
    pub unmatched_movies: usize,
    pub unmatched_credits: usize,
}

/// Join movies with credits on `id`.
///
/// Every movie row pairs with every credits row sharing its key, in movie
/// order and then credits order. Columns present in both tables keep the
/// movies value.
pub fn join_tables(
    movies: &ColumnTable,
    credits: &ColumnTable,
    mode: JoinMode,
) -> LoadResult<JoinOutcome> {
    let movie_keys = movies.parsed_keys()?;
    let credit_keys = credits.parsed_keys()?;

    let mut credits_by_key: HashMap<EntityId, Vec<usize>> = HashMap::new();
    for (row, key) in credit_keys.iter().enumerate() {
        credits_by_key.entry(*key).or_default().push(row);
    }

    let mut pairs: Vec<(usize, Option<usize>)> = Vec::with_capacity(movies.row_count());
    let mut unmatched_movies = 0;
    for (row, key) in movie_keys.iter().enumerate() {
        match credits_by_key.get(key) {
            Some(matches) => pairs.extend(matches.iter().map(|m| (row, Some(*m)))),
            None if mode == JoinMode::Left => pairs.push((row, None)),
            None => unmatched_movies += 1,
        }
    }

    let movie_key_set: HashSet<EntityId> = movie_keys.iter().copied().collect();
    let unmatched_credits = credit_keys
        .iter()
        .filter(|key| !movie_key_set.contains(key))
        .count();

    let mut table = ColumnTable::new("joined");
    table.row_count = pairs.len();
    for (name, cells) in &movies.columns {
        let joined = pairs.iter().map(|(m, _)| cells[*m].clone()).collect();
        table.columns.insert(name.clone(), joined);
    }
    for (name, cells) in &credits.columns {
        if name == JOIN_KEY {
            continue;
        }
        if movies.has_column(name) {
            debug!(
                "Column '{}' exists in both {} and {}, keeping the {} value",
                name,
                movies.name(),
                credits.name(),
                movies.name()
            );
            continue;
        }
        let joined = pairs
            .iter()
            .map(|(_, c)| c.map(|c| cells[c].clone()).unwrap_or_default())
            .collect();
        table.columns.insert(name.clone(), joined);
    }

    if unmatched_movies > 0 {
        warn!(
            "Inner join dropped {} movie rows without credits",
            unmatched_movies
        );
    }
    if unmatched_credits > 0 {
        warn!(
            "{} credits rows have no matching movie and were dropped",
            unmatched_credits
        );
    }
    info!(
        "Joined {} movies with {} credits into {} rows ({:?} join)",
        movies.row_count(),
        credits.row_count(),
        table.row_count(),
        mode
    );

    Ok(JoinOutcome {
        table,
        unmatched_movies,
        unmatched_credits,
    })
}

/// Synthesize any required column the joined table lacks
pub fn ensure_required_columns(table: &mut ColumnTable, warnings: &mut Vec<String>) {
    let defaults = TEXT_COLUMNS
        .iter()
        .map(|c| (*c, ""))
        .chain(INTEGER_COLUMNS.iter().map(|c| (*c, "0")))
        .chain(FLOAT_COLUMNS.iter().map(|c| (*c, "0")))
        .chain(EMBEDDED_COLUMNS.iter().map(|c| (*c, "[]")));

    for (column, default) in defaults {
        if !table.has_column(column) {
            let message = format!("Column '{}' is missing, filled with {:?}", column, default);
            warn!("{}", message);
            warnings.push(message);
            table.fill_column(column, default);
        }
    }
}

/// Convert the joined table into typed rows, decoding embedded collections
pub fn rows_from_table(mut table: ColumnTable) -> LoadResult<LoadedDataset> {
    let mut dataset = LoadedDataset::default();
    ensure_required_columns(&mut table, &mut dataset.warnings);
    let keys = table.parsed_keys()?;

    for (row, id) in keys.into_iter().enumerate() {
        let mut cell_warnings = Vec::new();
        let text = |column: &str| table.cell(column, row).unwrap_or_default().to_string();
        let mut integer = |column: &str| {
            let raw = table.cell(column, row).unwrap_or_default();
            parse_integer_cell(raw).unwrap_or_else(|| {
                cell_warnings.push(format!(
                    "Row {} (movie {}): '{}' value {:?} is not an integer, using 0",
                    row, id, column, raw
                ));
                0
            })
        };
        let budget = integer("budget");
        let revenue = integer("revenue");
        let vote_count = integer("vote_count");
        let mut float = |column: &str| {
            let raw = table.cell(column, row).unwrap_or_default();
            parse_float_cell(raw).unwrap_or_else(|| {
                cell_warnings.push(format!(
                    "Row {} (movie {}): '{}' value {:?} is not a number, using 0",
                    row, id, column, raw
                ));
                0.0
            })
        };
        let popularity = float("popularity");
        let vote_average = float("vote_average");

        let mut embedded = |column: &str| {
            let raw = table.cell(column, row).unwrap_or_default();
            let decoded = decode_cell(raw);
            if decoded.is_degraded() {
                dataset.degraded_cells += 1;
                cell_warnings.push(format!(
                    "Row {} (movie {}): could not parse '{}', using an empty list",
                    row, id, column
                ));
            }
            decoded.into_entries()
        };
        let genres = embedded("genres");
        let keywords = embedded("keywords");
        let production_companies = embedded("production_companies");
        let cast = embedded("cast");
        let crew = embedded("crew");

        for message in cell_warnings {
            warn!("{}", message);
            dataset.warnings.push(message);
        }

        dataset.rows.push(MovieRow {
            id,
            title: text("title"),
            release_date: text("release_date"),
            budget,
            revenue,
            popularity,
            vote_average,
            vote_count,
            overview: text("overview"),
            genres,
            keywords,
            production_companies,
            cast,
            crew,
        });
    }

    Ok(dataset)
}

/// Parse an identifier, accepting integral floats such as `"19995.0"`
pub fn parse_id(raw: &str) -> Option<EntityId> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().and_then(id_from_f64))
}

fn parse_integer_cell(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if is_null_marker(raw) {
        return Some(0);
    }
    parse_id(raw)
}

fn parse_float_cell(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if is_null_marker(raw) {
        return Some(0.0);
    }
    raw.parse::<f64>().ok().filter(|f| f.is_finite())
}
