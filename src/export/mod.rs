//! Writer stage: one CSV file per node and relationship collection.
//!
//! Every collection is written on every run, so an empty collection still
//! produces a header-only file. The first failure aborts the stage.

use csv::WriterBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::{ExportError, ExportResult};
use crate::graph::{
    ActedIn, CategorizedAs, Company, Directed, Genre, GraphRecord, Keyword, Movie, MovieGraph,
    Person, Produced, TaggedWith,
};

/// One file produced by [`write_graph`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub collection: &'static str,
    pub path: PathBuf,
    pub records: usize,
}

/// Path of a collection's file inside the output directory
pub fn collection_path<T: GraphRecord>(output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}.csv", T::COLLECTION))
}

/// Write all ten collections into `output_dir`, creating it when absent
pub fn write_graph(graph: &MovieGraph, output_dir: &Path) -> ExportResult<Vec<WrittenFile>> {
    info!("Writing graph files to {}", output_dir.display());
    fs::create_dir_all(output_dir).map_err(|source| ExportError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let nodes = &graph.nodes;
    let relationships = &graph.relationships;

    info!("Saving nodes...");
    let written = vec![
        write_collection::<Movie, _>(output_dir, &nodes.movies)?,
        write_collection::<Person, _>(output_dir, nodes.persons.iter())?,
        write_collection::<Genre, _>(output_dir, nodes.genres.iter())?,
        write_collection::<Keyword, _>(output_dir, nodes.keywords.iter())?,
        write_collection::<Company, _>(output_dir, nodes.companies.iter())?,
    ];

    info!("Saving relationships...");
    let written = written
        .into_iter()
        .chain([
            write_collection::<ActedIn, _>(output_dir, &relationships.acted_in)?,
            write_collection::<Directed, _>(output_dir, &relationships.directed)?,
            write_collection::<Produced, _>(output_dir, &relationships.produced)?,
            write_collection::<CategorizedAs, _>(output_dir, &relationships.categorized_as)?,
            write_collection::<TaggedWith, _>(output_dir, &relationships.tagged_with)?,
        ])
        .collect();

    Ok(written)
}

/// Write one collection with its header row, even when `items` is empty
pub fn write_collection<'a, T, I>(output_dir: &Path, items: I) -> ExportResult<WrittenFile>
where
    T: GraphRecord + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let path = collection_path::<T>(output_dir);
    let csv_error = |source: csv::Error| ExportError::Csv {
        path: path.clone(),
        source,
    };

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .map_err(csv_error)?;
    writer.write_record(T::HEADERS).map_err(csv_error)?;

    let mut records = 0;
    for item in items {
        writer.write_record(item.to_record()).map_err(csv_error)?;
        records += 1;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    debug!("Wrote {} {} to {}", records, T::COLLECTION, path.display());
    Ok(WrittenFile {
        collection: T::COLLECTION,
        path,
        records,
    })
}
