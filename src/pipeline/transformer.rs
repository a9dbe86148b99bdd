use serde_json::Value;
use tracing::{debug, info};

use crate::errors::{TransformError, TransformResult};
use crate::graph::{
    id_from_f64, ActedIn, CategorizedAs, Company, Directed, EntityId, Entry, Genre, Keyword, Movie,
    MovieGraph, MovieRow, Person, Produced, TaggedWith,
};
use crate::plan::TransformOptions;

/// Builds the movie graph from loaded rows in a single ordered pass.
///
/// Entities are upserted by identifier, so the attributes of the last row
/// mentioning an identifier win while its position stays where it first
/// appeared. Relationship edges are never deduplicated.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    options: TransformOptions,
}

impl Transformer {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn transform(&self, rows: &[MovieRow]) -> TransformResult<MovieGraph> {
        info!("Transforming {} rows", rows.len());
        let mut graph = MovieGraph::default();
        for (index, row) in rows.iter().enumerate() {
            self.transform_row(&mut graph, index, row)?;
        }

        for (collection, count) in graph.stats() {
            info!("{}: {}", collection, count);
        }
        Ok(graph)
    }

    fn transform_row(
        &self,
        graph: &mut MovieGraph,
        index: usize,
        row: &MovieRow,
    ) -> TransformResult<()> {
        let movie_id = row.id;
        graph.nodes.movies.push(Movie::from(row));

        for entry in &row.genres {
            let entry = EntryReader::new(entry, index, movie_id, "genres");
            let genre_id = entry.id()?;
            graph.nodes.genres.upsert(Genre {
                id: genre_id,
                name: entry.text("name")?,
            });
            graph
                .relationships
                .categorized_as
                .push(CategorizedAs { movie_id, genre_id });
        }

        for entry in &row.keywords {
            let entry = EntryReader::new(entry, index, movie_id, "keywords");
            let keyword_id = entry.id()?;
            graph.nodes.keywords.upsert(Keyword {
                id: keyword_id,
                name: entry.text("name")?,
            });
            graph.relationships.tagged_with.push(TaggedWith {
                movie_id,
                keyword_id,
            });
        }

        for entry in &row.production_companies {
            let entry = EntryReader::new(entry, index, movie_id, "production_companies");
            let company_id = entry.id()?;
            graph.nodes.companies.upsert(Company {
                id: company_id,
                name: entry.text("name")?,
                origin_country: entry.optional_text("origin_country"),
            });
            graph.relationships.produced.push(Produced {
                movie_id,
                company_id,
            });
        }

        // Source order is billing order
        for (order, entry) in row.cast.iter().take(self.options.cast_limit).enumerate() {
            let entry = EntryReader::new(entry, index, movie_id, "cast");
            let person = entry.person()?;
            let person_id = person.id;
            let character = entry.text("character")?;
            graph.nodes.persons.upsert(person);
            graph.relationships.acted_in.push(ActedIn {
                person_id,
                movie_id,
                character,
                order,
            });
        }
        if row.cast.len() > self.options.cast_limit {
            debug!(
                "Movie {}: keeping {} of {} cast entries",
                movie_id,
                self.options.cast_limit,
                row.cast.len()
            );
        }

        for entry in &row.crew {
            let entry = EntryReader::new(entry, index, movie_id, "crew");
            let job = entry.text("job")?;
            if job != self.options.director_job {
                continue;
            }
            let person = entry.person()?;
            let person_id = person.id;
            let department = entry.text("department")?;
            graph.nodes.persons.upsert(person);
            graph.relationships.directed.push(Directed {
                person_id,
                movie_id,
                job,
                department,
            });
        }

        Ok(())
    }
}

/// Convenience wrapper running a [`Transformer`] with the given options
pub fn transform_data(rows: &[MovieRow], options: TransformOptions) -> TransformResult<MovieGraph> {
    Transformer::new(options).transform(rows)
}

/// Typed access to one nested entry, reporting contract violations with
/// the row and collection they occurred in
struct EntryReader<'a> {
    entry: &'a Entry,
    row: usize,
    movie_id: EntityId,
    collection: &'static str,
}

impl<'a> EntryReader<'a> {
    fn new(entry: &'a Entry, row: usize, movie_id: EntityId, collection: &'static str) -> Self {
        Self {
            entry,
            row,
            movie_id,
            collection,
        }
    }

    fn missing(&self, field: &'static str) -> TransformError {
        TransformError::FieldMissing {
            row: self.row,
            movie_id: self.movie_id,
            collection: self.collection,
            field,
        }
    }

    fn invalid(&self, field: &'static str, value: &Value, expected: &str) -> TransformError {
        TransformError::InvalidField {
            row: self.row,
            movie_id: self.movie_id,
            collection: self.collection,
            field,
            reason: format!("expected {}, found {}", expected, value),
        }
    }

    fn required(&self, field: &'static str) -> TransformResult<&'a Value> {
        self.entry.get(field).ok_or_else(|| self.missing(field))
    }

    fn id(&self) -> TransformResult<EntityId> {
        let value = self.required("id")?;
        as_integer(value).ok_or_else(|| self.invalid("id", value, "an integer identifier"))
    }

    /// A required key; `null` reads as an empty string
    fn text(&self, field: &'static str) -> TransformResult<String> {
        Ok(as_text(self.required(field)?))
    }

    fn optional_text(&self, field: &'static str) -> String {
        self.entry.get(field).map(as_text).unwrap_or_default()
    }

    fn optional_integer(&self, field: &'static str) -> TransformResult<i64> {
        match self.entry.get(field) {
            None | Some(Value::Null) => Ok(0),
            Some(value) => as_integer(value).ok_or_else(|| self.invalid(field, value, "an integer")),
        }
    }

    fn person(&self) -> TransformResult<Person> {
        Ok(Person {
            id: self.id()?,
            name: self.text("name")?,
            gender: self.optional_integer("gender")?,
            profile_path: self.optional_text("profile_path"),
        })
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(id_from_f64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
