use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source identifier shared by every entity type (TMDB ids are integers)
pub type EntityId = i64;

/// Read an integral float as an identifier; fractional or out-of-range values yield `None`
pub fn id_from_f64(value: f64) -> Option<EntityId> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if value.is_finite()
        && value.fract() == 0.0
        && value >= i64::MIN as f64
        && value < i64::MAX as f64
    {
        Some(value as EntityId)
    } else {
        None
    }
}

/// One attribute mapping inside an embedded collection, e.g. `{"id": 28, "name": "Action"}`
pub type Entry = Map<String, Value>;

/// One joined movie record as handed from the loader to the transformer
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MovieRow {
    pub id: EntityId,
    pub title: String,
    pub release_date: String,
    pub budget: i64,
    pub revenue: i64,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i64,
    pub overview: String,
    pub genres: Vec<Entry>,
    pub keywords: Vec<Entry>,
    pub production_companies: Vec<Entry>,
    pub cast: Vec<Entry>,
    pub crew: Vec<Entry>,
}

/// A record that is written as one line of a graph import file
pub trait GraphRecord {
    /// Collection name, also the output file stem
    const COLLECTION: &'static str;
    /// Column order of the output file
    const HEADERS: &'static [&'static str];

    fn to_record(&self) -> Vec<String>;
}

/// A node record deduplicated by its source identifier
pub trait Entity {
    fn id(&self) -> EntityId;
}

// pandas writes floats as Python's repr: Debug formatting, except exponents
// carry a sign and at least two digits ("1e-07", "1e+16")
fn format_float(value: f64) -> String {
    let repr = format!("{:?}", value);
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}

//
// Nodes
//

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Movie {
    pub id: EntityId,
    pub title: String,
    pub release_date: String,
    pub budget: i64,
    pub revenue: i64,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i64,
    pub overview: String,
}

impl From<&MovieRow> for Movie {
    fn from(row: &MovieRow) -> Self {
        Self {
            id: row.id,
            title: row.title.clone(),
            release_date: row.release_date.clone(),
            budget: row.budget,
            revenue: row.revenue,
            popularity: row.popularity,
            vote_average: row.vote_average,
            vote_count: row.vote_count,
            overview: row.overview.clone(),
        }
    }
}

impl GraphRecord for Movie {
    const COLLECTION: &'static str = "movies";
    const HEADERS: &'static [&'static str] = &[
        "id",
        "title",
        "release_date",
        "budget",
        "revenue",
        "popularity",
        "vote_average",
        "vote_count",
        "overview",
    ];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.release_date.clone(),
            self.budget.to_string(),
            self.revenue.to_string(),
            format_float(self.popularity),
            format_float(self.vote_average),
            self.vote_count.to_string(),
            self.overview.clone(),
        ]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Person {
    pub id: EntityId,
    pub name: String,
    /// 0 unknown, 1 female, 2 male
    pub gender: i64,
    pub profile_path: String,
}

impl Entity for Person {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl GraphRecord for Person {
    const COLLECTION: &'static str = "persons";
    const HEADERS: &'static [&'static str] = &["id", "name", "gender", "profile_path"];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.gender.to_string(),
            self.profile_path.clone(),
        ]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Genre {
    pub id: EntityId,
    pub name: String,
}

impl Entity for Genre {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl GraphRecord for Genre {
    const COLLECTION: &'static str = "genres";
    const HEADERS: &'static [&'static str] = &["id", "name"];

    fn to_record(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone()]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Keyword {
    pub id: EntityId,
    pub name: String,
}

impl Entity for Keyword {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl GraphRecord for Keyword {
    const COLLECTION: &'static str = "keywords";
    const HEADERS: &'static [&'static str] = &["id", "name"];

    fn to_record(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone()]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Company {
    pub id: EntityId,
    pub name: String,
    pub origin_country: String,
}

impl Entity for Company {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl GraphRecord for Company {
    const COLLECTION: &'static str = "companies";
    const HEADERS: &'static [&'static str] = &["id", "name", "origin_country"];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.origin_country.clone(),
        ]
    }
}

//
// Relationships
//

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ActedIn {
    pub person_id: EntityId,
    pub movie_id: EntityId,
    pub character: String,
    /// Zero-based billing position within the movie's truncated cast
    pub order: usize,
}

impl GraphRecord for ActedIn {
    const COLLECTION: &'static str = "acted_in";
    const HEADERS: &'static [&'static str] = &["person_id", "movie_id", "character", "order"];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.person_id.to_string(),
            self.movie_id.to_string(),
            self.character.clone(),
            self.order.to_string(),
        ]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Directed {
    pub person_id: EntityId,
    pub movie_id: EntityId,
    pub job: String,
    pub department: String,
}

impl GraphRecord for Directed {
    const COLLECTION: &'static str = "directed";
    const HEADERS: &'static [&'static str] = &["person_id", "movie_id", "job", "department"];

    fn to_record(&self) -> Vec<String> {
        vec![
            self.person_id.to_string(),
            self.movie_id.to_string(),
            self.job.clone(),
            self.department.clone(),
        ]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Produced {
    pub movie_id: EntityId,
    pub company_id: EntityId,
}

impl GraphRecord for Produced {
    const COLLECTION: &'static str = "produced";
    const HEADERS: &'static [&'static str] = &["movie_id", "company_id"];

    fn to_record(&self) -> Vec<String> {
        vec![self.movie_id.to_string(), self.company_id.to_string()]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CategorizedAs {
    pub movie_id: EntityId,
    pub genre_id: EntityId,
}

impl GraphRecord for CategorizedAs {
    const COLLECTION: &'static str = "categorized_as";
    const HEADERS: &'static [&'static str] = &["movie_id", "genre_id"];

    fn to_record(&self) -> Vec<String> {
        vec![self.movie_id.to_string(), self.genre_id.to_string()]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TaggedWith {
    pub movie_id: EntityId,
    pub keyword_id: EntityId,
}

impl GraphRecord for TaggedWith {
    const COLLECTION: &'static str = "tagged_with";
    const HEADERS: &'static [&'static str] = &["movie_id", "keyword_id"];

    fn to_record(&self) -> Vec<String> {
        vec![self.movie_id.to_string(), self.keyword_id.to_string()]
    }
}

/// Entities keyed by identifier.
///
/// Iteration follows first insertion of each identifier, while the stored
/// attributes are those of the most recent upsert.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityCollection<T> {
    entries: IndexMap<EntityId, T>,
}

impl<T> Default for EntityCollection<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<T: Entity> EntityCollection<T> {
    /// Insert or overwrite; returns true when the identifier was new
    pub fn upsert(&mut self, entity: T) -> bool {
        // IndexMap::insert keeps the existing slot when the key is present
        self.entries.insert(entity.id(), entity).is_none()
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Nodes {
    pub movies: Vec<Movie>,
    pub persons: EntityCollection<Person>,
    pub genres: EntityCollection<Genre>,
    pub keywords: EntityCollection<Keyword>,
    pub companies: EntityCollection<Company>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Relationships {
    pub acted_in: Vec<ActedIn>,
    pub directed: Vec<Directed>,
    pub produced: Vec<Produced>,
    pub categorized_as: Vec<CategorizedAs>,
    pub tagged_with: Vec<TaggedWith>,
}

/// The complete transformer output: five node and five relationship collections
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieGraph {
    pub nodes: Nodes,
    pub relationships: Relationships,
}

impl MovieGraph {
    /// Record count per collection, in output file order
    pub fn stats(&self) -> IndexMap<&'static str, usize> {
        let mut stats = IndexMap::new();
        stats.insert(Movie::COLLECTION, self.nodes.movies.len());
        stats.insert(Person::COLLECTION, self.nodes.persons.len());
        stats.insert(Genre::COLLECTION, self.nodes.genres.len());
        stats.insert(Keyword::COLLECTION, self.nodes.keywords.len());
        stats.insert(Company::COLLECTION, self.nodes.companies.len());
        stats.insert(ActedIn::COLLECTION, self.relationships.acted_in.len());
        stats.insert(Directed::COLLECTION, self.relationships.directed.len());
        stats.insert(Produced::COLLECTION, self.relationships.produced.len());
        stats.insert(
            CategorizedAs::COLLECTION,
            self.relationships.categorized_as.len(),
        );
        stats.insert(TaggedWith::COLLECTION, self.relationships.tagged_with.len());
        stats
    }
}
