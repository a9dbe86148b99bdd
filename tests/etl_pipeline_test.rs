use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use movie_graph::errors::{EtlError, LoadError};
use movie_graph::plan::{JoinMode, Plan};
use movie_graph::run_etl;

const MOVIE_HEADERS: [&str; 11] = [
    "budget",
    "genres",
    "id",
    "keywords",
    "overview",
    "popularity",
    "production_companies",
    "release_date",
    "revenue",
    "title",
    "vote_average",
];

fn write_csv(path: &Path, headers: &[&str], rows: &[Vec<&str>]) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(headers).unwrap();
    for row in rows {
        writer.write_record(row).unwrap();
    }
    writer.flush().unwrap();
}

/// Three movies; Spectre has no credits and an orphan credits row exists.
/// `vote_count` is deliberately absent from the movies file.
fn write_fixture(input_dir: &Path, credits_key: &str) {
    fs::create_dir_all(input_dir).unwrap();
    write_csv(
        &input_dir.join("movies.csv"),
        &MOVIE_HEADERS,
        &[
            vec![
                "237000000",
                r#"[{"id": 28, "name": "Action"}, {"id": 12, "name": "Adventure"}]"#,
                "19995",
                r#"[{"id": 1463, "name": "culture clash"}]"#,
                "In the 22nd century, a paraplegic Marine is dispatched to the moon Pandora.",
                "150.437577",
                r#"[{"name": "Ingenious Film Partners", "id": 289, "origin_country": "US"}]"#,
                "2009-12-10",
                "2787965087",
                "Avatar",
                "7.2",
            ],
            vec![
                "245000000",
                "[{'id': 28, 'name': 'Action'}]",
                "206647",
                "[]",
                "A cryptic message from Bond's past sends him on a trail.",
                "107.376788",
                "[{'name': 'Columbia Pictures', 'id': 5}]",
                "2015-10-26",
                "880674609",
                "Spectre",
                "6.3",
            ],
            vec![
                "260000000",
                "[{'id': 16, 'name': 'Animation'}, {'id': 28, 'name': 'Action (renamed)'}]",
                "38757",
                "[{'id': 1562, 'name': 'hostage'",
                "When the kingdom's most wanted bandit needs a hideout...",
                "48.681969",
                "[{'name': 'Walt Disney Pictures', 'id': 2}]",
                "2010-11-24",
                "591794296",
                "Tangled",
                "7.4",
            ],
        ],
    );

    let avatar_cast = r#"[{"cast_id": 242, "character": "Jake Sully", "gender": 2, "id": 65731, "name": "Sam Worthington", "order": 0},
 {"cast_id": 3, "character": "Neytiri", "gender": 1, "id": 8691, "name": "Zoe Saldana", "order": 1}]"#;
    let avatar_crew = r#"[{"department": "Directing", "gender": 2, "id": 2710, "job": "Director", "name": "James Cameron"},
 {"department": "Writing", "gender": 2, "id": 2710, "job": "Screenplay", "name": "James Cameron"},
 {"department": "Directing", "gender": 0, "id": 999, "job": "Co-Director", "name": "Someone Else"}]"#;
    let tangled_cast = r#"[{'character': "Flynn Rider (voice)", 'gender': 2, 'id': 16855, 'name': 'Zachary Levi', 'profile_path': None},
 {'character': 'Rapunzel (voice)', 'gender': 1, 'id': 8691, 'name': 'Zoe Saldana (dup)'}]"#;
    let tangled_crew = r#"[{'department': 'Directing', 'gender': 2, 'id': 76595, 'job': 'Director', 'name': 'Byron Howard'},
 {'department': 'Directing', 'gender': 2, 'id': 76596, 'job': 'director', 'name': 'Nathan Greno'}]"#;

    write_csv(
        &input_dir.join("credits.csv"),
        &[credits_key, "title", "cast", "crew"],
        &[
            vec!["38757", "Tangled (credits copy)", tangled_cast, tangled_crew],
            vec!["19995", "Avatar (credits copy)", avatar_cast, avatar_crew],
            vec!["1", "Orphan", "[]", "[]"],
        ],
    );
}

fn plan_for(root: &Path) -> Plan {
    Plan {
        input_dir: root.join("raw"),
        output_dir: root.join("processed").join("graph"),
        movies_file: "movies.csv".to_string(),
        credits_file: "credits.csv".to_string(),
        ..Plan::default()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_end_to_end_inner_join() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir.path().join("raw"), "movie_id");
    let plan = plan_for(dir.path());

    let summary = run_etl(&plan).unwrap();

    assert_eq!(summary.rows_loaded, 2);
    assert_eq!(summary.unmatched_movies, 1);
    assert_eq!(summary.unmatched_credits, 1);
    assert_eq!(summary.degraded_cells, 1);
    assert_eq!(summary.files.len(), 10);
    assert_eq!(summary.collections["movies"], 2);
    assert_eq!(summary.collections["persons"], 5);
    assert_eq!(summary.collections["genres"], 3);
    assert_eq!(summary.collections["acted_in"], 4);
    assert_eq!(summary.collections["directed"], 2);
    assert_eq!(summary.collections["tagged_with"], 1);

    let out = &plan.output_dir;
    for name in [
        "movies",
        "persons",
        "genres",
        "keywords",
        "companies",
        "acted_in",
        "directed",
        "produced",
        "categorized_as",
        "tagged_with",
    ] {
        assert!(out.join(format!("{}.csv", name)).is_file(), "{} missing", name);
    }

    let movies = read_lines(&out.join("movies.csv"));
    assert_eq!(
        movies[0],
        "id,title,release_date,budget,revenue,popularity,vote_average,vote_count,overview"
    );
    assert!(movies[1].starts_with("19995,Avatar,2009-12-10,237000000,2787965087,150.437577,7.2,0,"));
    assert!(movies[2].starts_with("38757,Tangled,"));

    // Genre 28 was first seen on Avatar but Tangled renamed it
    let genres = read_lines(&out.join("genres.csv"));
    assert_eq!(
        genres,
        vec!["id,name", "28,Action (renamed)", "12,Adventure", "16,Animation"]
    );

    let persons = read_lines(&out.join("persons.csv"));
    assert_eq!(persons[0], "id,name,gender,profile_path");
    assert_eq!(persons[2], "8691,Zoe Saldana (dup),1,");
    assert_eq!(persons[3], "2710,James Cameron,2,");
    assert_eq!(persons[4], "16855,Zachary Levi,2,");

    let acted_in = read_lines(&out.join("acted_in.csv"));
    assert_eq!(acted_in[1], "65731,19995,Jake Sully,0");
    assert_eq!(acted_in[2], "8691,19995,Neytiri,1");
    assert_eq!(acted_in[3], "16855,38757,Flynn Rider (voice),0");

    let directed = read_lines(&out.join("directed.csv"));
    assert_eq!(
        directed,
        vec![
            "person_id,movie_id,job,department",
            "2710,19995,Director,Directing",
            "76595,38757,Director,Directing"
        ]
    );

    let companies = read_lines(&out.join("companies.csv"));
    assert_eq!(companies[1], "289,Ingenious Film Partners,US");
    assert_eq!(companies[2], "2,Walt Disney Pictures,");

    // Tangled's keywords cell is truncated and degrades to nothing
    let tagged_with = read_lines(&out.join("tagged_with.csv"));
    assert_eq!(tagged_with, vec!["movie_id,keyword_id", "19995,1463"]);
    assert!(summary
        .warnings
        .iter()
        .any(|w| w.contains("could not parse 'keywords'")));
    assert!(summary
        .warnings
        .iter()
        .any(|w| w.contains("'vote_count' is missing")));
}

#[test]
fn test_left_join_keeps_movies_without_credits() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir.path().join("raw"), "movie_id");
    let plan = Plan {
        join: JoinMode::Left,
        ..plan_for(dir.path())
    };

    let summary = run_etl(&plan).unwrap();
    assert_eq!(summary.rows_loaded, 3);
    assert_eq!(summary.unmatched_movies, 0);

    let movies = read_lines(&plan.output_dir.join("movies.csv"));
    assert!(movies[2].starts_with("206647,Spectre,"));
    let produced = read_lines(&plan.output_dir.join("produced.csv"));
    assert!(produced.contains(&"206647,5".to_string()));
}

#[test]
fn test_credits_keyed_by_id() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir.path().join("raw"), "id");

    let summary = run_etl(&plan_for(dir.path())).unwrap();
    assert_eq!(summary.rows_loaded, 2);
}

#[test]
fn test_credits_without_join_key_is_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir.path().join("raw"), "film");

    let err = run_etl(&plan_for(dir.path())).unwrap_err();
    assert!(err.is_schema_error());
}

#[test]
fn test_sample_size_limits_movies_before_join() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir.path().join("raw"), "movie_id");
    let plan = Plan {
        sample_size: Some(1),
        ..plan_for(dir.path())
    };

    let summary = run_etl(&plan).unwrap();
    assert_eq!(summary.rows_loaded, 1);
    assert_eq!(summary.collections["movies"], 1);
}

#[test]
fn test_missing_source_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("raw")).unwrap();
    write_csv(
        &dir.path().join("raw").join("movies.csv"),
        &["id", "title"],
        &[vec!["1", "Only Movies"]],
    );
    let plan = plan_for(dir.path());

    let err = run_etl(&plan).unwrap_err();
    assert!(err.is_not_found());
    match err {
        EtlError::Load(LoadError::SourceNotFound { path }) => {
            assert!(path.ends_with("credits.csv"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!plan.output_dir.exists());
}

#[test]
fn test_nested_contract_violation_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw");
    fs::create_dir_all(&raw).unwrap();
    write_csv(&raw.join("movies.csv"), &["id", "title"], &[vec!["5", "Four Rooms"]]);
    write_csv(
        &raw.join("credits.csv"),
        &["movie_id", "cast", "crew"],
        &[vec!["5", r#"[{"id": 3129, "name": "Tim Roth"}]"#, "[]"]],
    );

    let err = run_etl(&plan_for(dir.path())).unwrap_err();
    assert!(err.is_data_contract_error());
    assert!(err.to_string().contains("missing field 'character'"));
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_degraded_cells_are_logged_as_warnings() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir.path().join("raw"), "movie_id");
    let plan = plan_for(dir.path());

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .without_time()
        .with_writer(move || writer.clone())
        .finish();

    let summary =
        tracing::subscriber::with_default(subscriber, || run_etl(&plan)).unwrap();
    assert_eq!(summary.degraded_cells, 1);

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("WARN"));
    assert!(output.contains("could not parse 'keywords'"));
    assert!(!output.contains("Transforming"));
}
