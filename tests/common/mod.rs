//! Shared fixtures for the SQLite integration tests.

use stddb::sql_util::drop_table;
use stddb::{Database, Sqlite};
use tempfile::TempDir;

pub const SCORES: &[(&str, i64, &str)] = &[
    ("Knuth", 62, "2016-01-01"),
    ("Hopper", 48, "2016-02-02"),
    ("Dijkstra", 84, "2016-03-03"),
];

/// A database file inside a fresh temporary directory.
///
/// Keep the returned directory alive for as long as the database is used.
pub fn temp_database() -> (TempDir, Database<Sqlite>) {
    let dir = TempDir::new().unwrap();
    let uri = file_uri(&dir);
    let db = Database::open(&uri).unwrap();
    (dir, db)
}

pub fn file_uri(dir: &TempDir) -> String {
    format!("file://{}", dir.path().join("testdb.sqlite").display())
}

/// Drops and recreates the `score` table, optionally filling it.
pub fn recreate_score_table(db: &Database<Sqlite>, data: bool) {
    let con = db.connection().unwrap();
    drop_table(db, "score");
    con.query(&format!(
        "create table score (name varchar(10), score integer, d {})",
        db.date_column_type()
    ))
    .unwrap();

    if !data {
        return;
    }
    for (name, score, date) in SCORES {
        con.query(&format!("insert into score values('{}',{},'{}')", name, score, date))
            .unwrap();
    }
}
