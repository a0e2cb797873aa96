//! Fixture databases shared by the unit tests.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::TempDir;

use crate::database::Database;

pub(crate) const FIXTURE_SQL: &str = "
    CREATE TABLE compounds (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        formula TEXT,
        fixedmass REAL,
        cas TEXT,
        additional TEXT
    );
    INSERT INTO compounds VALUES
        (1, 'PFOA', 'C8HF15O2', 413.9659, '335-67-1', 'Perfluorooctanoic acid'),
        (2, 'PFOS', 'C8HF17O3S', 499.9375, '1763-23-1', 'Perfluorooctanesulfonic acid'),
        (3, 'GenX', 'C6HF11O3', 329.975, '13252-13-6', NULL);

    CREATE TABLE peaks (
        id INTEGER PRIMARY KEY,
        compound_id INTEGER,
        precursor_mz REAL,
        rt REAL
    );
    INSERT INTO peaks VALUES
        (10, 1, 412.966, 7.5),
        (11, 1, 412.966, 7.6),
        (20, 2, 498.930, 9.1),
        (30, 3, 284.977, 5.2);

    CREATE TABLE ms_data (
        id INTEGER PRIMARY KEY,
        peak_id INTEGER,
        measured_mz TEXT,
        measured_intensity TEXT
    );
    INSERT INTO ms_data VALUES
        (1, 10, '412.966 368.977 168.989', '1000 250 50'),
        (2, 11, '412.966 368.977', '0 0'),
        (3, 20, '498.930 79.957 98.955', '800 400 200'),
        (4, 30, '284.977 184.984', '5.0');

    CREATE VIEW view_compounds AS SELECT id, name, formula FROM compounds;
";

/// A temporary database file seeded with [`FIXTURE_SQL`]
pub(crate) struct Fixture {
    _dir: TempDir,
    pub(crate) path: PathBuf,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_sql(FIXTURE_SQL)
    }

    pub(crate) fn with_sql(sql: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dimspec_sample.sqlite");
        seed(&path, sql);
        Self { _dir: dir, path }
    }

    pub(crate) fn open(&self) -> Database {
        Database::open(&self.path).unwrap()
    }
}

pub(crate) fn seed(path: &Path, sql: &str) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(sql).unwrap();
}
