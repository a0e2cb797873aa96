//! Shared fixture databases for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tempfile::TempDir;

/// A DIMSpec-shaped database with a handful of PFAS compounds and spectra
pub const DIMSPEC_SQL: &str = "
    CREATE TABLE compounds (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        formula TEXT,
        fixedmass REAL,
        inchikey TEXT
    );
    INSERT INTO compounds VALUES
        (1, 'PFOA', 'C8HF15O2', 413.9659, 'SNGREZUHAYWORS-UHFFFAOYSA-N'),
        (2, 'PFOS', 'C8HF17O3S', 499.9375, 'YFSUTJLHUFNCNZ-UHFFFAOYSA-N'),
        (3, 'GenX', 'C6HF11O3', 329.975, 'CSEBNABAWMZWIF-UHFFFAOYSA-N'),
        (4, 'PFBS', 'C4HF9O3S', 299.9503, 'JGTNAGYHADQMCM-UHFFFAOYSA-N'),
        (5, '6:2 FTS', 'C8H5F13O3S', 427.9750, NULL);

    CREATE TABLE peaks (
        id INTEGER PRIMARY KEY,
        compound_id INTEGER REFERENCES compounds(id),
        precursor_mz REAL,
        rt REAL
    );
    INSERT INTO peaks VALUES
        (100, 1, 412.9664, 7.52),
        (200, 2, 498.9302, 9.10),
        (400, 4, 298.9430, 4.31);

    CREATE TABLE ms_data (
        id INTEGER PRIMARY KEY,
        peak_id INTEGER REFERENCES peaks(id),
        measured_mz TEXT,
        measured_intensity TEXT
    );
    INSERT INTO ms_data VALUES
        (1, 100, '412.9664 368.9766 168.9888 118.9920', '10000 3500 1200 400'),
        (2, 200, '498.9302 79.9568 98.9552', '8000 2400 1600'),
        (3, 400, '298.9430 79.9568', '5000 2500');

    CREATE TABLE norm_fragments (
        id INTEGER PRIMARY KEY,
        formula TEXT,
        fixedmass REAL
    );
    INSERT INTO norm_fragments VALUES (1, 'CF3', 68.9952), (2, 'C2F5', 118.9920);

    CREATE VIEW view_compound_peaks AS
        SELECT c.name, p.id AS peak_id, p.precursor_mz
        FROM compounds c JOIN peaks p ON p.compound_id = c.id;
";

/// Temporary data directory holding `dimspec_sample.sqlite`
pub struct DataDir {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl DataDir {
    pub fn dimspec() -> Self {
        Self::with_sql(DIMSPEC_SQL)
    }

    pub fn with_sql(sql: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dimspec_sample.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(sql).unwrap();
        Self { dir, path }
    }
}

/// Create `table(id INTEGER PRIMARY KEY, label TEXT, amount REAL)` with the given rows
pub fn seed_labels(path: &Path, labels: &[String]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT, amount REAL);")
        .unwrap();
    for (i, label) in labels.iter().enumerate() {
        conn.execute(
            "INSERT INTO items (id, label, amount) VALUES (?1, ?2, ?3)",
            params![i as i64 + 1, label, i as f64 * 1.5],
        )
        .unwrap();
    }
}
