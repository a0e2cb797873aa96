use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{debug, info, warn};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, OpenFlags};

use super::error::DatabaseError;
use super::types::{ColumnInfo, Predicate, RowSet, TableDescriptor, TableKind, Value};

/// Read-only handle on the DIMSpec SQLite file
///
/// The catalog of tables and views is read once when the connection opens and
/// stays fixed for the lifetime of the handle. The underlying connection is
/// not safe for concurrent use, so every statement runs under a mutex.
pub struct Database {
    conn: Mutex<Connection>,
    path: PathBuf,
    catalog: Vec<TableDescriptor>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("tables", &self.catalog.len())
            .finish()
    }
}

impl Database {
    /// Open the first candidate that exists and is a readable SQLite file
    pub fn connect<P: AsRef<Path>>(candidates: &[P]) -> Result<Self, DatabaseError> {
        let mut tried = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let path = candidate.as_ref();
            tried.push(path.to_path_buf());
            if !path.is_file() {
                debug!("Database candidate not present: {}", path.display());
                continue;
            }
            match Self::open(path) {
                Ok(db) => {
                    info!(
                        "Connected to {} ({} tables/views)",
                        path.display(),
                        db.catalog.len()
                    );
                    return Ok(db);
                }
                Err(e) => warn!("Skipping database candidate {}: {}", path.display(), e),
            }
        }
        Err(DatabaseError::DataSourceNotFound { tried })
    }

    /// Open a specific file read-only and load its catalog
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch("PRAGMA query_only=ON; PRAGMA temp_store=MEMORY;")?;
        register_functions(&conn)?;
        let catalog = load_catalog(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
            catalog,
        })
    }

    /// Path of the file that was opened
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every table and view, ordered by name
    pub fn list_tables(&self) -> &[TableDescriptor] {
        &self.catalog
    }

    /// Returns true if a table or view with this name exists
    pub fn has_table(&self, name: &str) -> bool {
        self.catalog.iter().any(|t| t.name == name)
    }

    /// Catalog entry for one table or view
    pub fn describe(&self, table: &str) -> Result<&TableDescriptor, DatabaseError> {
        self.catalog
            .iter()
            .find(|t| t.name == table)
            .ok_or_else(|| DatabaseError::UnknownTable(table.to_string()))
    }

    /// Fetch one window of rows, optionally filtered
    ///
    /// Tables are ordered by `rowid`. Views and `WITHOUT ROWID` tables are
    /// ordered by every column in turn, so consecutive windows never overlap
    /// or skip rows.
    pub fn query(
        &self,
        table: &str,
        predicate: Option<&Predicate>,
        limit: u64,
        offset: u64,
    ) -> Result<RowSet, DatabaseError> {
        let descriptor = self.describe(table)?;
        let (clause, mut params) = where_clause(descriptor, predicate)?;
        let order = order_clause(descriptor);
        let sql = format!(
            "SELECT * FROM {}{}{} LIMIT ? OFFSET ?",
            quote_ident(&descriptor.name),
            clause,
            order
        );
        params.push(Value::Integer(clamp_i64(limit)));
        params.push(Value::Integer(clamp_i64(offset)));
        debug!("query: {} (limit={}, offset={})", sql, limit, offset);
        self.fetch(&sql, &params)
    }

    /// Number of rows the same predicate would select
    pub fn count(&self, table: &str, predicate: Option<&Predicate>) -> Result<u64, DatabaseError> {
        let descriptor = self.describe(table)?;
        let (clause, params) = where_clause(descriptor, predicate)?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", quote_ident(&descriptor.name), clause);
        debug!("count: {}", sql);
        let conn = self.lock()?;
        let count: i64 = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Run a read statement with bound parameters and collect every row
    pub(crate) fn fetch(&self, sql: &str, params: &[Value]) -> Result<RowSet, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(width);
            for idx in 0..width {
                record.push(Value::from(row.get_ref(idx)?));
            }
            records.push(record);
        }
        Ok(RowSet::new(columns, records))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }
}

/// Double-quote an identifier for interpolation into SQL
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL function behind [`Predicate::Contains`]: `dimspec_contains(cell, term)`
///
/// True when `cell` is text containing `term` under Unicode lowercasing.
/// Numbers, blobs and NULL never match.
pub(crate) const CONTAINS_FUNCTION: &str = "dimspec_contains";

fn contains_ignoring_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        CONTAINS_FUNCTION,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let ValueRef::Text(cell) = ctx.get_raw(0) else {
                return Ok(false);
            };
            let needle: String = ctx.get(1)?;
            Ok(contains_ignoring_case(
                &String::from_utf8_lossy(cell),
                &needle,
            ))
        },
    )
}

/// ` ORDER BY …` giving a stable row order for offset pagination
fn order_clause(descriptor: &TableDescriptor) -> String {
    if descriptor.has_rowid {
        return " ORDER BY rowid".to_string();
    }
    if descriptor.columns.is_empty() {
        return String::new();
    }
    let positions: Vec<String> = (1..=descriptor.columns.len())
        .map(|i| i.to_string())
        .collect();
    format!(" ORDER BY {}", positions.join(", "))
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Build a ` WHERE …` clause (or empty string) and its parameters
fn where_clause(
    descriptor: &TableDescriptor,
    predicate: Option<&Predicate>,
) -> Result<(String, Vec<Value>), DatabaseError> {
    match predicate {
        None => Ok((String::new(), Vec::new())),
        Some(Predicate::Contains(term)) if term.trim().is_empty() => {
            Ok((String::new(), Vec::new()))
        }
        Some(Predicate::Contains(term)) => {
            if descriptor.columns.is_empty() {
                return Ok((" WHERE 0".to_string(), Vec::new()));
            }
            let terms: Vec<String> = descriptor
                .columns
                .iter()
                .map(|c| format!("{CONTAINS_FUNCTION}({}, ?)", quote_ident(&c.name)))
                .collect();
            let params = vec![Value::Text(term.clone()); terms.len()];
            Ok((format!(" WHERE {}", terms.join(" OR ")), params))
        }
        Some(Predicate::Equals(filters)) if filters.is_empty() => Ok((String::new(), Vec::new())),
        Some(Predicate::Equals(filters)) => {
            let mut terms = Vec::with_capacity(filters.len());
            let mut params = Vec::with_capacity(filters.len());
            for (column, value) in filters {
                if !descriptor.has_column(column) {
                    return Err(DatabaseError::UnknownColumn {
                        table: descriptor.name.clone(),
                        column: column.clone(),
                    });
                }
                terms.push(format!("{} IS ?", quote_ident(column)));
                params.push(value.clone());
            }
            Ok((format!(" WHERE {}", terms.join(" AND ")), params))
        }
    }
}

fn load_catalog(conn: &Connection) -> Result<Vec<TableDescriptor>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT name, type, COALESCE(sql, '') FROM sqlite_master \
         WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
    )?;
    let entries = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut catalog = Vec::with_capacity(entries.len());
    for (name, kind, sql) in entries {
        let kind = if kind == "view" {
            TableKind::View
        } else {
            TableKind::Table
        };
        let columns = match table_columns(conn, &name) {
            Ok(columns) => columns,
            Err(e) => {
                // Broken views (e.g. referencing a dropped table) stay listed but unqueryable
                warn!("Could not read columns of {}: {}", name, e);
                Vec::new()
            }
        };
        let has_rowid =
            kind == TableKind::Table && !sql.to_ascii_uppercase().contains("WITHOUT ROWID");
        catalog.push(TableDescriptor {
            name,
            kind,
            columns,
            has_rowid,
        });
    }
    Ok(catalog)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT name, COALESCE(type, '') FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(ColumnInfo::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}
