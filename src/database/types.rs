use std::fmt;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Serialize, Serializer};

/// A single cell, typed by whatever SQLite stored in it
///
/// SQLite columns are dynamically typed, so the variant is resolved per cell
/// at read time. BLOB cells are surfaced as lowercase hex text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Real(f64),
    /// UTF-8 text
    Text(String),
}

impl Value {
    /// Returns true if the cell is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text content, if this is a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the cell; text is parsed leniently
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Null => None,
        }
    }

    /// Integer view of the cell
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(r) if r.fract() == 0.0 => Some(*r as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    /// Renders the cell the way it appears in exports: NULL is empty and
    /// reals use the shortest representation that parses back exactly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Text(b.iter().map(|byte| format!("{:02x}", byte)).collect()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Real(r) if r.is_finite() => serializer.serialize_f64(*r),
            Value::Real(_) => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// SQLite type affinity derived from a column's declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Affinity {
    /// Declared type contains "INT"
    Integer,
    /// Declared type contains "CHAR", "CLOB" or "TEXT"
    Text,
    /// Declared type contains "BLOB" or is empty
    Blob,
    /// Declared type contains "REAL", "FLOA" or "DOUB"
    Real,
    /// Anything else
    Numeric,
}

impl Affinity {
    /// Apply SQLite's affinity rules (section 3.1 of the datatype docs) in order
    pub fn from_declared_type(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            Affinity::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Affinity::Text
        } else if upper.contains("BLOB") || upper.trim().is_empty() {
            Affinity::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Affinity::Real
        } else {
            Affinity::Numeric
        }
    }
}

/// Column metadata from `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Declared type as written in the schema (empty for most view columns)
    pub declared_type: String,
    /// Affinity inferred from the declared type
    pub affinity: Affinity,
}

impl ColumnInfo {
    /// Build column metadata, inferring the affinity
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let declared_type = declared_type.into();
        Self {
            name: name.into(),
            affinity: Affinity::from_declared_type(&declared_type),
            declared_type,
        }
    }
}

/// Whether a catalog entry is a base table or a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// Base table
    Table,
    /// View
    View,
}

/// A table or view in the database catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDescriptor {
    /// Table or view name
    pub name: String,
    /// Table or view
    pub kind: TableKind,
    /// Columns in declaration order
    pub columns: Vec<ColumnInfo>,
    /// Rows can be ordered by rowid (false for views and WITHOUT ROWID tables)
    #[serde(skip)]
    pub has_rowid: bool,
}

impl TableDescriptor {
    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column by exact name
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns true if the column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// Ordered records produced by a query
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowSet {
    /// Column names in result order
    pub columns: Vec<String>,
    /// Records; each has exactly `columns.len()` cells
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Create a row set from columns and rows
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column in the result
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in the named column
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// All values of one column, top to bottom
    pub fn column_values(&self, column: &str) -> Vec<&Value> {
        match self.column_index(column) {
            Some(idx) => self.rows.iter().filter_map(|r| r.get(idx)).collect(),
            None => Vec::new(),
        }
    }
}

/// Row filter applied by [`Database::query`](super::Database::query)
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive substring match against every text cell of a row;
    /// the row matches if any text cell contains the term
    Contains(String),
    /// Exact match on every listed column (`IS`, so NULL matches NULL)
    Equals(Vec<(String, Value)>),
}
