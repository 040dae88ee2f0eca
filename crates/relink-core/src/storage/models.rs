use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::ToSql;
use std::fmt;

/// Opaque target-row identifier. The id column's type belongs to the
/// external table, so the raw value is carried through unchanged and
/// bound back as-is when the link column is updated.
#[derive(Debug, Clone)]
pub struct RowId(pub Value);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "<{} byte blob>", b.len()),
        }
    }
}

impl ToSql for RowId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

/// One row read from a configured target table. The engine only reads
/// `path` and `link_id`; `info` holds the descriptive columns already
/// rendered for log lines.
#[derive(Debug, Clone)]
pub struct TargetRow {
    pub id: RowId,
    pub path: Option<String>,
    pub link_id: Option<String>,
    pub info: Vec<String>,
}

/// One ledger entry describing a stored copy in the content store.
/// Created only by repair, never mutated or deleted afterwards.
#[derive(Debug, Clone)]
pub struct FilesetRecord {
    pub fileset_id: String,
    pub stored_path: String,
    pub full_path: String,
    pub creation_date: String,
    pub user_id: i64,
    pub size: i64,
    pub name: String,
}
