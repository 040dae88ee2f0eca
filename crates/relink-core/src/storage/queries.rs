use super::models::{FilesetRecord, RowId, TargetRow};
use super::sqlite::Database;
use crate::config::TargetConfig;
use rusqlite::types::Value;
use rusqlite::{params, Result};
use tracing::debug;

impl Database {
    // ── Schema preparation ───────────────────────────────────────

    /// Create the content-store ledger table if it does not exist yet.
    /// Never drops or rewrites an existing ledger.
    pub fn ensure_fileset_table(&self, table: &str) -> Result<()> {
        self.connection().execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 fileset_id TEXT NOT NULL,
                 path TEXT,
                 full_path TEXT,
                 creation_date TEXT NOT NULL,
                 user_id INTEGER NOT NULL,
                 size INTEGER NOT NULL,
                 name TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_{table}_fileset_id
                 ON {table} (fileset_id);"
        ))?;
        Ok(())
    }

    /// Add the link column to a target table when it is not present.
    pub fn ensure_link_column(&self, table: &str, column: &str) -> Result<()> {
        let mut stmt = self
            .connection()
            .prepare(&format!("PRAGMA table_info({table})"))?;
        let exists = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .filter_map(std::result::Result::ok)
            .any(|name| name.eq_ignore_ascii_case(column));
        if !exists {
            self.connection().execute(
                &format!("ALTER TABLE {table} ADD COLUMN {column} TEXT"),
                [],
            )?;
            debug!("Added link column {} to {}", column, table);
        }
        Ok(())
    }

    // ── Target rows ──────────────────────────────────────────────

    /// All rows of a target table in id order. Empty paths are kept so
    /// they can be counted; the engine never probes them.
    pub fn fetch_target_rows(&self, target: &TargetConfig) -> Result<Vec<TargetRow>> {
        let mut columns = vec![
            target.id_column.clone(),
            target.path_column.clone(),
            target.link_column.clone(),
        ];
        columns.extend(target.info_columns.iter().map(|c| c.name.clone()));

        let filter = if target.only_missing_links {
            format!(" WHERE IFNULL({}, '') = ''", target.link_column)
        } else {
            String::new()
        };
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {}",
            columns.join(", "),
            target.table_name,
            filter,
            target.id_column,
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let column_count = columns.len();
        let rows = stmt
            .query_map([], |row| {
                let mut info = Vec::with_capacity(column_count - 3);
                for index in 3..column_count {
                    info.push(display_value(&row.get::<_, Value>(index)?));
                }
                Ok(TargetRow {
                    id: RowId(row.get(0)?),
                    path: row.get(1)?,
                    link_id: row.get(2)?,
                    info,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        debug!("Fetched {} rows from {}", rows.len(), target.table_name);
        Ok(rows)
    }

    // ── Fileset ledger ───────────────────────────────────────────

    /// The current (newest by creation date) ledger record for a
    /// fileset id. Re-copies leave older records behind, so there may
    /// be several.
    pub fn latest_fileset_record(
        &self,
        fileset_table: &str,
        link_id: &str,
    ) -> Result<Option<FilesetRecord>> {
        let sql = format!(
            "SELECT fileset_id, path, full_path, creation_date, user_id, size, name
             FROM {fileset_table}
             WHERE fileset_id = ?1
             ORDER BY creation_date DESC
             LIMIT 1"
        );
        match self.connection().query_row(&sql, params![link_id], |row| {
            Ok(FilesetRecord {
                fileset_id: row.get(0)?,
                stored_path: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                full_path: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                creation_date: row.get(3)?,
                user_id: row.get(4)?,
                size: row.get(5)?,
                name: row.get(6)?,
            })
        }) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Link update and ledger insert as one unit. The ledger is
    /// append-only: existing records are never touched, the target row
    /// only ever gets a fresh fileset id written to its link column.
    pub fn apply_repair(
        &self,
        target: &TargetConfig,
        fileset_table: &str,
        row_id: &RowId,
        record: &FilesetRecord,
    ) -> Result<()> {
        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            &format!(
                "UPDATE {} SET {} = ?1 WHERE {} = ?2",
                target.table_name, target.link_column, target.id_column
            ),
            params![record.fileset_id, row_id],
        )?;
        tx.execute(
            &format!(
                "INSERT INTO {fileset_table}
                     (fileset_id, path, full_path, creation_date, user_id, size, name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ),
            params![
                record.fileset_id,
                record.stored_path,
                record.full_path,
                record.creation_date,
                record.user_id,
                record.size,
                record.name,
            ],
        )?;
        tx.commit()?;
        debug!(
            "Linked row {} in {} to fileset {}",
            row_id, target.table_name, record.fileset_id
        );
        Ok(())
    }
}

/// Render a descriptive column value for a log line. Nulls and blank
/// strings become "-".
fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(s) if s.trim().is_empty() => "-".to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} byte blob>", b.len()),
    }
}
