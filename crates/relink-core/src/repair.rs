use crate::config::{FilesetConfig, TargetConfig};
use crate::error::Error;
use crate::storage::models::{FilesetRecord, TargetRow};
use crate::storage::Database;
use chrono::Local;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Copy a source file into the content store under a fresh fileset id
/// and link the target row to it in one transaction.
///
/// The copy happens before any database statement, so a copy failure
/// leaves both the target row and the ledger untouched. A database
/// failure after the copy leaves an orphaned stored file behind; the
/// ledger is append-only, so the orphan is harmless and detectable on a
/// later pass.
pub fn repair(
    db: &Database,
    target: &TargetConfig,
    fileset: &FilesetConfig,
    owner_user_id: i64,
    row: &TargetRow,
    normalized_path: &str,
) -> Result<FilesetRecord, Error> {
    let fileset_id = uuid::Uuid::new_v4().to_string();
    let source = Path::new(normalized_path);

    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    // The timestamp disambiguates repeated repairs of the same logical
    // file inside the store.
    let now = Local::now();
    let stamp = now.format("%Y.%m.%d_%H.%M.%S%.3f");
    let stored_path = format!("{}/{}_{}{}", fileset_id, stem, stamp, extension);
    let destination = fileset.store_dir().join(&stored_path);

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    debug!(
        "Copying {} -> {}",
        source.display(),
        destination.display()
    );
    let size = fs::copy(source, &destination)?;

    let record = FilesetRecord {
        fileset_id,
        stored_path,
        full_path: destination.to_string_lossy().into_owned(),
        creation_date: now.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        user_id: owner_user_id,
        size: size as i64,
        name,
    };

    db.apply_repair(target, &fileset.table_name, &row.id, &record)
        .map_err(|e| {
            warn!(
                "Ledger update failed after copy; {} is orphaned in the store: {}",
                record.full_path, e
            );
            Error::Database(e)
        })?;

    info!(
        "Repaired row {} in {}: linked to fileset {}",
        row.id, target.table_name, record.fileset_id
    );
    Ok(record)
}
