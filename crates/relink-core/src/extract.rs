//! Counterpart of the finder: pulls stored copies back OUT of a
//! content store. Given a CSV selection naming a column of fileset
//! ids, looks up the latest ledger record for each id and copies its
//! stored file into a per-row target path.

use crate::config::AppConfig;
use crate::error::Error;
use crate::storage::Database;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct ExtractOptions {
    /// CSV selection file, `;` delimited, with a header row.
    pub data_file: PathBuf,
    /// Header of the column holding the fileset id.
    pub id_column: String,
    /// Configured fileset whose ledger and store to read.
    pub fileset_id: String,
    /// Target directory. `{Column}` placeholders expand from each
    /// row's value for that header, so rows can land in their own
    /// directories. Placeholders use the column's header spelling.
    pub target_template: String,
    /// Resolve and report without copying anything.
    pub dry_run: bool,
}

#[derive(Debug, Default)]
pub struct ExtractStats {
    pub rows: usize,
    pub empty_ids: usize,
    pub missing_records: usize,
    /// Records resolved and copied (or, in a dry run, that would be).
    pub extracted: usize,
    pub copy_failed: usize,
}

pub fn run(config: &AppConfig, options: &ExtractOptions) -> Result<ExtractStats, Error> {
    let fileset = config.fileset(&options.fileset_id).ok_or_else(|| {
        Error::InvalidConfig(format!("unknown fileset id '{}'", options.fileset_id))
    })?;
    let db = Database::open(&config.database.path)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(&options.data_file)?;
    let headers = reader.headers()?.clone();
    let id_index = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(&options.id_column))
        .ok_or_else(|| {
            Error::InvalidConfig(format!(
                "column '{}' not present in {}",
                options.id_column,
                options.data_file.display()
            ))
        })?;

    let mut stats = ExtractStats::default();
    for record in reader.records() {
        let record = record?;
        stats.rows += 1;

        let id = record.get(id_index).unwrap_or("").trim();
        if id.is_empty() || id.eq_ignore_ascii_case("null") {
            stats.empty_ids += 1;
            continue;
        }

        let Some(found) = db.latest_fileset_record(&fileset.table_name, id)? else {
            warn!("   >>> No ledger record for fileset id {}", id);
            stats.missing_records += 1;
            continue;
        };

        let target = expand_template(&options.target_template, &headers, &record);
        let destination = Path::new(&target).join(&found.name);
        info!(
            "   >>> Extracting {} -> {}",
            found.full_path,
            destination.display()
        );
        if options.dry_run {
            stats.extracted += 1;
            continue;
        }

        match copy_out(Path::new(&found.full_path), &destination) {
            Ok(()) => stats.extracted += 1,
            Err(err) => {
                // One unreadable record must not abort the selection.
                warn!(
                    "Could not extract {} to {}: {}",
                    found.full_path,
                    destination.display(),
                    err
                );
                stats.copy_failed += 1;
            }
        }
    }

    Ok(stats)
}

fn expand_template(
    template: &str,
    headers: &csv::StringRecord,
    record: &csv::StringRecord,
) -> String {
    let mut path = template.to_string();
    for (index, header) in headers.iter().enumerate() {
        let placeholder = format!("{{{}}}", header);
        if path.contains(&placeholder) {
            path = path.replace(&placeholder, record.get(index).unwrap_or("").trim());
        }
    }
    path
}

fn copy_out(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    Ok(())
}
