use crate::error::Error;
use crate::probe;
use crate::storage::models::{FilesetRecord, TargetRow};
use crate::storage::Database;
use std::path::Path;

/// Classification result for one target row. The variants are mutually
/// exclusive and evaluated in a fixed order: the first applicable
/// outcome wins and stops all further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Path column is null or blank. Nothing to audit.
    EmptyPath,
    /// No file at the normalized source path. Cannot be repaired.
    SourceFileMissing,
    /// Source file exists but the link column is unset.
    LinkMissing,
    /// Link id is set but no ledger record resolves to it.
    LedgerRecordMissing,
    /// Ledger record exists but its stored copy is gone.
    StoredCopyMissing,
    /// Source and stored copy both exist but their contents diverge.
    SizeMismatch,
    /// Source file, link, ledger record and stored copy all agree.
    Consistent,
}

impl Outcome {
    /// Category label used for log file names and statistics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::EmptyPath => "EmptyPath",
            Outcome::SourceFileMissing => "SourceMissing",
            Outcome::LinkMissing => "LinkMissing",
            Outcome::LedgerRecordMissing => "LedgerRecordMissing",
            Outcome::StoredCopyMissing => "StoredCopyMissing",
            Outcome::SizeMismatch => "SizeMismatch",
            Outcome::Consistent => "Consistent",
        }
    }

    /// Whether a copy-and-link repair can restore consistency. A
    /// missing source can never be repaired: there is nothing left to
    /// copy.
    pub fn is_repairable(&self) -> bool {
        matches!(
            self,
            Outcome::LinkMissing
                | Outcome::LedgerRecordMissing
                | Outcome::StoredCopyMissing
                | Outcome::SizeMismatch
        )
    }
}

/// Outcome plus the evidence gathered while reaching it, carried into
/// log lines.
#[derive(Debug)]
pub struct Classification {
    pub outcome: Outcome,
    pub source_size: Option<u64>,
    pub record: Option<FilesetRecord>,
}

impl Classification {
    fn new(outcome: Outcome, source_size: Option<u64>, record: Option<FilesetRecord>) -> Self {
        Self {
            outcome,
            source_size,
            record,
        }
    }
}

pub struct Classifier<'a> {
    db: &'a Database,
    fileset_table: &'a str,
    verify_content: bool,
}

impl<'a> Classifier<'a> {
    pub fn new(db: &'a Database, fileset_table: &'a str, verify_content: bool) -> Self {
        Self {
            db,
            fileset_table,
            verify_content,
        }
    }

    /// Classify one row against the filesystem and the fileset ledger.
    /// `normalized_path` is the row's path after path-map rules; the
    /// caller normalizes exactly once so the repairer sees the same
    /// path. Empty paths never reach this function.
    pub fn classify(&self, row: &TargetRow, normalized_path: &str) -> Result<Classification, Error> {
        let Some(source_size) = probe::probe(Path::new(normalized_path)) else {
            return Ok(Classification::new(Outcome::SourceFileMissing, None, None));
        };

        let link_id = match row.link_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => {
                return Ok(Classification::new(
                    Outcome::LinkMissing,
                    Some(source_size),
                    None,
                ))
            }
        };

        let Some(record) = self.db.latest_fileset_record(self.fileset_table, link_id)? else {
            return Ok(Classification::new(
                Outcome::LedgerRecordMissing,
                Some(source_size),
                None,
            ));
        };

        let Some(stored_size) = probe::probe(Path::new(&record.full_path)) else {
            return Ok(Classification::new(
                Outcome::StoredCopyMissing,
                Some(source_size),
                Some(record),
            ));
        };

        if stored_size != source_size {
            return Ok(Classification::new(
                Outcome::SizeMismatch,
                Some(source_size),
                Some(record),
            ));
        }

        // Strict mode: equal sizes can still hide divergent contents.
        // Logged under the same category the audit uses for content
        // divergence.
        if self.verify_content
            && !contents_match(normalized_path, &record.full_path)?
        {
            return Ok(Classification::new(
                Outcome::SizeMismatch,
                Some(source_size),
                Some(record),
            ));
        }

        Ok(Classification::new(
            Outcome::Consistent,
            Some(source_size),
            Some(record),
        ))
    }
}

fn contents_match(source: &str, stored: &str) -> Result<bool, Error> {
    let source_hash = probe::content_hash(Path::new(source))?;
    let stored_hash = probe::content_hash(Path::new(stored))?;
    Ok(source_hash == stored_hash)
}
