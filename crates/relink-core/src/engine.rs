use crate::classify::{Classification, Classifier, Outcome};
use crate::config::{AppConfig, FilesetConfig, TargetConfig};
use crate::error::Error;
use crate::pathmap;
use crate::progress::ProgressReporter;
use crate::repair;
use crate::report::{CategoryLogs, REPAIR_LOG};
use crate::storage::models::TargetRow;
use crate::storage::Database;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Classify only; no filesystem or database mutation.
    Verify,
    /// Classify, then repair every repairable row.
    Repair,
}

/// Per-target outcome counters, emitted as a statistics block at the
/// end of each target's pass.
#[derive(Debug, Clone, Default)]
pub struct TargetStats {
    pub table_name: String,
    pub path_column: String,
    pub rows: usize,
    pub empty_path: usize,
    pub source_missing: usize,
    pub link_missing: usize,
    pub ledger_record_missing: usize,
    pub stored_copy_missing: usize,
    pub size_mismatch: usize,
    pub consistent: usize,
    pub repaired: usize,
    pub repair_failed: usize,
    pub row_errors: usize,
}

impl TargetStats {
    fn new(target: &TargetConfig) -> Self {
        Self {
            table_name: target.table_name.clone(),
            path_column: target.path_column.clone(),
            ..Self::default()
        }
    }

    fn count(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::EmptyPath => self.empty_path += 1,
            Outcome::SourceFileMissing => self.source_missing += 1,
            Outcome::LinkMissing => self.link_missing += 1,
            Outcome::LedgerRecordMissing => self.ledger_record_missing += 1,
            Outcome::StoredCopyMissing => self.stored_copy_missing += 1,
            Outcome::SizeMismatch => self.size_mismatch += 1,
            Outcome::Consistent => self.consistent += 1,
        }
    }

    /// Rows in any category other than Consistent and EmptyPath. A
    /// non-zero value is the intended output of an audit, not a process
    /// failure.
    pub fn inconsistent(&self) -> usize {
        self.source_missing
            + self.link_missing
            + self.ledger_record_missing
            + self.stored_copy_missing
            + self.size_mismatch
    }

    fn block_lines(&self) -> Vec<String> {
        vec![
            " ".to_string(),
            format!(
                " ==== Statistics for table {} by column {} ==== ",
                self.table_name, self.path_column
            ),
            format!("Rows selected: {}", self.rows),
            format!("Empty paths: {}", self.empty_path),
            format!("Source files missing: {}", self.source_missing),
            format!("Links missing: {}", self.link_missing),
            format!("Ledger records missing: {}", self.ledger_record_missing),
            format!("Stored copies missing: {}", self.stored_copy_missing),
            format!("Size mismatches: {}", self.size_mismatch),
            format!("Consistent rows: {}", self.consistent),
            format!("Repaired: {}", self.repaired),
            format!("Repairs failed: {}", self.repair_failed),
            format!("Row errors: {}", self.row_errors),
        ]
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub mode: Mode,
    pub duration: Duration,
    pub targets: Vec<TargetStats>,
}

pub struct AuditEngine {
    config: AppConfig,
    db_path: String,
}

impl AuditEngine {
    pub fn new(config: AppConfig) -> Self {
        let db_path = config.database.path.clone();
        Self { config, db_path }
    }

    pub fn with_db_path(mut self, path: &str) -> Self {
        self.db_path = path.to_string();
        self
    }

    /// Audit every configured target. Preflight failures abort before
    /// any row is touched; row-level failures are logged and the run
    /// continues with the next row.
    pub fn run(&self, mode: Mode, reporter: &dyn ProgressReporter) -> Result<RunReport, Error> {
        let started = Instant::now();
        let db = self.preflight()?;

        let mut targets = Vec::with_capacity(self.config.targets.len());
        for target in &self.config.targets {
            // Resolution is guaranteed by config validation.
            let fileset = self.config.fileset(&target.fileset_id).ok_or_else(|| {
                Error::InvalidConfig(format!("unknown fileset id '{}'", target.fileset_id))
            })?;
            let stats = self.run_target(&db, target, fileset, mode, reporter)?;
            targets.push(stats);
        }

        Ok(RunReport {
            mode,
            duration: started.elapsed(),
            targets,
        })
    }

    /// Create content-store directories and ledger schema up front.
    /// Idempotent: existing tables, columns and directories are left
    /// alone.
    pub fn prepare(&self) -> Result<(), Error> {
        for fileset in &self.config.filesets {
            if !Path::new(&fileset.root).is_dir() {
                return Err(Error::InvalidConfig(format!(
                    "content store root {} for fileset {} is not accessible",
                    fileset.root, fileset.id
                )));
            }
            let dir = fileset.store_dir();
            info!(
                "Preparing content store {} for fileset {}",
                dir.display(),
                fileset.id
            );
            fs::create_dir_all(&dir)?;
        }
        self.preflight().map(|_| ())
    }

    /// Startup checks: every content-store root reachable, database
    /// openable, ledger tables and link columns in place.
    fn preflight(&self) -> Result<Database, Error> {
        for fileset in &self.config.filesets {
            if !Path::new(&fileset.root).is_dir() {
                return Err(Error::InvalidConfig(format!(
                    "content store root {} for fileset {} is not accessible",
                    fileset.root, fileset.id
                )));
            }
        }

        let db = Database::open(&self.db_path)?;
        for fileset in &self.config.filesets {
            db.ensure_fileset_table(&fileset.table_name)?;
        }
        for target in &self.config.targets {
            db.ensure_link_column(&target.table_name, &target.link_column)?;
        }
        Ok(db)
    }

    fn run_target(
        &self,
        db: &Database,
        target: &TargetConfig,
        fileset: &FilesetConfig,
        mode: Mode,
        reporter: &dyn ProgressReporter,
    ) -> Result<TargetStats, Error> {
        info!(
            "Auditing table {} by column {}",
            target.table_name, target.path_column
        );

        let mut logs = CategoryLogs::open(Path::new(&self.config.results_dir), &target.suffix())?;
        let classifier = Classifier::new(db, &fileset.table_name, self.config.verify_content);

        let rows = db.fetch_target_rows(target)?;
        reporter.on_target_start(&target.table_name, rows.len());

        let mut stats = TargetStats::new(target);
        stats.rows = rows.len();

        for (index, row) in rows.iter().enumerate() {
            reporter.on_row(index + 1, rows.len());

            let raw = row.path.as_deref().unwrap_or("").trim();
            if raw.is_empty() {
                // No filesystem or database calls for empty paths.
                stats.count(Outcome::EmptyPath);
                continue;
            }

            // Normalized exactly once per row so the classifier and the
            // repairer always see the same path.
            let normalized = pathmap::normalize(raw, &self.config.path_map);

            let classification = match classifier.classify(row, &normalized) {
                Ok(c) => c,
                Err(e) => {
                    error!(
                        "Row {} in {}: classification failed: {}",
                        row.id, target.table_name, e
                    );
                    stats.row_errors += 1;
                    continue;
                }
            };

            stats.count(classification.outcome);
            self.log_outcome(&mut logs, target, row, &normalized, &classification)?;

            if mode == Mode::Repair && classification.outcome.is_repairable() {
                match repair::repair(
                    db,
                    target,
                    fileset,
                    self.config.owner_user_id,
                    row,
                    &normalized,
                ) {
                    Ok(record) => {
                        stats.repaired += 1;
                        logs.write(
                            REPAIR_LOG,
                            &format!(
                                "Repaired: {} {} {} -> fileset {} ({})",
                                target.table_name,
                                target.path_column,
                                row.id,
                                record.fileset_id,
                                record.full_path
                            ),
                        )?;
                    }
                    Err(e) => {
                        warn!(
                            "Row {} in {}: repair failed: {}",
                            row.id, target.table_name, e
                        );
                        stats.repair_failed += 1;
                        logs.write(
                            REPAIR_LOG,
                            &format!(
                                "Repair failed: {} {} {} {}: {}",
                                target.table_name, target.path_column, row.id, normalized, e
                            ),
                        )?;
                    }
                }
            }
        }

        let block = stats.block_lines();
        for line in &block {
            info!("{}", line);
        }
        logs.write_stats_block(&block)?;
        logs.flush()?;
        reporter.on_target_complete(&target.table_name);

        Ok(stats)
    }

    fn log_outcome(
        &self,
        logs: &mut CategoryLogs,
        target: &TargetConfig,
        row: &TargetRow,
        normalized: &str,
        classification: &Classification,
    ) -> Result<(), Error> {
        let context = format!(
            "{} {} {} {}",
            target.table_name, target.path_column, row.id, normalized
        );
        let extra = if row.info.is_empty() {
            String::new()
        } else {
            let pairs: Vec<String> = target
                .info_columns
                .iter()
                .zip(&row.info)
                .map(|(column, value)| format!("{}: {}", column.description, value))
                .collect();
            format!(" [{}]", pairs.join(", "))
        };

        let full_path = classification
            .record
            .as_ref()
            .map(|r| r.full_path.as_str())
            .unwrap_or("");

        let line = match classification.outcome {
            Outcome::SourceFileMissing => {
                warn!("   >>> Source file missing: {}{}", context, extra);
                format!("Source file missing: {}{}", context, extra)
            }
            Outcome::LinkMissing => {
                warn!(
                    "   >>> Link id not set for an existing file: {}{}",
                    context, extra
                );
                format!("Link id not set for an existing file: {}{}", context, extra)
            }
            Outcome::LedgerRecordMissing => {
                warn!(
                    "   >>> Link id set but no ledger record: {}{}",
                    context, extra
                );
                format!("Link id set but no ledger record: {}{}", context, extra)
            }
            Outcome::StoredCopyMissing => {
                warn!(
                    "   >>> Ledger record exists but stored copy missing: {} {}{}",
                    context, full_path, extra
                );
                format!(
                    "Ledger record exists but stored copy missing: {} {}{}",
                    context, full_path, extra
                )
            }
            Outcome::SizeMismatch => {
                let source_size = classification.source_size.unwrap_or_default();
                let stored_size = classification
                    .record
                    .as_ref()
                    .map(|r| r.size)
                    .unwrap_or_default();
                warn!(
                    "   >>> File contents do not match: {} {} {} {}{}",
                    context, full_path, source_size, stored_size, extra
                );
                format!(
                    "File contents do not match: {} {} source {} bytes, ledger {} bytes{}",
                    context, full_path, source_size, stored_size, extra
                )
            }
            Outcome::Consistent => format!(
                "Stored copy matches linked file: {} {}{}",
                context, full_path, extra
            ),
            Outcome::EmptyPath => return Ok(()),
        };

        logs.write(classification.outcome.label(), &line)
    }
}
