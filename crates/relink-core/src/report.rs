use crate::error::Error;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Extra log alongside the outcome categories, recording repair
/// successes and failures.
pub const REPAIR_LOG: &str = "Repairs";

/// Log files written per row, one per outcome category. EmptyPath rows
/// are only counted, never logged per row.
const CATEGORIES: [&str; 7] = [
    "SourceMissing",
    "LinkMissing",
    "LedgerRecordMissing",
    "StoredCopyMissing",
    "SizeMismatch",
    "Consistent",
    REPAIR_LOG,
];

/// Per-target category log files. Opened once per target and owned
/// exclusively by the engine for the duration of that target's pass.
pub struct CategoryLogs {
    writers: HashMap<&'static str, BufWriter<File>>,
}

impl CategoryLogs {
    pub fn open(results_dir: &Path, suffix: &str) -> Result<Self, Error> {
        fs::create_dir_all(results_dir)?;
        let mut writers = HashMap::new();
        for category in CATEGORIES {
            let path = results_dir.join(format!("{}_{}.log", category, suffix));
            writers.insert(category, BufWriter::new(File::create(path)?));
        }
        Ok(Self { writers })
    }

    pub fn write(&mut self, category: &str, line: &str) -> Result<(), Error> {
        if let Some(writer) = self.writers.get_mut(category) {
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }

    /// Append the end-of-run statistics block to every category log.
    pub fn write_stats_block(&mut self, lines: &[String]) -> Result<(), Error> {
        for writer in self.writers.values_mut() {
            for line in lines {
                writeln!(writer, "{}", line)?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
