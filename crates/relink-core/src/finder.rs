//! Best-effort file finder. Given a CSV selection file naming a path
//! column, indexes a source directory by file name and looks up each
//! row's file, optionally copying matches into a per-row directory
//! under a target root. Results land in `found.csv` next to the
//! selection file.

use crate::error::Error;
use dashmap::DashMap;
use glob::Pattern;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub struct FinderOptions {
    pub data_file: PathBuf,
    pub path_column: String,
    pub source_dir: PathBuf,
    /// When set, every match is copied under `<target_dir>/<row index>/`.
    pub target_dir: Option<PathBuf>,
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FinderStats {
    pub rows: usize,
    pub empty_paths: usize,
    pub found: usize,
    pub not_found: usize,
    pub single_match: usize,
    pub double_match: usize,
    pub many_matches: usize,
    pub total_matches: usize,
    pub copy_failed: usize,
}

/// Parallel recursive index of a directory: file name → every path
/// carrying that name. Permission errors are logged and skipped; the
/// search stays best-effort.
pub fn index_files(
    source_dir: &Path,
    ignore_globs: &[String],
) -> io::Result<DashMap<String, Vec<PathBuf>>> {
    let map: DashMap<String, Vec<PathBuf>> = DashMap::new();

    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    visit_dirs(source_dir, &map, &ignore_patterns)?;
    Ok(map)
}

fn visit_dirs(
    dir: &Path,
    map: &DashMap<String, Vec<PathBuf>>,
    ignore_patterns: &[Pattern],
) -> io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    if ignore_patterns
        .iter()
        .any(|pattern| pattern.matches_path(dir))
    {
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Skipping directory {}: {}", dir.display(), err);
            return Ok(());
        }
    };

    entries.par_bridge().try_for_each(|entry_result| {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping entry in {}: {}", dir.display(), err);
                return Ok(());
            }
        };

        let path = entry.path();
        if path.is_dir() {
            visit_dirs(&path, map, ignore_patterns)?;
        } else if !ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(&path))
        {
            if let Some(name) = path.file_name() {
                map.entry(name.to_string_lossy().into_owned())
                    .or_default()
                    .push(path.clone());
            }
        }
        Ok::<_, io::Error>(())
    })?;

    Ok(())
}

pub fn run(options: &FinderOptions) -> Result<FinderStats, Error> {
    info!("Indexing files under {}...", options.source_dir.display());
    let index = index_files(&options.source_dir, &options.ignore_patterns)?;
    let indexed: usize = index.iter().map(|entry| entry.value().len()).sum();
    info!("Index complete: {} files, searching...", indexed);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(&options.data_file)?;
    let headers = reader.headers()?.clone();
    let path_index = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(&options.path_column))
        .ok_or_else(|| {
            Error::InvalidConfig(format!(
                "column '{}' not present in {}",
                options.path_column,
                options.data_file.display()
            ))
        })?;

    let out_path = options
        .data_file
        .with_file_name("found.csv");
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(&out_path)?;
    let mut out_headers: Vec<String> = headers.iter().map(str::to_string).collect();
    out_headers.push("matches".to_string());
    writer.write_record(&out_headers)?;

    let mut stats = FinderStats::default();
    for (row_index, record) in reader.records().enumerate() {
        let record = record?;
        stats.rows += 1;

        let raw_path = record.get(path_index).unwrap_or("").trim();
        if raw_path.is_empty() || raw_path.eq_ignore_ascii_case("null") {
            stats.empty_paths += 1;
            continue;
        }

        let file_name = Path::new(raw_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let matches: Vec<PathBuf> = index
            .get(&file_name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        debug!("Search for {}: {} matches", file_name, matches.len());

        match matches.len() {
            0 => stats.not_found += 1,
            1 => {
                stats.found += 1;
                stats.single_match += 1;
            }
            2 => {
                stats.found += 1;
                stats.double_match += 1;
            }
            _ => {
                stats.found += 1;
                stats.many_matches += 1;
            }
        }
        stats.total_matches += matches.len();

        if let Some(target_dir) = &options.target_dir {
            if !matches.is_empty() {
                stats.copy_failed += copy_matches(target_dir, row_index, &matches);
            }
        }

        let mut out_record: Vec<String> = record.iter().map(str::to_string).collect();
        out_record.push(
            matches
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(";"),
        );
        writer.write_record(&out_record)?;
    }
    writer.flush()?;

    info!("Results written to {}", out_path.display());
    Ok(stats)
}

/// Copy every match into `<target_dir>/<row index>/`, disambiguating by
/// match index. Copy failures are logged and counted, never fatal: the
/// remaining rows still get their copies and `found.csv` entries.
fn copy_matches(target_dir: &Path, row_index: usize, matches: &[PathBuf]) -> usize {
    let row_dir = target_dir.join(format!("row_{}", row_index + 1));
    if let Err(err) = fs::create_dir_all(&row_dir) {
        warn!("Could not create {}: {}", row_dir.display(), err);
        return matches.len();
    }

    let mut failed = 0;
    for (match_index, found) in matches.iter().enumerate() {
        let stem = found
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = found
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let destination = row_dir.join(format!("{}_{}{}", stem, match_index, extension));
        debug!(
            "   >>> Copying {} => {}",
            found.display(),
            destination.display()
        );
        if let Err(err) = fs::copy(found, &destination) {
            warn!(
                "Could not copy {} to {}: {}",
                found.display(),
                destination.display(),
                err
            );
            failed += 1;
        }
    }
    failed
}
