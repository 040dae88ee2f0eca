mod commands;
mod logging;
mod progress;

use std::process;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use relink_core::extract::{self, ExtractOptions};
use relink_core::finder::{self, FinderOptions};
use relink_core::{AppConfig, AuditEngine, Mode};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match relink_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    // Startup and preflight failures must be visible to callers, so
    // every failing arm exits non-zero.
    match args.command {
        Some(Commands::Verify) => {
            if let Err(err) = run_audit(&config, Mode::Verify) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::Repair) => {
            if let Err(err) = run_audit(&config, Mode::Repair) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::Init) => {
            let engine = AuditEngine::new(config.clone());
            match engine.prepare() {
                Ok(()) => info!("Content stores and ledger tables prepared"),
                Err(err) => {
                    error!("Error preparing stores: {}", err);
                    process::exit(1);
                }
            }
        }
        Some(Commands::Find {
            data_file,
            path_column,
            source_dir,
            target_dir,
        }) => {
            let options = FinderOptions {
                data_file,
                path_column,
                source_dir,
                target_dir,
                ignore_patterns: vec![],
            };
            if let Err(err) = run_find(&options) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::Extract {
            data_file,
            id_column,
            fileset,
            target,
            test,
        }) => {
            let options = ExtractOptions {
                data_file,
                id_column,
                fileset_id: fileset,
                target_template: target,
                dry_run: test,
            };
            if let Err(err) = run_extract(&config, &options) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn run_audit(config: &AppConfig, mode: Mode) -> anyhow::Result<()> {
    let engine = AuditEngine::new(config.clone());
    let reporter = CliReporter::new();
    let report = engine.run(mode, &reporter)?;

    println!();
    for stats in &report.targets {
        info!(
            "{} / {}: {} rows, {} consistent, {} inconsistent, {} empty",
            stats.table_name,
            stats.path_column,
            stats.rows,
            format!("{}", stats.consistent).green(),
            format!("{}", stats.inconsistent()).red(),
            stats.empty_path,
        );
        if report.mode == Mode::Repair {
            info!(
                "{} repaired, {} repairs failed",
                format!("{}", stats.repaired).cyan(),
                format!("{}", stats.repair_failed).red(),
            );
        }
    }
    info!("Run completed in {:.2}s", report.duration.as_secs_f64());

    Ok(())
}

fn run_find(options: &FinderOptions) -> anyhow::Result<()> {
    let stats = finder::run(options)?;

    println!();
    info!("Total matches: {}", stats.total_matches);
    info!(
        "Files found: {}",
        format!("{}", stats.found).green()
    );
    info!(
        "Files not found: {}",
        format!("{}", stats.not_found).red()
    );
    info!("Rows with empty paths: {}", stats.empty_paths);
    info!("Results with 1 match: {}", stats.single_match);
    info!("Results with 2 matches: {}", stats.double_match);
    info!("Results with 3 or more matches: {}", stats.many_matches);
    if stats.copy_failed > 0 {
        info!(
            "Copies failed: {}",
            format!("{}", stats.copy_failed).red()
        );
    }

    Ok(())
}

fn run_extract(config: &AppConfig, options: &ExtractOptions) -> anyhow::Result<()> {
    let stats = extract::run(config, options)?;

    println!();
    info!("Rows processed: {}", stats.rows);
    info!(
        "Files extracted: {}",
        format!("{}", stats.extracted).green()
    );
    info!("Rows with empty fileset ids: {}", stats.empty_ids);
    info!(
        "Ledger records missing: {}",
        format!("{}", stats.missing_records).red()
    );
    if stats.copy_failed > 0 {
        info!(
            "Copies failed: {}",
            format!("{}", stats.copy_failed).red()
        );
    }

    Ok(())
}
