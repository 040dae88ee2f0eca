use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "relink")]
#[command(about = "Audit and repair file links between target tables and the content store", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Classify every configured target row without changing anything
    Verify,
    /// Classify and repair every repairable row
    Repair,
    /// Prepare content-store directories, ledger tables and link columns
    Init,
    /// Search a directory for the files listed in a CSV selection file
    Find {
        /// CSV selection file (';' delimited)
        #[arg(short = 'f', long)]
        data_file: PathBuf,
        /// Name of the column holding the file path
        #[arg(short = 'p', long)]
        path_column: String,
        /// Directory to index and search
        #[arg(short = 's', long)]
        source_dir: PathBuf,
        /// Copy matches under this directory (omit to skip copying)
        #[arg(short = 't', long)]
        target_dir: Option<PathBuf>,
    },
    /// Copy stored files out of a content store for a CSV selection of
    /// fileset ids
    Extract {
        /// CSV selection file (';' delimited)
        #[arg(short = 'f', long)]
        data_file: PathBuf,
        /// Name of the column holding the fileset id
        #[arg(short = 'i', long)]
        id_column: String,
        /// Configured fileset id naming the store to read
        #[arg(short = 's', long)]
        fileset: String,
        /// Target directory; {Column} placeholders expand from each row
        #[arg(short = 't', long)]
        target: String,
        /// Resolve and report without copying files
        #[arg(long)]
        test: bool,
    },
    /// Print configuration values
    PrintConfig,
}
