use crate::error::Error;
use config::{Config, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub owner_user_id: i64,
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    /// Compare blake3 content hashes when sizes match. Off by default:
    /// the audit contract only requires size equality.
    #[serde(default)]
    pub verify_content: bool,
    pub filesets: Vec<FilesetConfig>,
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub path_map: Vec<PathMapRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// One content store: a ledger table plus a directory tree on disk.
/// `root` must already exist; `subdir` is created on demand.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesetConfig {
    pub id: String,
    pub table_name: String,
    pub root: String,
    #[serde(default)]
    pub subdir: String,
}

impl FilesetConfig {
    pub fn store_dir(&self) -> PathBuf {
        Path::new(&self.root).join(&self.subdir)
    }
}

/// One externally owned table/column pair to audit.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub table_name: String,
    pub path_column: String,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    pub link_column: String,
    pub fileset_id: String,
    /// Narrow the fetch to rows whose link column is still unset.
    #[serde(default)]
    pub only_missing_links: bool,
    /// Descriptive columns carried into log lines, never interpreted.
    #[serde(default)]
    pub info_columns: Vec<InfoColumn>,
}

impl TargetConfig {
    /// File-name suffix for this target's category logs.
    pub fn suffix(&self) -> String {
        format!("T-{}_C-{}", self.table_name, self.path_column)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfoColumn {
    pub name: String,
    pub description: String,
}

/// Ordered prefix substitution; the first matching rule wins.
#[derive(Debug, Clone, Deserialize)]
pub struct PathMapRule {
    pub from: String,
    pub to: String,
}

fn default_results_dir() -> String {
    "results".to_string()
}

fn default_id_column() -> String {
    "id".to_string()
}

pub fn load_configuration() -> Result<AppConfig, Error> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(ConfigFile::with_name("Config.local").required(false))
        .build()?;
    let cfg = builder.try_deserialize::<AppConfig>()?;
    cfg.validate()?;
    Ok(cfg)
}

impl AppConfig {
    pub fn fileset(&self, id: &str) -> Option<&FilesetConfig> {
        self.filesets.iter().find(|f| f.id == id)
    }

    /// Cross-checks performed once at load time. Table and column names
    /// are interpolated into SQL text, so they are restricted to a fixed
    /// identifier alphabet here; row values are always bound as
    /// parameters.
    pub fn validate(&self) -> Result<(), Error> {
        for fileset in &self.filesets {
            check_identifier(&fileset.table_name)?;
            let duplicates = self
                .filesets
                .iter()
                .filter(|f| f.id == fileset.id)
                .count();
            if duplicates > 1 {
                return Err(Error::InvalidConfig(format!(
                    "duplicate fileset id '{}'",
                    fileset.id
                )));
            }
        }

        for target in &self.targets {
            check_identifier(&target.table_name)?;
            check_identifier(&target.path_column)?;
            check_identifier(&target.id_column)?;
            check_identifier(&target.link_column)?;
            for column in &target.info_columns {
                check_identifier(&column.name)?;
            }

            if self.fileset(&target.fileset_id).is_none() {
                return Err(Error::InvalidConfig(format!(
                    "target {} references unknown fileset id '{}'",
                    target.table_name, target.fileset_id
                )));
            }
        }

        Ok(())
    }
}

fn check_identifier(name: &str) -> Result<(), Error> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "'{}' is not a valid SQL identifier",
            name
        )))
    }
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
