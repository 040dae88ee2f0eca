pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod finder;
pub mod pathmap;
pub mod probe;
pub mod progress;
pub mod repair;
pub mod report;
pub mod storage;

pub use classify::Outcome;
pub use config::AppConfig;
pub use engine::{AuditEngine, Mode, RunReport, TargetStats};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
