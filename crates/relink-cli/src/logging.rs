use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Two sinks: pretty, timestamp-free stdout for the operator, and a
/// plain non-blocking file log that keeps the full audit trail. The
/// returned guard must stay alive for the file writer to flush.
pub fn init_logger() -> impl Drop {
    let filter = EnvFilter::new(env::var("RELINK_LOG").unwrap_or_else(|_| "info".to_string()));

    let log_file = env::var("RELINK_LOG_FILE").unwrap_or_else(|_| "logs/relink.log".to_string());
    let file_appender = tracing_appender::rolling::never("./", log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter)
        .init();

    guard
}
