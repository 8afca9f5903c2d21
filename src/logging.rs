//! Logger setup for the binary.

use std::fs::File;
use std::path::Path;

use anyhow::Context;

/// Initialise `env_logger` at INFO (overridable through `RUST_LOG`).
///
/// With a path, records go to that file instead of stderr so they don't tear
/// up a terminal UI that owns the screen.
pub fn init_logger(log_file: Option<&Path>) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {:5} {}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        });

    if let Some(path) = log_file {
        let file = File::create(path).with_context(|| format!("cannot create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("logger already initialised")?;
    Ok(())
}
