//! Logging Setup
//!
//! Builds the `env_logger` backend from [`LoggingConfig`]. Records go to
//! stderr and, when a log file is configured, are appended to that file too.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};

use env_logger::{Builder, Env, Target};

use crate::config::LoggingConfig;
use crate::utils::error::{AppError, AppResult, IntoAppError};

/// Writer duplicating every log record to stderr and an optional file
pub struct TeeWriter {
    file: Option<File>,
}

impl TeeWriter {
    pub fn new(file: Option<File>) -> Self {
        Self { file }
    }

    /// Opens `path` in append mode, creating it when missing
    pub fn with_file(path: &str) -> AppResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .into_app_error("Failed to open log file")?;
        Ok(Self::new(Some(file)))
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Install the global logger. `RUST_LOG` still overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> AppResult<()> {
    let writer = match config.file.as_deref() {
        Some(path) => TeeWriter::with_file(path)?,
        None => TeeWriter::new(None),
    };

    Builder::from_env(Env::default().default_filter_or(config.level.as_str()))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(writer)))
        .try_init()
        .map_err(|e| AppError::Configuration(format!("Failed to initialize logging: {}", e)))
}
