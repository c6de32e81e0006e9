//! `tracing` setup shared by the client host and the seed job.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps the background file writer alive; hold it until exit.
pub struct FileLogGuard {
    _worker: WorkerGuard,
}

/// Where (and whether) log lines are mirrored to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub file_dir: Option<PathBuf>,
    pub file_name: String,
}

impl LogSettings {
    /// `ENABLE_FILE_LOGS=true|1` turns on the daily file in `LOG_DIR`
    /// (default `./logs`).
    pub fn from_env(filter: &str, file_name: &str) -> Self {
        let file_logs = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| matches!(v.trim(), "true" | "1"))
            .unwrap_or(false);
        let file_dir = file_logs.then(|| {
            std::env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./logs"))
        });

        Self {
            filter: filter.to_string(),
            file_dir,
            file_name: file_name.to_string(),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Installs the global subscriber from the environment. Later calls keep
/// the first subscriber.
pub fn init_tracing(log_level: &str, file_name: &str) -> Option<FileLogGuard> {
    init_with(&LogSettings::from_env(log_level, file_name))
}

pub fn init_with(settings: &LogSettings) -> Option<FileLogGuard> {
    let stdout = fmt::layer().with_target(true).boxed();

    let (file, guard) = match open_file_writer(settings) {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(FileLogGuard { _worker: guard }))
        }
        None => (None, None),
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(settings.env_filter())
        .with(stdout)
        .with(file)
        .try_init()
    {
        tracing::debug!(error = %err, "global subscriber already set, keeping it");
    }

    guard
}

fn open_file_writer(
    settings: &LogSettings,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = settings.file_dir.as_ref()?;
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("failed to create log directory {}: {err}", dir.display());
        return None;
    }
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, &settings.file_name);
    Some(tracing_appender::non_blocking(appender))
}
