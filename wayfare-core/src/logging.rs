//! Structured, level-filtered logging shared by every Wayfare service.
//!
//! [`init`] installs a process-wide `tracing_subscriber::Registry` exactly
//! once. It never panics and never returns `Err` from process start-up: an
//! invalid `output` value falls back to stdout with a one-line warning.

use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::sections::LogSection;

static INIT: OnceLock<()> = OnceLock::new();

/// Output target for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

/// Wire format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Fully resolved logging configuration, derived from a [`LogSection`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    pub file_path: Option<String>,
    pub max_backups: u32,
    pub compress: bool,
}

impl From<&LogSection> for LogConfig {
    fn from(section: &LogSection) -> Self {
        let level = match section.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        let format = if section.format.eq_ignore_ascii_case("text") {
            LogFormat::Text
        } else {
            LogFormat::Json
        };
        let output = match section.output.to_lowercase().as_str() {
            "stderr" => LogOutput::Stderr,
            "file" => LogOutput::File,
            _ => LogOutput::Stdout,
        };
        LogConfig {
            level,
            format,
            output,
            file_path: section.file_path.clone(),
            max_backups: section.max_backups,
            compress: section.compress,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: Level::INFO,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            file_path: None,
            max_backups: 7,
            compress: false,
        }
    }
}

/// A handle that must be kept alive for the lifetime of the process when
/// logging to a file: it owns the background flush thread for the
/// non-blocking rolling writer. Dropping it stops log writes from being
/// flushed.
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialize the global tracing subscriber. Idempotent: only the first
/// call takes effect, matching every later call returning a no-op guard.
pub fn init(config: LogConfig) -> LoggingGuard {
    if INIT.get().is_some() {
        return LoggingGuard { _file_guard: None };
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let (writer, file_guard): (BoxMakeWriter, Option<tracing_appender::non_blocking::WorkerGuard>) =
        match config.output {
            LogOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), None),
            LogOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), None),
            LogOutput::File => match &config.file_path {
                Some(path) if !path.is_empty() => match make_file_writer(path, config.max_backups) {
                    Ok((writer, guard)) => (BoxMakeWriter::new(writer), Some(guard)),
                    Err(e) => {
                        eprintln!("wayfare: failed to open log file '{path}': {e}, falling back to stdout");
                        (BoxMakeWriter::new(std::io::stdout), None)
                    }
                },
                _ => {
                    eprintln!("wayfare: log.output=file but log.filePath is empty, falling back to stdout");
                    (BoxMakeWriter::new(std::io::stdout), None)
                }
            },
        };

    let with_location = config.level == Level::DEBUG || config.level == Level::TRACE;

    let result = match config.format {
        LogFormat::Json => {
            let subscriber = tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .with_file(with_location)
                .with_line_number(with_location)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Text => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .with_file(with_location)
                .with_line_number(with_location)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    if let Err(e) = result {
        eprintln!("wayfare: tracing subscriber already set: {e}");
    }

    let _ = INIT.set(());

    if config.compress {
        if let Some(path) = &config.file_path {
            compress_stale_rotations(path);
        }
    }

    LoggingGuard { _file_guard: file_guard }
}

fn make_file_writer(
    path: &str,
    _max_backups: u32,
) -> std::io::Result<(tracing_appender::non_blocking::NonBlocking, tracing_appender::non_blocking::WorkerGuard)> {
    let path = std::path::Path::new(path);
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "log.filePath has no file name component")
    })?;
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

/// Gzip any rotated log files in `path`'s directory that aren't already
/// compressed. Best-effort: failures are logged, never propagated, since
/// compression is a housekeeping nicety, not a correctness requirement.
fn compress_stale_rotations(path: &str) {
    use std::io::Read;

    let path = std::path::Path::new(path);
    let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };
    let Some(stem) = path.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name == stem || !name.starts_with(stem) || name.ends_with(".gz") {
            continue;
        }
        let src_path = entry.path();
        let dst_path = src_path.with_extension("gz");
        if dst_path.exists() {
            continue;
        }
        let Ok(mut src) = std::fs::File::open(&src_path) else { continue };
        let mut contents = Vec::new();
        if src.read_to_end(&mut contents).is_err() {
            continue;
        }
        if let Ok(dst) = std::fs::File::create(&dst_path) {
            let mut encoder = flate2::write::GzEncoder::new(dst, flate2::Compression::default());
            use std::io::Write;
            if encoder.write_all(&contents).is_ok() && encoder.finish().is_ok() {
                let _ = std::fs::remove_file(&src_path);
            }
        }
    }
}

/// Open an `info_span!`-style scope carrying `request_id` and `service`
/// fields, the decorator every interceptor and handler enters for the
/// duration of one call.
#[macro_export]
macro_rules! request_span {
    ($service:expr, $request_id:expr) => {
        tracing::info_span!("request", service = %$service, request_id = %$request_id)
    };
}
