//! Process logging bootstrap.
//!
//! # Responsibility
//! - Start the `flexi_logger` backend for the `log` facade once per process,
//!   writing to stderr or to a rolling file set.
//! - Report panics through the logger before the default hook runs.
//!
//! # Invariants
//! - Initialization never panics.
//! - Re-initialization with identical settings is a no-op; any other
//!   re-initialization is rejected.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const LOG_FILE_BASENAME: &str = "hbnb";
const ROTATE_AT_BYTES: u64 = 8 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 7;
const PANIC_MESSAGE_LIMIT: usize = 200;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Log sink selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Rolling files under an absolute directory.
    Directory(PathBuf),
}

impl LogTarget {
    /// Directory target when `dir` is set, stderr otherwise.
    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        dir.map_or(Self::Stderr, Self::Directory)
    }

    fn check(&self) -> Result<(), String> {
        match self {
            Self::Stderr => Ok(()),
            Self::Directory(dir) if dir.as_os_str().is_empty() => {
                Err("log directory is empty".to_string())
            }
            Self::Directory(dir) if dir.is_relative() => Err(format!(
                "log directory `{}` is relative; an absolute path is required",
                dir.display()
            )),
            Self::Directory(_) => Ok(()),
        }
    }
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stderr => f.write_str("stderr"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

struct ActiveLogger {
    level: LevelFilter,
    target: LogTarget,
    _handle: LoggerHandle,
}

/// Starts logging at `level` (`trace|debug|info|warn|error`) on `target`.
///
/// # Errors
/// - Unknown level, empty or relative directory, directory creation
///   failure, or logger backend failure.
/// - Logging already running with a different level or target.
pub fn init_logging(level: &str, target: LogTarget) -> Result<(), String> {
    let level = parse_level(level)?;
    target.check()?;

    let active = ACTIVE.get_or_try_init(|| start(level, target.clone()))?;
    if active.level == level && active.target == target {
        return Ok(());
    }
    Err(format!(
        "logging is already running at {} on {}; refusing to switch to {} on {}",
        active.level, active.target, level, target
    ))
}

/// Level and target of the running logger, if started.
pub fn logging_status() -> Option<(LevelFilter, LogTarget)> {
    ACTIVE
        .get()
        .map(|active| (active.level, active.target.clone()))
}

/// Level used when none is configured: verbose in debug builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(level: LevelFilter, target: LogTarget) -> Result<ActiveLogger, String> {
    let spec = level.as_str().to_ascii_lowercase();
    let logger = Logger::try_with_str(&spec)
        .map_err(|err| format!("log level `{spec}` rejected by backend: {err}"))?;

    let logger = match &target {
        LogTarget::Stderr => logger.log_to_stderr(),
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                format!("cannot create log directory `{}`: {err}", dir.display())
            })?;
            let files = FileSpec::default()
                .directory(dir.as_path())
                .basename(LOG_FILE_BASENAME);
            logger
                .log_to_file(files)
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
                )
                .append()
                .write_mode(WriteMode::BufferAndFlush)
                .format_for_files(flexi_logger::detailed_format)
        }
    };

    let handle = logger
        .start()
        .map_err(|err| format!("logger backend did not start: {err}"))?;
    install_panic_hook();

    info!(
        "event=logging_start module=core status=ok os={} version={} level={} target={}",
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION"),
        spec,
        target
    );
    Ok(ActiveLogger {
        level,
        target,
        _handle: handle,
    })
}

/// Accepts the `log` level names case-insensitively, plus `warning`.
fn parse_level(level: &str) -> Result<LevelFilter, String> {
    let name = level.trim();
    let name = if name.eq_ignore_ascii_case("warning") {
        "warn"
    } else {
        name
    };
    match name.parse::<LevelFilter>() {
        Ok(LevelFilter::Off) | Err(_) => Err(format!(
            "log level `{}` is not one of trace, debug, info, warn, error",
            level.trim()
        )),
        Ok(filter) => Ok(filter),
    }
}

fn install_panic_hook() {
    PANIC_HOOK.get_or_init(|| {
        let chained = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let payload = info.payload();
            let message = payload
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| payload.downcast_ref::<&str>().copied())
                .unwrap_or("<non-string payload>");
            let location = info.location().map_or_else(
                || "<unknown>".to_string(),
                |at| format!("{}:{}:{}", at.file(), at.line(), at.column()),
            );
            error!(
                "event=panic module=core status=error location={location} message={}",
                single_line(message, PANIC_MESSAGE_LIMIT)
            );
            chained(info);
        }));
    });
}

/// Replaces line breaks with spaces and cuts `text` after `limit` chars.
fn single_line(text: &str, limit: usize) -> String {
    let mut line = text
        .chars()
        .take(limit)
        .map(|ch| if matches!(ch, '\n' | '\r') { ' ' } else { ch })
        .collect::<String>();
    if text.chars().nth(limit).is_some() {
        line.push_str("...");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, parse_level, single_line, LogTarget};
    use log::LevelFilter;
    use std::path::PathBuf;

    #[test]
    fn parse_level_is_case_insensitive_and_knows_warning() {
        assert_eq!(parse_level("INFO"), Ok(LevelFilter::Info));
        assert_eq!(parse_level(" Warning "), Ok(LevelFilter::Warn));
        assert!(parse_level("off").is_err());
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn relative_log_directory_is_rejected() {
        let err = init_logging("info", LogTarget::Directory(PathBuf::from("logs/dev")))
            .unwrap_err();
        assert!(err.contains("absolute"));
    }

    #[test]
    fn single_line_flattens_and_truncates() {
        assert_eq!(single_line("a\nb\rc", 10), "a b c");
        assert_eq!(single_line("abcdef", 3), "abc...");
        assert_eq!(single_line("abc", 3), "abc");
    }

    #[test]
    fn repeated_init_is_accepted_only_with_same_settings() {
        let dir = tempfile::tempdir().unwrap();
        let target = LogTarget::Directory(dir.path().to_path_buf());

        init_logging("info", target.clone()).unwrap();
        init_logging("INFO", target.clone()).unwrap();

        let err = init_logging("debug", target.clone()).unwrap_err();
        assert!(err.contains("refusing to switch"));
        let err = init_logging("info", LogTarget::Stderr).unwrap_err();
        assert!(err.contains("refusing to switch"));

        assert_eq!(logging_status(), Some((LevelFilter::Info, target)));
    }
}
