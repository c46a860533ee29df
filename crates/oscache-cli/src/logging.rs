//! Logging setup — maps the configured debug level onto `tracing`.
//!
//! Console output goes to stdout and file output is appended to the
//! configured log file. Both write `[time] [pid] [   LEVEL] message` lines.

use std::fmt::{self, Write as _};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{ChronoLocal, FormatTime};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

use oscache_core::config::DebugLevel;

/// Timestamp format for every log line.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `[2014-05-12 13:05:01] [4242] [ WARNING] message key=value`
pub struct LineFormat {
    timer: ChronoLocal,
}

impl LineFormat {
    pub fn new() -> Self {
        Self {
            timer: ChronoLocal::new(TIME_FORMAT.to_string()),
        }
    }
}

impl Default for LineFormat {
    fn default() -> Self {
        Self::new()
    }
}

/// Severity names as the log file has always spelled them.
fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        writer.write_char('[')?;
        self.timer.format_time(&mut writer)?;
        write!(
            writer,
            "] [{}] [{:>8}] ",
            std::process::id(),
            level_name(event.metadata().level())
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Where log lines go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Handlers {
    pub console: bool,
    pub file: bool,
}

/// `tracing` filter for a configured severity.
pub fn level_filter(level: DebugLevel) -> LevelFilter {
    match level {
        DebugLevel::NotSet => LevelFilter::OFF,
        DebugLevel::Debug => LevelFilter::DEBUG,
        DebugLevel::Info => LevelFilter::INFO,
        DebugLevel::Warning => LevelFilter::WARN,
        DebugLevel::Error | DebugLevel::Critical => LevelFilter::ERROR,
    }
}

/// Pick handlers for `oscache update`.
///
/// An explicit level must name at least one handler. Without one, the
/// configured level decides whether the log file is written, and
/// `--console` adds stdout.
pub fn resolve_handlers(
    cli_level: Option<DebugLevel>,
    config_level: DebugLevel,
    console: bool,
    log_to_file: bool,
) -> Result<(DebugLevel, Handlers)> {
    match cli_level {
        Some(level) => {
            if !console && !log_to_file {
                anyhow::bail!("--debug-level requires --console, --log-to-file, or both");
            }
            Ok((
                level,
                Handlers {
                    console,
                    file: log_to_file,
                },
            ))
        }
        None => Ok((
            config_level,
            Handlers {
                console,
                file: log_to_file || config_level.is_enabled(),
            },
        )),
    }
}

/// Install the global subscriber.
pub fn init(level: DebugLevel, handlers: Handlers, log_file: &Path) -> Result<()> {
    let filter = level_filter(level);
    if filter == LevelFilter::OFF {
        return Ok(());
    }

    let console = handlers.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .event_format(LineFormat::new())
    });

    let file = if handlers.file {
        let handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("failed to open log file {}", log_file.display()))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(handle))
                .with_ansi(false)
                .event_format(LineFormat::new()),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(filter)
        .try_init()
        .context("failed to install logger")
}

/// Warnings-only stderr logger used while the config itself is loading.
pub fn bootstrap_dispatch() -> tracing::Dispatch {
    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(LevelFilter::WARN);
    tracing::Dispatch::new(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_mapping() {
        assert_eq!(level_filter(DebugLevel::NotSet), LevelFilter::OFF);
        assert_eq!(level_filter(DebugLevel::Debug), LevelFilter::DEBUG);
        assert_eq!(level_filter(DebugLevel::Info), LevelFilter::INFO);
        assert_eq!(level_filter(DebugLevel::Warning), LevelFilter::WARN);
        assert_eq!(level_filter(DebugLevel::Error), LevelFilter::ERROR);
        assert_eq!(level_filter(DebugLevel::Critical), LevelFilter::ERROR);
    }

    #[test]
    fn test_explicit_level_requires_handler() {
        assert!(resolve_handlers(Some(DebugLevel::Debug), DebugLevel::Info, false, false).is_err());
    }

    #[test]
    fn test_explicit_level_uses_flags() {
        let (level, handlers) =
            resolve_handlers(Some(DebugLevel::Debug), DebugLevel::NotSet, true, false).unwrap();
        assert_eq!(level, DebugLevel::Debug);
        assert_eq!(
            handlers,
            Handlers {
                console: true,
                file: false
            }
        );
    }

    #[test]
    fn test_config_level_writes_file() {
        let (level, handlers) =
            resolve_handlers(None, DebugLevel::Warning, false, false).unwrap();
        assert_eq!(level, DebugLevel::Warning);
        assert!(handlers.file);
        assert!(!handlers.console);
    }

    #[test]
    fn test_notset_config_skips_file() {
        let (_, handlers) = resolve_handlers(None, DebugLevel::NotSet, true, false).unwrap();
        assert!(!handlers.file);
        assert!(handlers.console);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .event_format(LineFormat::new()),
        );
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_line_format_layout() {
        let out = capture(|| tracing::warn!(path = "/tmp/x", "could not remove working file"));
        let line = out.trim_end();

        let pid = std::process::id().to_string();
        let prefix_end = "[2014-05-12 13:05:01]".len();
        assert!(line.starts_with('['));
        assert_eq!(&line[prefix_end - 1..prefix_end], "]");
        let rest = &line[prefix_end..];
        assert_eq!(
            rest,
            format!(" [{pid}] [ WARNING] could not remove working file path=\"/tmp/x\"")
        );
    }

    #[test]
    fn test_line_format_pads_short_levels() {
        let out = capture(|| {
            tracing::info!("starting cache update");
            tracing::error!("cache update failed");
        });
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("] [    INFO] starting cache update"));
        assert!(lines[1].contains("] [   ERROR] cache update failed"));
    }

    #[test]
    fn test_init_off_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("never.log");
        init(
            DebugLevel::NotSet,
            Handlers {
                console: true,
                file: true,
            },
            &log,
        )
        .unwrap();
        assert!(!log.exists());
    }
}
