// src/logging.rs

//! Logging setup for `dobi` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag, then `-v` / `-q`
//! 2. `DOBI_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that container output on stdout stays clean.
//! Lines look like `[WARN] [job:run compile] message key=value`; INFO lines
//! carry no level prefix.

use std::fmt::{self, Write as _};
use std::io::IsTerminal;

use anyhow::Result;
use owo_colors::OwoColorize;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::cli::LogLevel;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("DOBI_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(Level::INFO),
    };

    let ansi = std::io::stderr().is_terminal();

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(ansi)
        .event_format(LevelPrefixFormat)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

/// Event formatter producing `[LEVEL] task message extra=fields`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LevelPrefixFormat;

impl<S, N> FormatEvent<S, N> for LevelPrefixFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let ansi = writer.has_ansi_escapes();
        write_level(&mut writer, *event.metadata().level(), ansi)?;

        let mut fields = EventFields::default();
        event.record(&mut fields);
        writer.write_str(&fields.render())?;
        writeln!(writer)
    }
}

fn write_level(writer: &mut Writer<'_>, level: Level, ansi: bool) -> fmt::Result {
    let label = match level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARN",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
        _ => return Ok(()),
    };
    if !ansi {
        return write!(writer, "[{label}] ");
    }
    match level {
        Level::ERROR => write!(writer, "[{}] ", label.red()),
        Level::WARN => write!(writer, "[{}] ", label.yellow()),
        _ => write!(writer, "[{}] ", label.bright_black()),
    }
}

/// Collects the message, the `task` field and any other fields of an event.
#[derive(Debug, Default)]
struct EventFields {
    task: Option<String>,
    message: String,
    extra: Vec<(String, String)>,
}

impl EventFields {
    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(task) = &self.task {
            out.push_str(task);
            if !self.message.is_empty() {
                out.push(' ');
            }
        }
        out.push_str(&self.message);
        for (key, value) in &self.extra {
            let _ = write!(out, " {key}={value}");
        }
        out
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "task" => self.task = Some(value.to_string()),
            name => self.extra.push((name.to_string(), value.to_string())),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "task" => self.task = Some(format!("{value:?}")),
            name => self.extra.push((name.to_string(), format!("{value:?}"))),
        }
    }
}
