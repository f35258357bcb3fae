//! Developer log: a leveled stderr sink with caller location
//! (`spec.md` §2.2, §6 "Log output format").
//!
//! Lines look like `LEVEL|ss.ss|file:line|msg`, with ANSI color applied to
//! WARN/ERROR/CRITICAL lines. `tracing`/`tracing-subscriber` already carry
//! the level, file, and line for every event; this module only supplies a
//! [`tracing_subscriber::fmt::FormatEvent`] that renders them in that exact
//! shape instead of the crate's default human or JSON formats.

use std::fmt;
use std::time::Instant;

use tracing::{Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const RESET: &str = "\x1b[0m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const BOLD_RED: &str = "\x1b[1;31m";

fn level_tag(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "TRCE",
        Level::DEBUG => "DEBG",
        Level::INFO => "INFO",
        Level::WARN => "WARN",
        Level::ERROR => "ERRR",
    }
}

fn color_for(level: &Level) -> Option<&'static str> {
    match *level {
        Level::WARN => Some(YELLOW),
        Level::ERROR => Some(RED),
        _ => None,
    }
}

/// Renders events as `LEVEL|ss.ss|file:line|msg`.
///
/// `ss.ss` is seconds elapsed since this formatter was installed, not a
/// wall-clock time of day, so it never wraps and stays meaningful across a
/// process's whole lifetime.
///
/// There is no separate CRITICAL tracing level; callers that need the
/// spec's "CRIT" treatment emit at `ERROR` with a `critical = true` field,
/// and this formatter upgrades the color (bold red) when it sees that
/// field. Everything else about an `ERROR` event is unaffected.
pub struct DblEventFormat {
    installed_at: Instant,
}

impl DblEventFormat {
    /// Capture the install instant that `ss.ss` is measured from.
    #[must_use]
    pub fn new() -> Self {
        Self {
            installed_at: Instant::now(),
        }
    }
}

impl Default for DblEventFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N> FormatEvent<S, N> for DblEventFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let clock = self.installed_at.elapsed().as_secs_f64();

        let file = metadata.file().unwrap_or("?");
        let line = metadata.line().unwrap_or(0);

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let is_critical = visitor.critical;

        let color = if is_critical {
            Some(BOLD_RED)
        } else {
            color_for(metadata.level())
        };

        if let Some(color) = color {
            write!(writer, "{color}")?;
        }
        write!(
            writer,
            "{}|{clock:05.2}|{file}:{line}|{}",
            level_tag(metadata.level()),
            visitor.message.unwrap_or_default()
        )?;
        if color.is_some() {
            write!(writer, "{RESET}")?;
        }
        writeln!(writer)
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
    critical: bool,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        if field.name() == "critical" {
            self.critical = value;
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

/// Install the developer log subscriber as the global default.
///
/// `debug` lowers the effective filter to `debug`; otherwise the filter
/// follows `RUST_LOG` with an `info` fallback. Errors are surfaced to the
/// caller rather than swallowed, since a failed subscriber install leaves
/// the process logging nowhere.
pub fn init(debug: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let default_directive = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(DblEventFormat::new())
        .try_init()
}
