use colored::*;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Console formatter for extraction progress.
///
/// Info lines are printed plain so the batch summary reads cleanly; skipped
/// files and broken inputs get a colored level tag so they stand out in a
/// long run.
pub struct ExtractionFormatter;

impl<S, N> FormatEvent<S, N> for ExtractionFormatter
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
        let mut buffer = String::new();
        let mut buf_writer = Writer::new(&mut buffer);
        ctx.format_fields(buf_writer.by_ref(), event)?;

        let line = match *event.metadata().level() {
            Level::ERROR => format!("{} {}", "[error]".red().bold(), buffer.red()),
            Level::WARN => format!("{} {}", "[skip]".yellow().bold(), buffer.yellow()),
            Level::INFO => buffer,
            Level::DEBUG => format!("{} {}", "[debug]".blue(), buffer.dimmed()),
            Level::TRACE => format!("{} {}", "[trace]".purple(), buffer.dimmed()),
        };

        writeln!(writer, "{}", line)
    }
}

/// Log filter for the binary: `RUST_LOG` wins, otherwise info or debug
pub fn env_filter(verbose: bool) -> EnvFilter {
    let fallback = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global subscriber
pub fn init(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .event_format(ExtractionFormatter)
        .init();
}
