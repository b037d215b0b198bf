//! Provide tracing, tailored to the port executables.
//!
//! Both ports call [`init_journald_or_stderr`] first thing in `main`. Stdout
//! carries the command channel, so log output must never go there.
//!
//! The rest of the crate uses `use crate::tracing::prelude::*` for the
//! `trace!()`, `debug!()`, `info!()`, `warn!()`, and `error!()` macros.

use std::env;
use std::io;

use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime, FormatFields},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Initialize logging.
///
/// Under systemd (where the host itself usually runs), log to journald;
/// otherwise to stderr, which the host inherits.
pub fn init_journald_or_stderr() {
    if env::var("JOURNAL_STREAM").is_ok() {
        if let Ok(layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(layer)
                .init();
            return;
        }
        use_stderr();
        error!("Failed to initialize journald logging, using stderr.");
    } else {
        use_stderr();
    }
}

// Filter according to RUST_LOG, overriding the default level (ERROR) to INFO.
fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy()
}

fn use_stderr() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(false)
                .fmt_fields(tracing_subscriber::fmt::format::DefaultFields::new())
                .event_format(PortFormatter),
        )
        .init();
}

/// Event formatter: `HH:MM:SS LEVEL [pid] target: message key=value ...`
///
/// The process id matters because a host typically runs several ports at
/// once and they all share its stderr.
struct PortFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for PortFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        LocalTimer.format_time(&mut writer)?;

        let level = *event.metadata().level();
        write!(writer, " {:<5} [{}] ", level.as_str(), std::process::id())?;

        // Our own module paths are noise without the crate prefix
        let target = event.metadata().target();
        let target = target.strip_prefix("hwport::").unwrap_or(target);
        write!(writer, "{}: ", target)?;

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

// Local time to the nearest second; the default timer is UTC with a long,
// ugly format.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or(OffsetDateTime::now_utc());
        let formatted = now
            .format(time::macros::format_description!(
                "[hour]:[minute]:[second]"
            ))
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{}", formatted)
    }
}
