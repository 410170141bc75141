// Tracing initialization for binaries and tests embedding the page lifecycle

use std::sync::Once;

use anyhow::Result;
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::{EnvFilter, Registry};

/// Filter used when neither `RUST_LOG` nor an explicit level is given
pub const DEFAULT_LOG_DIRECTIVES: &str = "info";

static TEST_INIT: Once = Once::new();

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `log_level`; both accept module directives such as
/// `pagekeep_store=debug,info`. With `json_output` set, events are written as
/// JSON lines carrying the current span list, otherwise pretty-printed.
pub fn init_tracing(log_level: Option<&str>, json_output: Option<bool>) -> Result<()> {
    let directives = log_level.unwrap_or(DEFAULT_LOG_DIRECTIVES);
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directives))?;

    let events = fmt::layer().with_span_events(FmtSpan::CLOSE).with_target(true);
    let output = if json_output.unwrap_or(false) {
        events.json().with_current_span(true).with_span_list(true).boxed()
    } else {
        events.pretty().boxed()
    };

    tracing::subscriber::set_global_default(Registry::default().with(filter).with(output))?;
    Ok(())
}

/// Debug-level subscriber writing through the test harness, installed once per process
pub fn init_test_logging() {
    TEST_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let output = fmt::layer().with_test_writer();
        // another harness may already own the global subscriber
        let _ = tracing::subscriber::set_global_default(Registry::default().with(filter).with(output));
    });
}
