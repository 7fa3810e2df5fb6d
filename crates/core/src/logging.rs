//! Logging and observability
//!
//! Structured logging through `tracing-subscriber`, in text or JSON form,
//! selected at runtime via environment variables and CLI flags.
//!
//! All logging output is directed to stderr to preserve stdout for command output.

use anyhow::Result;
use std::{io, sync::Once};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable selecting the log format (`json` or text)
pub const LOG_FORMAT_ENV: &str = "SLIDEKIT_LOG_FORMAT";
/// Environment variable holding the log filter directive
pub const LOG_FILTER_ENV: &str = "SLIDEKIT_LOG";
/// Environment variable selecting span lifecycle events
pub const LOG_SPAN_EVENTS_ENV: &str = "SLIDEKIT_LOG_SPAN_EVENTS";

/// Initialize the logging system with an optional output format
///
/// Safe to call multiple times; only the first call installs a subscriber.
///
/// ## Arguments
///
/// * `format` - `None` or `"text"` for human-readable output, `"json"` for
///   structured JSON. Falls back to `SLIDEKIT_LOG_FORMAT`.
///
/// ## Environment Variables
///
/// * `SLIDEKIT_LOG_FORMAT` - log output format
/// * `SLIDEKIT_LOG` - log filter directive
/// * `RUST_LOG` - standard filter variable, used as fallback
/// * `SLIDEKIT_LOG_SPAN_EVENTS` - comma separated span events (`new`, `close`, `full`, ...)
///
/// ## Example
///
/// ```rust
/// use slidekit_core::logging;
///
/// logging::init(None).expect("Failed to initialize logging");
/// ```
pub fn init(format: Option<&str>) -> Result<()> {
    INIT.call_once(|| {
        let filter = create_env_filter();

        let env_format = std::env::var(LOG_FORMAT_ENV).ok();
        let effective_format = format.or(env_format.as_deref()).unwrap_or("text");
        let span_events = span_events_for_format(effective_format);

        match effective_format {
            "json" => {
                tracing_subscriber::registry()
                    .with(
                        fmt::layer()
                            .json()
                            .with_target(true)
                            .with_span_events(span_events)
                            .with_writer(io::stderr),
                    )
                    .with(filter)
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(
                        fmt::layer()
                            .with_target(true)
                            .with_span_events(span_events)
                            .with_writer(io::stderr),
                    )
                    .with(filter)
                    .init();
            }
        }

        tracing::debug!("Logging initialized with format: {}", effective_format);
    });

    Ok(())
}

/// Create an EnvFilter based on environment variables
fn create_env_filter() -> EnvFilter {
    if let Ok(directive) = std::env::var(LOG_FILTER_ENV) {
        EnvFilter::try_new(&directive).unwrap_or_else(|_| {
            tracing::warn!(
                "Invalid {} directive '{}', using default 'info'",
                LOG_FILTER_ENV,
                directive
            );
            EnvFilter::new("info")
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Determine span lifecycle event configuration based on env var and format
fn span_events_for_format(format: &str) -> fmt::format::FmtSpan {
    use fmt::format::FmtSpan;

    if let Ok(raw) = std::env::var(LOG_SPAN_EVENTS_ENV) {
        return parse_span_events(&raw);
    }

    match format {
        "json" => FmtSpan::NEW | FmtSpan::CLOSE,
        _ => FmtSpan::NONE,
    }
}

fn parse_span_events(raw: &str) -> fmt::format::FmtSpan {
    use fmt::format::FmtSpan;

    let mut acc = FmtSpan::NONE;
    for token in raw.split(&[',', '|'][..]).map(|t| t.trim().to_lowercase()) {
        acc |= match token.as_str() {
            "new" => FmtSpan::NEW,
            "close" => FmtSpan::CLOSE,
            "enter" => FmtSpan::ENTER,
            "exit" => FmtSpan::EXIT,
            "active" => FmtSpan::ACTIVE,
            "full" => FmtSpan::FULL,
            _ => FmtSpan::NONE,
        };
    }
    acc
}

/// Check if logging has been initialized
pub fn is_initialized() -> bool {
    INIT.is_completed()
}
