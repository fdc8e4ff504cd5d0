use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "invalid APP_LOG_LEVEL '{value}': not a tracing filter")
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

const PORTAL_TARGETS: [&str; 2] = ["roads_portal", "roads_portal_api"];

/// Per-tick progress events are only emitted at trace level.
const TICK_TARGET: &str = "roads_portal::progress::simulator";

/// Expands a bare level such as `debug` into per-target directives. Dependencies never log
/// louder than `warn`. Filters that already name a target pass through untouched.
pub fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if level.contains(['=', ',']) {
        return level.to_string();
    }

    let dependencies = match level.to_ascii_lowercase().as_str() {
        "error" | "off" => level.to_string(),
        _ => "warn".to_string(),
    };
    let mut directives = vec![dependencies];
    directives.extend(PORTAL_TARGETS.iter().map(|target| format!("{target}={level}")));
    if level.eq_ignore_ascii_case("trace") {
        directives.push(format!("{TICK_TARGET}=debug"));
    }
    directives.join(",")
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directives(&config.log_level)).map_err(|source| {
            TelemetryError::EnvFilter {
                value: config.log_level.clone(),
                source,
            }
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
