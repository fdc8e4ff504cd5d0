use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::progress::ProgressSettings;
use crate::status::Language;
use crate::sync::{RetryPolicy, SyncSettings};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the portal.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub portal: PortalConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            portal: PortalConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Simulation and intake knobs for the portal service.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub language: Language,
    pub progress: ProgressSettings,
    pub sync: SyncSettings,
    pub upload_max_bytes: u64,
    /// Fixed seed for mock data and simulated randomness; entropy when absent.
    pub seed: Option<u64>,
}

pub const DEFAULT_UPLOAD_MAX_BYTES: u64 = 10 * 1024 * 1024;

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            language: Language::English,
            progress: ProgressSettings::default(),
            sync: SyncSettings::default(),
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            seed: None,
        }
    }
}

impl PortalConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let language = match env::var("APP_LANGUAGE") {
            Ok(raw) => Language::from_code(&raw).ok_or(ConfigError::InvalidValue {
                key: "APP_LANGUAGE",
                value: raw,
            })?,
            Err(_) => defaults.language,
        };

        let tick_ms = parse_var("PORTAL_TICK_MS", defaults.progress.tick.as_millis() as u64)?;
        let step_min = parse_var("PORTAL_STEP_MIN", defaults.progress.min_step)?;
        let step_max = parse_var("PORTAL_STEP_MAX", defaults.progress.max_step)?;
        if tick_ms == 0 || step_min == 0 || step_min > step_max || step_max > 100 {
            return Err(ConfigError::InvalidProgress {
                tick_ms,
                step_min,
                step_max,
            });
        }

        let sync_delay_ms = parse_var(
            "PORTAL_SYNC_DELAY_MS",
            defaults.sync.sync_delay.as_millis() as u64,
        )?;
        let failure_rate = parse_var("PORTAL_SYNC_FAILURE_RATE", defaults.sync.failure_rate)?;
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(ConfigError::InvalidValue {
                key: "PORTAL_SYNC_FAILURE_RATE",
                value: failure_rate.to_string(),
            });
        }

        let retry = match env::var("PORTAL_SYNC_RETRY") {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "manual" => RetryPolicy::Manual,
                "backoff" => RetryPolicy::Backoff {
                    max_attempts: parse_var("PORTAL_SYNC_MAX_ATTEMPTS", 3u32)?,
                    base_delay: Duration::from_millis(parse_var(
                        "PORTAL_SYNC_BACKOFF_MS",
                        1_000u64,
                    )?),
                },
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "PORTAL_SYNC_RETRY",
                        value: raw,
                    })
                }
            },
            Err(_) => defaults.sync.retry,
        };

        let upload_max_bytes = parse_var("PORTAL_UPLOAD_MAX_BYTES", defaults.upload_max_bytes)?;
        let seed = match env::var("PORTAL_SEED") {
            Ok(raw) => Some(raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: "PORTAL_SEED",
                value: raw,
            })?),
            Err(_) => None,
        };

        Ok(Self {
            language,
            progress: ProgressSettings {
                tick: Duration::from_millis(tick_ms),
                min_step: step_min,
                max_step: step_max,
            },
            sync: SyncSettings {
                sync_delay: Duration::from_millis(sync_delay_ms),
                failure_rate,
                retry,
            },
            upload_max_bytes,
            seed,
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
    InvalidProgress { tick_ms: u64, step_min: u8, step_max: u8 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an unsupported value '{value}'")
            }
            ConfigError::InvalidProgress {
                tick_ms,
                step_min,
                step_max,
            } => write!(
                f,
                "progress settings out of range (tick {tick_ms}ms, step {step_min}..={step_max})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::InvalidProgress { .. } => None,
        }
    }
}
