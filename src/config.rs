use std::time::Duration;
use clap::Parser;
use thiserror::Error;
use url::Url;

/// Errors raised while validating the run configuration, before any request is sent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("URL must start with http:// or https:// (got \"{0}\")")]
    UnsupportedScheme(String),

    #[error("invalid URL \"{url}\": {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid duration \"{0}\" (examples: 500ms, 2s, 1m)")]
    InvalidDuration(String),
}

// Parse arguments for CLI
#[derive(Parser, Debug, Clone)]
#[command(name = "loadpulse", version)]
#[command(about = "Generate concurrent HTTP GET load against a single endpoint")]
#[command(
    after_help = "Examples:\n  loadpulse http://my-alb.example.com/items\n  loadpulse http://my-alb.example.com/items -w 200 -n 10000"
)]
pub struct Config {
    /// Target URL (e.g. http://my-alb.example.com/items)
    pub url: String,

    /// Number of concurrent workers
    #[arg(short = 'w', long, default_value_t = 100, env = "LOADPULSE_WORKERS")]
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: u64,

    /// Total number of requests
    #[arg(short = 'n', long, default_value_t = 5000, env = "LOADPULSE_REQUESTS")]
    pub requests: u64,

    /// Per-request timeout, covering connect through the last body byte
    #[arg(short = 'T', long, default_value = "2s", env = "LOADPULSE_TIMEOUT")]
    #[arg(value_parser = parse_duration)]
    pub timeout: Duration,

    /// Runtime worker threads (defaults to one per core)
    #[arg(short = 't', long, env = "LOADPULSE_THREADS")]
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub threads: Option<u64>,

    /// Print a progress line every N completed requests
    #[arg(long, default_value_t = 500, env = "LOADPULSE_PROGRESS_EVERY")]
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub progress_every: u64,
}

impl Config {
    /// Validate the URL argument into a [`Target`].
    pub fn target(&self) -> Result<Target, ConfigError> {
        Target::parse(&self.url)
    }
}

/// The endpoint every attempt is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: Url,
}

impl Target {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let lowered = raw.to_ascii_lowercase();
        if !lowered.starts_with("http://") && !lowered.starts_with("https://") {
            return Err(ConfigError::UnsupportedScheme(raw.to_string()));
        }
        let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
            url: raw.to_string(),
            source,
        })?;
        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// Parses strings like `500ms`, `2s`, `1m`, `1h`; a bare number means seconds.
pub fn parse_duration(duration_str: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(duration_str.to_string());
    let trimmed = duration_str.trim();

    // split into value and unit, "ms" must be checked before "s"
    let (value_str, unit) = if let Some(value) = trimmed.strip_suffix("ms") {
        (value, "ms")
    } else if let Some(value) = trimmed.strip_suffix('s') {
        (value, "s")
    } else if let Some(value) = trimmed.strip_suffix('m') {
        (value, "m")
    } else if let Some(value) = trimmed.strip_suffix('h') {
        (value, "h")
    } else {
        (trimmed, "s")
    };

    let value: u64 = value_str.parse().map_err(|_| invalid())?;
    let duration = match unit {
        "ms" => Duration::from_millis(value),
        "m" => Duration::from_secs(value * 60),
        "h" => Duration::from_secs(value * 60 * 60),
        _ => Duration::from_secs(value),
    };

    if duration.is_zero() {
        return Err(invalid());
    }
    Ok(duration)
}
