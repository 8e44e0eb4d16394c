use core::{num::NonZero, time::Duration};
use std::path::PathBuf;

use http::{Method, Uri};
use thiserror::Error;

use crate::cmd::Cmd;

/// A configuration error.
///
/// Every variant is fatal at startup: the process reports the error with
/// the usage text and exits before any producer is spawned.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),
    #[error("request count must be at least 1, got {0}")]
    InvalidRequestCount(u64),
    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),
    #[error("invalid output type {0:?}; only \"csv\" is supported")]
    InvalidOutput(String),
    #[error("invalid proxy address {0:?}")]
    InvalidProxy(String),
    #[error("could not parse header {0:?}; expected name:value")]
    InvalidHeader(String),
    #[error("could not parse basic auth {0:?}; expected username:password")]
    InvalidAuth(String),
    #[error("a target URL or a URL file is required")]
    MissingTarget,
}

/// Resolved, immutable run configuration.
///
/// Built once at startup from the command line and shared read-only with
/// every component, including the engine behind the handoff.
#[derive(Debug)]
pub struct Config {
    /// HTTP method applied to every request.
    pub method: Method,
    /// Request body.
    pub body: String,
    /// Number of requests the engine keeps in flight.
    pub concurrency: NonZero<usize>,
    /// Active stop criterion.
    pub stop: StopPolicy,
    /// Rate limit in requests per second. Zero means unlimited.
    pub rate_limit: u64,
    /// Per-request timeout applied by the engine.
    pub timeout: Option<Duration>,
    /// Report output mode.
    pub output: OutputMode,
    /// Connection policy flags consumed by the engine.
    pub policy: ConnectionPolicy,
    /// Optional HTTP proxy endpoint.
    pub proxy: Option<Uri>,
    /// Where request URLs come from.
    pub target: Target,
    /// Worker-thread budget for the runtime.
    pub cpus: NonZero<usize>,
    /// Port of the local debug endpoint.
    pub debug_port: u16,
}

impl TryFrom<Cmd> for Config {
    type Error = ConfigError;

    fn try_from(v: Cmd) -> Result<Self, Self::Error> {
        let concurrency = NonZero::new(v.concurrency).ok_or(ConfigError::InvalidConcurrency(v.concurrency))?;

        // When a time limit is given it governs termination and the request
        // count becomes unbounded, and vice versa.
        let stop = if v.duration > 0 {
            StopPolicy::Duration(Duration::from_secs(v.duration))
        } else {
            match v.requests {
                0 => return Err(ConfigError::InvalidRequestCount(0)),
                n => StopPolicy::Requests(n),
            }
        };

        let method = Method::from_bytes(v.method.to_uppercase().as_bytes())
            .map_err(|_| ConfigError::InvalidMethod(v.method.clone()))?;

        let output = match v.output.as_str() {
            "" => OutputMode::Summary,
            "csv" => OutputMode::Csv,
            other => return Err(ConfigError::InvalidOutput(other.into())),
        };

        let proxy = match &v.proxy {
            Some(addr) => {
                let uri = addr.parse::<Uri>().map_err(|_| ConfigError::InvalidProxy(addr.clone()))?;
                Some(uri)
            }
            None => None,
        };

        let target = match (v.file, v.url) {
            (Some(path), _) => Target::File(path),
            (None, Some(url)) => Target::Url(url),
            (None, None) => return Err(ConfigError::MissingTarget),
        };

        let timeout = match v.timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        let m = Self {
            method,
            body: v.body,
            concurrency,
            stop,
            rate_limit: v.rate_limit,
            timeout,
            output,
            policy: ConnectionPolicy {
                insecure: v.insecure,
                disable_compression: v.disable_compression,
                disable_keepalive: v.disable_keepalive,
                read_all: v.readall,
            },
            proxy,
            target,
            cpus: NonZero::new(v.cpus).unwrap_or(NonZero::<usize>::MIN),
            debug_port: v.debug_port,
        };

        Ok(m)
    }
}

/// Active stop criterion of a run.
///
/// Exactly one of the two bounds is active; the accessors report the
/// unbounded sentinel for the inactive side, which is what the engine
/// consumes through the handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// Stop after the given number of requests.
    Requests(u64),
    /// Stop after the given wall-clock budget.
    Duration(Duration),
}

impl StopPolicy {
    /// Request budget, `u64::MAX` when the run is time-bounded.
    #[inline]
    pub fn request_limit(&self) -> u64 {
        match self {
            Self::Requests(n) => *n,
            Self::Duration(..) => u64::MAX,
        }
    }

    /// Time budget, `Duration::MAX` when the run is request-bounded.
    #[inline]
    pub fn time_limit(&self) -> Duration {
        match self {
            Self::Requests(..) => Duration::MAX,
            Self::Duration(d) => *d,
        }
    }
}

/// Report output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable summary.
    Summary,
    /// Per-request metrics in comma-separated values format.
    Csv,
}

/// Connection policy flags.
///
/// Opaque to the producers; the engine applies them when executing
/// requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionPolicy {
    /// Allow bad/expired TLS certificates.
    pub insecure: bool,
    /// Disable response compression.
    pub disable_compression: bool,
    /// Disable keep-alive between requests.
    pub disable_keepalive: bool,
    /// Consume the entire response body.
    pub read_all: bool,
}

/// Where request URLs come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A single fixed URL.
    Url(String),
    /// A file with one URL per line, replayed indefinitely.
    File(PathBuf),
}
