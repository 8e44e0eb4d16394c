use core::num::NonZero;
use std::{io, path::PathBuf};

use clap::{ArgAction, CommandFactory, Parser};

/// HTTP load generator.
///
/// Produces ready-to-send requests for a fixed target URL or a file-backed
/// URL list and hands them to the benchmarking engine over a bounded queue.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
#[command(disable_help_flag = true)]
pub struct Cmd {
    /// Target URL.
    ///
    /// Required unless a URL file is given with `-f`. When both are given
    /// the file wins.
    #[clap(required_unless_present = "file")]
    pub url: Option<String>,
    /// HTTP method, one of GET, POST, PUT, DELETE, HEAD, OPTIONS.
    #[clap(short, default_value = "GET")]
    pub method: String,
    /// Custom HTTP headers, name1:value1;name2:value2.
    #[clap(short = 'h', value_name = "HEADERS")]
    pub headers: Option<String>,
    /// HTTP request body.
    #[clap(short = 'd', default_value = "")]
    pub body: String,
    /// HTTP Accept header.
    #[clap(short = 'A')]
    pub accept: Option<String>,
    /// Content-Type header.
    #[clap(short = 'T', default_value = "text/html")]
    pub content_type: String,
    /// Basic authentication, username:password.
    #[clap(short = 'a')]
    pub auth: Option<String>,
    /// Consume the entire response body.
    #[clap(long)]
    pub readall: bool,
    /// Output type. If none provided, a summary is printed.
    /// "csv" is the only supported alternative.
    #[clap(short = 'o', default_value = "", value_name = "MODE")]
    pub output: String,
    /// Path to a file with URLs to request, one per line.
    ///
    /// The file is replayed indefinitely, in order.
    #[clap(short = 'f', value_name = "PATH")]
    pub file: Option<PathBuf>,
    /// Number of requests to run concurrently.
    #[clap(short = 'c', default_value_t = 4)]
    pub concurrency: usize,
    /// Number of requests to run.
    #[clap(short = 'n', default_value_t = 200)]
    pub requests: u64,
    /// Time limit for the benchmark in seconds. When given, `-n` is ignored.
    #[clap(short = 't', default_value_t = 0)]
    pub duration: u64,
    /// Rate limit in requests per second. Zero means unlimited.
    #[clap(short = 'q', default_value_t = 0)]
    pub rate_limit: u64,
    /// Per-request timeout in milliseconds. Zero means no timeout.
    #[clap(short = 's', default_value_t = 0)]
    pub timeout_ms: u64,
    /// Secret key used to derive the X-Perf-Test header.
    #[clap(short = 'k', default_value = "")]
    pub secret_key: String,
    /// Number of worker threads for the runtime.
    #[clap(long, default_value_t = default_cpus())]
    pub cpus: usize,
    /// Port of the local debug/introspection endpoint.
    #[clap(short = 'p', default_value_t = 6060)]
    pub debug_port: u16,
    /// Allow bad/expired TLS certificates.
    #[clap(long = "allow-insecure")]
    pub insecure: bool,
    /// Disable response compression.
    #[clap(long)]
    pub disable_compression: bool,
    /// Disable keep-alive, preventing re-use of TCP connections between
    /// different HTTP requests.
    #[clap(long)]
    pub disable_keepalive: bool,
    /// HTTP proxy address as host:port.
    #[clap(short = 'x', value_name = "ADDR")]
    pub proxy: Option<String>,
    /// Be verbose in terms of logging.
    #[clap(short, action = ArgAction::Count)]
    pub verbose: u8,
    /// Print help.
    #[clap(long, action = ArgAction::HelpLong)]
    help: Option<bool>,
}

impl Cmd {
    /// Writes the full usage text to the given stream.
    pub fn write_usage(out: &mut impl io::Write) -> io::Result<()> {
        let help = Self::command().render_long_help();
        writeln!(out, "{help}")
    }
}

fn default_cpus() -> usize {
    std::thread::available_parallelism().map(NonZero::get).unwrap_or(1)
}
