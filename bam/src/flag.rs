use chrono::{DateTime, Local};
use http::HeaderName;
use md5::{Digest, Md5};

/// Name of the header carrying the keyed test flag.
pub const TEST_FLAG_HEADER: HeaderName = HeaderName::from_static("x-perf-test");

/// Computes the keyed integrity flag for the given run start time.
///
/// The digest input is the start time truncated to hour granularity
/// followed by the secret key. The flag is computed once per run: a run
/// that crosses an hour boundary keeps the value it started with.
pub fn test_flag(key: &str, at: DateTime<Local>) -> String {
    let bucket = at.format("%Y%m%d%H").to_string();

    let mut hash = Md5::new();
    hash.update(bucket.as_bytes());
    hash.update(key.as_bytes());

    hex::encode(hash.finalize())
}
