use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Local};
use http::{header, HeaderMap, HeaderName, HeaderValue};
use regex::Regex;

use crate::{cfg::ConfigError, flag};

/// Pattern a `name:value` header pair must match.
pub const HEADER_PATTERN: &str = r"^([\w-]+):\s*(.+)";
/// Pattern a `username:password` auth string must match.
pub const AUTH_PATTERN: &str = r"^(.+):([^\s].+)";

/// Basic auth credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// Parses a `username:password` string into a [`Credential`].
pub fn parse_credential(v: &str) -> Result<Credential, ConfigError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(AUTH_PATTERN).expect("valid pattern"));

    let caps = re.captures(v).ok_or_else(|| ConfigError::InvalidAuth(v.into()))?;

    let m = Credential {
        username: caps[1].to_string(),
        password: caps[2].to_string(),
    };

    Ok(m)
}

/// Builds the immutable header set shared by every constructed request.
///
/// Application order is Content-Type, test flag, custom headers, Accept; a
/// later write to the same name overrides the earlier one. The returned
/// map is never written again, which is what makes sharing it across the
/// producers safe.
pub fn assemble(
    content_type: &str,
    secret_key: &str,
    custom: Option<&str>,
    accept: Option<&str>,
    start: DateTime<Local>,
) -> Result<Arc<HeaderMap>, ConfigError> {
    let mut map = HeaderMap::new();

    map.insert(header::CONTENT_TYPE, parse_value(content_type)?);

    let flag = flag::test_flag(secret_key, start);
    map.insert(flag::TEST_FLAG_HEADER, parse_value(&flag)?);

    if let Some(custom) = custom {
        for pair in custom.split(';') {
            let (name, value) = parse_header(pair)?;
            map.insert(name, value);
        }
    }

    if let Some(accept) = accept {
        map.insert(header::ACCEPT, parse_value(accept)?);
    }

    Ok(Arc::new(map))
}

/// Parses a single `name:value` pair.
fn parse_header(pair: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(HEADER_PATTERN).expect("valid pattern"));

    let caps = re.captures(pair).ok_or_else(|| ConfigError::InvalidHeader(pair.into()))?;

    let name = HeaderName::from_bytes(caps[1].as_bytes()).map_err(|_| ConfigError::InvalidHeader(pair.into()))?;
    let value = parse_value(&caps[2])?;

    Ok((name, value))
}

fn parse_value(v: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(v).map_err(|_| ConfigError::InvalidHeader(v.into()))
}

#[cfg(test)]
mod test {
    use super::*;

    fn now() -> DateTime<Local> {
        Local::now()
    }

    #[test]
    fn test_custom_header_pairs() {
        let map = assemble("text/html", "", Some("X-Foo:bar;X-Baz: qux"), None, now()).unwrap();

        assert_eq!(map.get("x-foo").unwrap(), "bar");
        assert_eq!(map.get("x-baz").unwrap(), "qux");
    }

    #[test]
    fn test_pair_without_colon_is_fatal() {
        let err = assemble("text/html", "", Some("X-Foo bar"), None, now()).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidHeader(..)));
    }

    #[test]
    fn test_defaults_and_flag_present() {
        let map = assemble("text/html", "secret", None, None, now()).unwrap();

        assert_eq!(map.get(header::CONTENT_TYPE).unwrap(), "text/html");
        assert_eq!(map.get(&flag::TEST_FLAG_HEADER).unwrap().len(), 32);
        assert!(map.get(header::ACCEPT).is_none());
    }

    #[test]
    fn test_custom_header_overrides_content_type() {
        let map = assemble("text/html", "", Some("Content-Type:application/json"), None, now()).unwrap();

        assert_eq!(map.get(header::CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_accept_applied_last() {
        let map = assemble("text/html", "", Some("Accept:text/plain"), Some("application/json"), now()).unwrap();

        assert_eq!(map.get(header::ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_credential() {
        let cred = parse_credential("alice:secret").unwrap();

        assert_eq!(cred.username, "alice");
        assert_eq!(cred.password, "secret");
    }

    #[test]
    fn test_credential_without_separator_is_fatal() {
        assert!(matches!(parse_credential("noseparator"), Err(ConfigError::InvalidAuth(..))));
    }
}
