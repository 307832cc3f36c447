use std::fmt;

use url::{Host, Url};

const DEFAULT_SCHEME_PREFIX: &str = "http://";
const KNOWN_SCHEME_PREFIXES: [&str; 2] = ["http://", "https://"];
const WWW_LABEL: &str = "www.";

/// A lowercase hostname with no scheme and no leading `www.` label.
///
/// Only [`normalize`] produces one, so holding a value means the input
/// survived URL parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedHostname(String);

impl NormalizedHostname {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedHostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turn free-form user input (bare hostname, `www.` name or full URL) into
/// the hostname to look up.
///
/// Returns `None` for blank input and for anything that does not parse as
/// a URL with a host. Path, query, fragment, port and credentials are dropped.
pub fn normalize(input: &str) -> Option<NormalizedHostname> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME_PREFIX, trimmed)
    };

    let url = match Url::parse(&with_scheme) {
        Ok(url) => url,
        Err(err) => {
            tracing::debug!(input = trimmed, error = %err, "input is not a valid URL");
            return None;
        }
    };

    // IP literals go to the lookup bare, without URL brackets
    let host = match url.host()? {
        Host::Domain(domain) => domain.to_lowercase(),
        Host::Ipv4(addr) => addr.to_string(),
        Host::Ipv6(addr) => addr.to_string(),
    };
    let host = host.strip_prefix(WWW_LABEL).unwrap_or(&host);

    // "www." on its own leaves nothing to look up
    if host.is_empty() {
        return None;
    }

    tracing::debug!(input = trimmed, hostname = host, "normalized input");
    Some(NormalizedHostname(host.to_string()))
}

/// Case-insensitive check for an `http://` or `https://` prefix.
fn has_http_scheme(input: &str) -> bool {
    KNOWN_SCHEME_PREFIXES.iter().any(|prefix| {
        input
            .get(..prefix.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
    })
}
