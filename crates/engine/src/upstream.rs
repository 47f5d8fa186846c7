//! Cache-aside upstream origin client
//!
//! On a local miss the engine asks the configured origin for the key via
//! `GET {base}/{percent-encoded key}` with a hard request timeout. Anything
//! other than a 200 with a JSON body is a miss; misses are never cached.

use hearth_core::{Error, Result, Value};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::time::Duration;
use tracing::debug;

/// Per-request timeout for upstream fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

// Path-segment encode set: controls plus the characters that would change
// how the origin parses the request path.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

/// Blocking HTTP client for the upstream origin.
pub struct UpstreamClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl UpstreamClient {
    /// Build a client for the given origin base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|err| Error::Upstream(err.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Fetch the value for `key` from the origin.
    ///
    /// Returns `Error::Upstream` on transport failure, a non-200 status,
    /// or a body that does not decode as JSON. Callers treat every error
    /// as a plain miss.
    pub fn fetch(&self, key: &str) -> Result<Value> {
        let url = format!(
            "{}/{}",
            self.base_url,
            utf8_percent_encode(key, PATH_SEGMENT)
        );
        debug!(%url, "fetching from upstream");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| Error::Upstream(err.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(Error::Upstream(format!(
                "origin returned {} for '{key}'",
                response.status()
            )));
        }

        response
            .json::<Value>()
            .map_err(|err| Error::Upstream(format!("origin body not JSON: {err}")))
    }
}
