//! Purpose: Fetch widget data when the legacy `data` parameter is an http(s) URL.
//! Exports: `RemoteSource`, `fetch_json`.
//! Role: Separate input path next to the codec; the response body is plain JSON.
//! Invariants: Only http and https URLs are fetched; nothing is cached.
//! Invariants: Non-2xx statuses and unparsable bodies surface as `ErrorKind::Remote`.

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::core::error::{Error, ErrorKind};
use crate::json::parse;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct RemoteSource {
    agent: ureq::Agent,
}

impl RemoteSource {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }

    pub fn fetch_json(&self, url: &Url) -> Result<Value, Error> {
        ensure_http(url)?;
        tracing::debug!(url = %url, "fetching remote widget data");
        let response = self
            .agent
            .get(url.as_str())
            .set("Accept", "application/json")
            .call();
        match response {
            Ok(resp) => read_json_response(resp),
            Err(ureq::Error::Status(code, _)) => Err(Error::new(ErrorKind::Remote)
                .with_message(format!("remote data request failed with status {code}"))),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Remote)
                .with_message("remote data request failed")
                .with_source(err)),
        }
    }
}

impl Default for RemoteSource {
    fn default() -> Self {
        Self::new()
    }
}

/// One-off fetch with the default timeout.
pub fn fetch_json(url: &Url) -> Result<Value, Error> {
    RemoteSource::new().fetch_json(url)
}

fn ensure_http(url: &Url) -> Result<(), Error> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("unsupported remote data scheme `{scheme}`"))),
    }
}

fn read_json_response(response: ureq::Response) -> Result<Value, Error> {
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Remote)
            .with_message("failed to read remote data body")
            .with_source(err)
    })?;
    parse::from_str::<Value>(&body).map_err(|err| {
        Error::new(ErrorKind::Remote)
            .with_message("remote data is not valid JSON")
            .with_hint(parse::hint_for_error(&err, "remote.body"))
            .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_http_schemes_are_rejected_before_any_request() {
        let source = RemoteSource::new();
        let url = Url::parse("file:///etc/passwd").unwrap();
        let err = source.fetch_json(&url).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn unreachable_host_is_a_remote_error() {
        let source = RemoteSource::with_timeout(Duration::from_millis(200));
        // Port 9 on loopback (discard) is closed on test machines.
        let url = Url::parse("http://127.0.0.1:9/cards.json").unwrap();
        let err = source.fetch_json(&url).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
    }
}
