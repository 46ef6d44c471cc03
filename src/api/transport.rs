//! HTTP transport with bounded retry and dual-mode dispatch.
//!
//! Live mode executes requests over a shared ureq agent; simulated mode
//! routes them through a [`SimTable`]. Retry policy and status validation
//! live here exclusively, so callers above never layer their own backoff.

use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::error;

use crate::api::sim::{SimRequest, SimResponse, SimTable};

/// Statuses worth another attempt: rate limiting and transient server
/// failures. Everything else fails on the first try.
const RETRY_STATUSES: [u16; 3] = [429, 500, 503];

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
}

impl Method {
    /// Idempotent requests may be retried after a connection failure;
    /// status-based retries apply regardless.
    fn idempotent(self) -> bool {
        match self {
            Method::Get => true,
        }
    }
}

enum Mode {
    Live(ureq::Agent),
    Simulated(SimTable),
}

pub struct Transport {
    mode: Mode,
    api_key: String,
    backoff_base: Duration,
}

impl Transport {
    pub fn live(api_key: &str) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            mode: Mode::Live(agent),
            api_key: api_key.to_string(),
            backoff_base: Duration::from_secs(2),
        }
    }

    pub fn simulated(table: SimTable) -> Self {
        Self {
            mode: Mode::Simulated(table),
            api_key: String::new(),
            backoff_base: Duration::ZERO,
        }
    }

    /// Execute a request, returning the response body of the first 2xx
    /// response. Non-2xx statuses are logged and surfaced as
    /// [`TransportError::Status`]; transient failures are retried up to
    /// three attempts with exponential backoff.
    pub fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<String, TransportError> {
        let body = self.request_with_retry(method, url, query)?;
        String::from_utf8(body)
            .map_err(|_| TransportError::Network("response body was not valid UTF-8".to_string()))
    }

    /// Binary fetch for image content; same retry policy as [`send`].
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.request_with_retry(Method::Get, url, &[])
    }

    fn request_with_retry(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<u8>, TransportError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let (err, retryable) = match self.dispatch(url, query) {
                Ok((status, body)) if (200..300).contains(&status) => return Ok(body),
                Ok((status, body)) => {
                    let body = String::from_utf8_lossy(&body).into_owned();
                    error!("Got response with status code {status}: {body}");
                    let retryable = RETRY_STATUSES.contains(&status);
                    (TransportError::Status { status, body }, retryable)
                }
                Err(err) => {
                    error!("Connection failure for {url}: {err}");
                    (err, method.idempotent())
                }
            };
            if !retryable || attempt >= MAX_ATTEMPTS {
                return Err(err);
            }
            thread::sleep(self.backoff_base * 2u32.saturating_pow(attempt - 1));
        }
    }

    fn dispatch(&self, url: &str, query: &[(&str, String)]) -> Result<(u16, Vec<u8>), TransportError> {
        match &self.mode {
            Mode::Live(agent) => {
                let mut request = agent.get(url);
                for (key, value) in query {
                    request = request.query(*key, value);
                }
                if !self.api_key.is_empty() {
                    request = request.header("x-api-key", &self.api_key);
                }
                let mut response = request
                    .call()
                    .map_err(|e| TransportError::Network(e.to_string()))?;
                let status = response.status().as_u16();
                let body = response
                    .body_mut()
                    .read_to_vec()
                    .map_err(|e| TransportError::Network(e.to_string()))?;
                Ok((status, body))
            }
            Mode::Simulated(table) => {
                let request = SimRequest {
                    path: url_path(url).to_string(),
                    query: query
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.clone()))
                        .collect(),
                };
                let SimResponse { status, body } = table.dispatch(&request);
                Ok((status, body.into_bytes()))
            }
        }
    }
}

/// The path component of a url: everything from the first `/` after the
/// scheme and authority. A url with no path maps to `/`.
fn url_path(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sim::SimResponse;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_table(counter: Arc<AtomicU32>, statuses: &'static [u16]) -> SimTable {
        SimTable::new().route("/v1/breeds", move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
            let status = statuses[n.min(statuses.len() - 1)];
            if status == 200 {
                SimResponse {
                    status,
                    body: "[]".to_string(),
                }
            } else {
                SimResponse::status(status)
            }
        })
    }

    #[test]
    fn succeeds_on_third_attempt_after_transient_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let transport =
            Transport::simulated(counting_table(counter.clone(), &[503, 503, 200]));

        let body = transport
            .send(Method::Get, "sim://api.test/v1/breeds", &[])
            .unwrap();
        assert_eq!(body, "[]");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn gives_up_after_three_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let transport = Transport::simulated(counting_table(counter.clone(), &[503]));

        let err = transport
            .send(Method::Get, "sim://api.test/v1/breeds", &[])
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 503, .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn does_not_retry_non_transient_status() {
        let counter = Arc::new(AtomicU32::new(0));
        let transport = Transport::simulated(counting_table(counter.clone(), &[404]));

        let err = transport
            .send(Method::Get, "sim://api.test/v1/breeds", &[])
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 404, .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retries_rate_limited_responses() {
        let counter = Arc::new(AtomicU32::new(0));
        let transport =
            Transport::simulated(counting_table(counter.clone(), &[429, 200]));

        transport
            .send(Method::Get, "sim://api.test/v1/breeds", &[])
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fetch_bytes_returns_raw_body() {
        let table = SimTable::new().route("/images/a\\.jpg", |_| SimResponse {
            status: 200,
            body: "raw".to_string(),
        });
        let transport = Transport::simulated(table);
        let bytes = transport.fetch_bytes("sim://cdn.test/images/a.jpg").unwrap();
        assert_eq!(bytes, b"raw");
    }

    #[test]
    fn query_pairs_reach_the_handler() {
        let table = SimTable::new().route("/v1/breeds", |req| {
            assert_eq!(req.query_param("page"), Some("2"));
            assert_eq!(req.query_param("limit"), Some("10"));
            SimResponse {
                status: 200,
                body: "[]".to_string(),
            }
        });
        let transport = Transport::simulated(table);
        transport
            .send(
                Method::Get,
                "sim://api.test/v1/breeds",
                &[("page", "2".to_string()), ("limit", "10".to_string())],
            )
            .unwrap();
    }

    #[test]
    fn url_path_extraction() {
        assert_eq!(url_path("https://api.test/v1/breeds"), "/v1/breeds");
        assert_eq!(url_path("sim://cdn.test/images/a.jpg"), "/images/a.jpg");
        assert_eq!(url_path("https://api.test"), "/");
    }
}
