//! HTTP layer shared by the Rekor and GitHub clients: status mapping and retry.
//!
//! This is the ONLY place for status code handling. The clients only see
//! [`HttpOutcome`].

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{RequestBuilder, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::error::{VerifyError, VerifyResult};
use crate::types::VerifierConfig;

pub(crate) const USER_AGENT_VALUE: &str = concat!("scorecard-verify/", env!("CARGO_PKG_VERSION"));

/// Outcome of a request: 404 is reported, not raised, so each client can
/// give it its own meaning.
#[derive(Debug)]
pub(crate) enum HttpOutcome {
    Found(reqwest::Response),
    NotFound,
}

/// reqwest client plus retry budget for one upstream service.
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    client: reqwest::Client,
    service: &'static str,
    max_retries: u32,
}

impl HttpBackend {
    pub(crate) fn new(service: &'static str, config: &VerifierConfig) -> VerifyResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| VerifyError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            service,
            max_retries: config.max_retries,
        })
    }

    /// Send the request built by `build`, retrying transient failures.
    pub(crate) async fn send<F>(&self, build: F) -> VerifyResult<HttpOutcome>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        use rand::Rng;

        let mut retries = 0;

        loop {
            let result = self.send_once(build(&self.client)).await;

            match result {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;

                    let backoff = match &e {
                        VerifyError::RateLimited {
                            retry_after: Some(retry_after),
                            ..
                        } => {
                            let capped = (*retry_after).min(Duration::from_secs(30));
                            let base_ms = capped.as_millis() as u64;
                            let jitter_factor: f64 =
                                rand::thread_rng().gen_range(0.9_f64..=1.1_f64);
                            let jittered_ms = ((base_ms as f64) * jitter_factor).round() as u64;
                            Duration::from_millis(jittered_ms.max(100))
                        }
                        _ => {
                            let base_backoff = Duration::from_secs(1 << retries);
                            let base_backoff = base_backoff.min(Duration::from_secs(30));
                            let jittered_ms =
                                rand::thread_rng().gen_range(0..=base_backoff.as_millis() as u64);
                            Duration::from_millis(jittered_ms.max(10))
                        }
                    };

                    warn!(
                        service = self.service,
                        error = %e,
                        retry = retries,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying request"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, request: RequestBuilder) -> VerifyResult<HttpOutcome> {
        let response = request.send().await?;
        let status = response.status();
        debug!(service = self.service, status = status.as_u16(), url = %response.url(), "response");

        match status {
            s if s.is_success() => Ok(HttpOutcome::Found(response)),

            StatusCode::NOT_FOUND => Ok(HttpOutcome::NotFound),

            StatusCode::TOO_MANY_REQUESTS => Err(VerifyError::RateLimited {
                service: self.service,
                retry_after: retry_after(response.headers()),
            }),

            // GitHub signals primary rate limits with 403 + remaining=0.
            StatusCode::FORBIDDEN if rate_limit_exhausted(response.headers()) => {
                Err(VerifyError::RateLimited {
                    service: self.service,
                    retry_after: retry_after(response.headers()),
                })
            }

            s if s.is_server_error() => {
                let message = response.text().await.unwrap_or_else(|_| s.to_string());
                Err(VerifyError::Network {
                    message: format!("{} HTTP {}: {}", self.service, s.as_u16(), truncate(&message)),
                })
            }

            s => {
                let message = response.text().await.unwrap_or_else(|_| s.to_string());
                Err(VerifyError::invalid_response(format!(
                    "{} HTTP {}: {}",
                    self.service,
                    s.as_u16(),
                    truncate(&message)
                )))
            }
        }
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false)
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Parse a configured base URL.
pub(crate) fn parse_base_url(name: &str, url: &str) -> VerifyResult<Url> {
    let parsed = Url::parse(url).map_err(|e| VerifyError::Config {
        message: format!("invalid {} URL {:?}: {}", name, url, e),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(VerifyError::Config {
            message: format!("{} URL {:?} cannot be a base", name, url),
        });
    }
    Ok(parsed)
}

/// Append percent-encoded path segments to `base`.
pub(crate) fn endpoint<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
