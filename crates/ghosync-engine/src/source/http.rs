//! HTTP fetch with bounded retry.
//!
//! [`HttpFetcher`] is the production [`Fetch`] implementation: a blocking
//! `ureq` agent that retries transport and HTTP-status failures with
//! exponential backoff. A 2xx response with an unparseable body fails
//! immediately — the server answered, retrying will not change the body.

use std::thread;
use std::time::Duration;

use serde_json::Value;
use ureq::Agent;

use crate::errors::FetchError;

const BACKOFF_BASE_MS: u64 = 1_000;
const BACKOFF_MAX_MS: u64 = 60_000;

/// Fetch a URL and return its JSON body.
///
/// The trait seam lets the extractor and orchestrator run against scripted
/// pages in tests.
pub trait Fetch {
    /// # Errors
    ///
    /// Returns [`FetchError`] once retries are exhausted or the body is
    /// not JSON.
    fn fetch(&self, url: &str) -> Result<Value, FetchError>;
}

/// Blocking HTTP client with retry.
pub struct HttpFetcher {
    agent: Agent,
    max_retries: u32,
}

impl HttpFetcher {
    /// `max_retries` counts total attempts; 0 is treated as 1.
    #[must_use]
    pub fn new(max_retries: u32, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: Agent::new_with_config(config),
            max_retries: max_retries.max(1),
        }
    }

    fn attempt(&self, url: &str) -> Result<String, ureq::Error> {
        let response = self.agent.get(url).call()?;
        response.into_body().read_to_string()
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            match self.attempt(url) {
                Ok(body) => {
                    return serde_json::from_str(&body).map_err(|source| {
                        FetchError::MalformedBody {
                            url: url.to_owned(),
                            source,
                        }
                    });
                }
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        return Err(FetchError::RetriesExhausted {
                            url: url.to_owned(),
                            attempts: attempt,
                            source: err,
                        });
                    }
                    let delay = backoff_delay(attempt - 1);
                    tracing::warn!(
                        url,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "request failed; backing off"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }
}

/// Exponential backoff: 1s, 2s, 4s, ... capped at 60s.
fn backoff_delay(attempt: u32) -> Duration {
    let ms = BACKOFF_BASE_MS.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(ms.min(BACKOFF_MAX_MS))
}
