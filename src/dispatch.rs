//! HTTP delivery of due callbacks.
//!
//! Delivery is at-most-once: any failure is terminal and only logged, and the
//! persisted definition file is removed regardless of the outcome.

use crate::config::{Authentication, Callback};
use crate::store::CallbackHandle;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info, warn};

/// Correlation header carried on every delivery.
const TRACE_ID_HEADER: &str = "X-Rps-TraceId";
/// Read timeout per delivery attempt.
const READ_TIMEOUT: Duration = Duration::from_secs(2);
/// Connect timeout per delivery attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// Upper bound for the whole attempt, including connection acquisition.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends the POST for a due callback and cleans up its definition file.
pub struct HttpDispatcher {
    client: Client,
}

impl HttpDispatcher {
    /// Create a dispatcher with bounded connect/read/total timeouts.
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("callback HTTP client");
        Self { client }
    }

    /// Deliver one persisted callback, then remove its definition file.
    pub async fn run(&self, handle: CallbackHandle) {
        match handle.load() {
            Ok(callback) => self.deliver(&callback).await,
            Err(err) => error!(error = %err, "unable to read callback definition"),
        }
        handle.remove();
    }

    async fn deliver(&self, callback: &Callback) {
        let mut request = self.client.post(callback.url.as_str()).json(&callback.data);
        if let Some(trace_id) = &callback.trace_id {
            request = request.header(TRACE_ID_HEADER, trace_id.as_str());
        }
        // credentials go out with the first request, no challenge round-trip
        if let Some(Authentication::Basic { username, password }) = &callback.authentication {
            request = request.basic_auth(username, Some(password));
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                info!(url = %callback.url, status = %response.status(), "callback delivered");
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!(
                    url = %callback.url,
                    %status,
                    body = %body,
                    "callback delivery failed"
                );
            }
            Err(err) => {
                error!(
                    url = %callback.url,
                    error = %err,
                    payload = %callback.data,
                    "callback delivery errored"
                );
            }
        }
    }
}

impl Default for HttpDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
