use std::{fmt, sync::Arc, time::Duration};

use reqwest::header;
use serde_json::Value as JsonValue;

// tokio::time::sleep is only available on non-WASM targets.
#[cfg(not(target_arch = "wasm32"))]
use tokio::time::sleep;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::wasm_bindgen;

use crate::{
    Headers, ProviderError, ProviderOptions, RequestOptions, Result, TokenProvider, Transport,
    TransportRequest, TransportResponse,
};

/// Statuses that are retried while attempts remain.
pub const RETRYABLE_STATUSES: [u16; 7] = [408, 500, 502, 503, 504, 522, 524];

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Returns whether a failed response status is worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Executes requests with auth injection, a fixed timeout and exponential
/// backoff retry.
#[derive(Clone)]
pub struct RequestEngine {
    transport: Arc<dyn Transport>,
    token_provider: Arc<dyn TokenProvider>,
    options: ProviderOptions,
}

impl fmt::Debug for RequestEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestEngine")
            .field("transport", &"<dyn Transport>")
            .field("token_provider", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl RequestEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        token_provider: Arc<dyn TokenProvider>,
        options: ProviderOptions,
    ) -> Self {
        Self {
            transport,
            token_provider,
            options,
        }
    }

    pub fn with_options(mut self, options: ProviderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_token_provider(mut self, token_provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = token_provider;
        self
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    /// Sends `request` to `url` and returns the decoded JSON body.
    ///
    /// `retries_remaining` is the number of attempts still allowed, counting
    /// this one. `current_backoff` is the wait before the next retry and
    /// defaults to the configured initial backoff. Only failed responses with
    /// a status in [`RETRYABLE_STATUSES`] are retried; transport and token
    /// errors propagate immediately.
    pub async fn perform_request(
        &self,
        url: &str,
        request: RequestOptions,
        retries_remaining: u32,
        current_backoff: Option<Duration>,
    ) -> Result<JsonValue> {
        self.execute(url, request, retries_remaining, current_backoff)
            .await?
            .json()
    }

    /// Runs the retry loop of [`Self::perform_request`] and returns the
    /// successful response without decoding its body.
    pub async fn execute(
        &self,
        url: &str,
        request: RequestOptions,
        retries_remaining: u32,
        current_backoff: Option<Duration>,
    ) -> Result<TransportResponse> {
        let mut remaining = retries_remaining;
        let mut backoff = current_backoff.unwrap_or_else(|| self.options.initial_backoff());

        loop {
            let token = self
                .token_provider
                .token()
                .await
                .map_err(ProviderError::Token)?;

            let mut headers = Headers::new();
            headers.set(header::CONTENT_TYPE.as_str(), Some(JSON_CONTENT_TYPE.to_owned()));
            headers.set(
                header::AUTHORIZATION.as_str(),
                token.map(|token| format!("Bearer {token}")),
            );
            headers.merge(request.headers.clone());

            let response = self
                .transport
                .send(
                    url,
                    TransportRequest {
                        method: request.method.clone(),
                        headers,
                        body: request.body.clone(),
                        timeout: self.options.timeout(),
                    },
                )
                .await?;

            if response.is_success() {
                return Ok(response);
            }

            if remaining > 1 && is_retryable_status(response.status) {
                self.wait_before_retry(response.status, remaining, backoff)
                    .await;
                remaining -= 1;
                backoff = backoff.saturating_mul(2);
                continue;
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                status = response.status,
                url,
                "request failed: {}",
                response.status_text
            );

            return Err(ProviderError::Http {
                status: response.status,
                status_text: response.status_text,
            });
        }
    }

    /// Waits before the next retry attempt.
    async fn wait_before_retry(&self, status: u16, remaining: u32, delay: Duration) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            status,
            remaining = remaining - 1,
            "retrying request after {} ms",
            delay.as_millis()
        );
        #[cfg(not(feature = "tracing"))]
        let _ = (status, remaining);

        sleep(delay).await;
    }
}

// No tokio timer on WASM; wait on a `setTimeout` promise instead.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = setTimeout)]
    fn set_timeout(handler: &js_sys::Function, timeout_ms: i32) -> wasm_bindgen::JsValue;
}

#[cfg(target_arch = "wasm32")]
async fn sleep(delay: Duration) {
    let timeout_ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        set_timeout(&resolve, timeout_ms);
    });
    // The promise only ever resolves.
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}
