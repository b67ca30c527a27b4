//! Transport contract consumed by the request engine, plus the default
//! `reqwest`-backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method, StatusCode};
use serde_json::Value as JsonValue;

use crate::{ProviderError, Result};

/// Ordered, case-insensitive header list.
///
/// A header may be present without a value; transports must treat such an
/// entry as unset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, Option<String>)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any entry with the same name in place.
    pub fn set(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        match self
            .0
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => *slot = (name, value),
            None => self.0.push((name, value)),
        }
    }

    /// Returns the value of a header, or `None` when missing or value-less.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .and_then(|(_, value)| value.as_deref())
    }

    /// Returns whether the header key is present, with or without a value.
    pub fn contains(&self, name: &str) -> bool {
        self.0
            .iter()
            .any(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }

    /// Overlays `other` on top of `self`; entries of `other` win.
    pub fn merge(&mut self, other: Headers) {
        for (name, value) in other.0 {
            self.set(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.set(name, Some(value.into()));
        }
        headers
    }
}

/// Request payload handed to the transport.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// Structured body, serialized when the content type allows it.
    Json(JsonValue),
    /// Pre-rendered body, sent unmodified.
    Text(String),
}

impl From<JsonValue> for RequestBody {
    fn from(value: JsonValue) -> Self {
        Self::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Per-call request description passed to the request engine.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<RequestBody>,
    /// Extra headers; they override the engine defaults.
    pub headers: Headers,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: Headers::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn post(body: impl Into<RequestBody>) -> Self {
        Self::new(Method::POST).with_body(body)
    }

    pub fn patch(body: impl Into<RequestBody>) -> Self {
        Self::new(Method::PATCH).with_body(body)
    }

    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, Some(value.into()));
        self
    }
}

/// Fully resolved request as seen by a [`Transport`].
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub headers: Headers,
    pub body: Option<RequestBody>,
    pub timeout: Duration,
}

/// Response returned by a [`Transport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON. An empty body decodes to `null`.
    pub fn json(&self) -> Result<JsonValue> {
        if self.body.trim().is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_str(&self.body).map_err(|err| {
            ProviderError::Decode(format!(
                "invalid response JSON: {err}; body: {}",
                self.body
            ))
        })
    }
}

/// Executes one HTTP round-trip.
///
/// Errors returned here are failures before any status was obtained and are
/// never retried by the engine. Non-2xx statuses must be returned as a
/// [`TransportResponse`], not as an error.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, request: TransportRequest) -> Result<TransportResponse>;
}

/// Default transport built on `reqwest`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps a preconfigured `reqwest` client.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Transport for ReqwestTransport {
    async fn send(&self, url: &str, request: TransportRequest) -> Result<TransportResponse> {
        let body = encode_body(request.body, request.headers.get(header::CONTENT_TYPE.as_str()))?;

        // On WASM, reqwest uses AbortController for the timeout.
        let mut builder = self
            .http
            .request(request.method, url)
            .timeout(request.timeout);
        for (name, value) in request.headers.iter() {
            if let Some(value) = value {
                builder = builder.header(name, value);
            }
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let status_text = status_text(&response);
        let body = response.text().await?;

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}

/// The reason phrase the server sent, else the canonical one, else
/// `HTTP <code>`.
#[cfg(not(target_arch = "wasm32"))]
fn status_text(response: &reqwest::Response) -> String {
    // hyper only records the phrase when it differs from the canonical one.
    match response.extensions().get::<hyper::ext::ReasonPhrase>() {
        Some(phrase) => String::from_utf8_lossy(phrase.as_bytes()).into_owned(),
        None => canonical_status_text(response.status()),
    }
}

#[cfg(target_arch = "wasm32")]
fn status_text(response: &reqwest::Response) -> String {
    canonical_status_text(response.status())
}

fn canonical_status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

/// Turns a request body into bytes.
///
/// String bodies always pass through unmodified. A structured body is
/// serialized when the content type is missing, JSON or text-like; for any
/// other content type it passes through as its JSON text, with a JSON string
/// sent raw.
pub(crate) fn encode_body(
    body: Option<RequestBody>,
    content_type: Option<&str>,
) -> Result<Option<Vec<u8>>> {
    match body {
        None => Ok(None),
        Some(RequestBody::Text(text)) => Ok(Some(text.into_bytes())),
        Some(RequestBody::Json(value)) => {
            if content_type.map_or(true, is_serializable_content_type) {
                return serde_json::to_vec(&value)
                    .map(Some)
                    .map_err(|err| ProviderError::Encode(err.to_string()));
            }
            match value {
                JsonValue::String(text) => Ok(Some(text.into_bytes())),
                other => Ok(Some(other.to_string().into_bytes())),
            }
        }
    }
}

fn is_serializable_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("text/") || essence.ends_with("/json") || essence.ends_with("+json")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{encode_body, Headers, RequestBody, TransportResponse};
    use crate::ProviderError;

    #[test]
    fn headers_replace_case_insensitively_in_place() {
        let mut headers: Headers = [("Content-Type", "a"), ("X-Trace", "1")]
            .into_iter()
            .collect();
        headers.set("content-type", Some("b".to_owned()));

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("CONTENT-TYPE"), Some("b"));
        assert_eq!(headers.iter().next(), Some(("content-type", Some("b"))));
    }

    #[test]
    fn valueless_header_is_present_but_unset() {
        let mut headers = Headers::new();
        headers.set("Authorization", None);
        assert!(headers.contains("authorization"));
        assert_eq!(headers.get("authorization"), None);
    }

    #[test]
    fn json_body_serialized_for_json_and_text_types() {
        for content_type in [
            "application/json; charset=UTF-8",
            "application/merge-patch+json",
            "text/plain",
        ] {
            let bytes = encode_body(Some(RequestBody::Json(json!({"a": 1}))), Some(content_type))
                .expect("must encode")
                .expect("must have body");
            assert_eq!(bytes, br#"{"a":1}"#.to_vec());
        }
    }

    #[test]
    fn string_body_passes_through_for_any_type() {
        let bytes = encode_body(
            Some(RequestBody::Text("raw=1".to_owned())),
            Some("application/x-www-form-urlencoded"),
        )
        .expect("must encode")
        .expect("must have body");
        assert_eq!(bytes, b"raw=1".to_vec());
    }

    #[test]
    fn structured_body_passes_through_for_other_types() {
        let bytes = encode_body(
            Some(RequestBody::Json(json!({"a": 1}))),
            Some("application/octet-stream"),
        )
        .expect("must encode")
        .expect("must have body");
        assert_eq!(bytes, br#"{"a":1}"#.to_vec());

        let bytes = encode_body(
            Some(RequestBody::Json(json!("title=hello&draft=1"))),
            Some("application/x-www-form-urlencoded"),
        )
        .expect("must encode")
        .expect("must have body");
        assert_eq!(bytes, b"title=hello&draft=1".to_vec());
    }

    #[test]
    fn response_success_range() {
        assert!(TransportResponse::new(204, "No Content", "").is_success());
        assert!(!TransportResponse::new(304, "Not Modified", "").is_success());
        assert!(!TransportResponse::new(503, "Service Unavailable", "").is_success());
    }

    #[test]
    fn empty_body_decodes_to_null_and_garbage_fails() {
        assert_eq!(
            TransportResponse::new(200, "OK", "  ").json().expect("must decode"),
            serde_json::Value::Null
        );
        let err = TransportResponse::new(200, "OK", "<html>")
            .json()
            .expect_err("must fail");
        assert!(matches!(err, ProviderError::Decode(_)));
    }
}
