use std::{fmt, sync::Arc};

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::{
    encode_query, DataEnvelope, DeletedRecord, Id, ListParams, NoToken, ProviderError,
    ProviderOptions, RequestEngine, RequestOptions, ReqwestTransport, Result, StaticToken,
    TokenProvider, Transport,
};

/// Extracts the caller-relevant payload from a decoded response body.
pub type ResponseParser = Arc<dyn Fn(JsonValue) -> JsonValue + Send + Sync>;

/// Renders list parameters into a query string without the leading `?`.
pub type QueryRenderer = Arc<dyn Fn(&ListParams) -> String + Send + Sync>;

/// Default response parser: returns the body's `data` field when present,
/// otherwise the body itself.
pub fn unwrap_data(body: JsonValue) -> JsonValue {
    match body {
        JsonValue::Object(mut fields) if fields.contains_key("data") => {
            fields.remove("data").unwrap_or(JsonValue::Null)
        }
        other => other,
    }
}

#[derive(Clone)]
/// CRUD data provider for json-server style REST APIs.
///
/// Every operation goes through one [`RequestEngine`] with the full
/// configured retry budget and returns a [`DataEnvelope`].
pub struct JsonServerProvider {
    api_url: String,
    engine: RequestEngine,
    response_parser: ResponseParser,
    query_renderer: QueryRenderer,
}

impl fmt::Debug for JsonServerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonServerProvider")
            .field("api_url", &self.api_url)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl JsonServerProvider {
    /// Creates a provider for `api_url` with default options, no token, the
    /// `reqwest` transport, [`unwrap_data`] and [`encode_query`].
    ///
    /// `api_url` is used as given; strip any trailing slash beforehand.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            engine: RequestEngine::new(
                Arc::new(ReqwestTransport::default()),
                Arc::new(NoToken),
                ProviderOptions::default(),
            ),
            response_parser: Arc::new(unwrap_data),
            query_renderer: Arc::new(encode_query),
        }
    }

    /// Creates a provider from environment variables.
    ///
    /// Reads:
    /// - `JSON_SERVER_URL`: API base URL (required)
    /// - `JSON_SERVER_TOKEN`: static bearer token (optional)
    ///
    /// **Not available on `wasm32` targets.**
    ///
    /// # Example
    ///
    /// ```no_run
    /// use json_server_provider::JsonServerProvider;
    ///
    /// let provider = JsonServerProvider::from_env().expect("missing JSON_SERVER_URL");
    /// ```
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> std::result::Result<Self, String> {
        let url = std::env::var("JSON_SERVER_URL")
            .map_err(|_| "missing JSON_SERVER_URL environment variable".to_owned())?;
        if url.trim().is_empty() {
            return Err("JSON_SERVER_URL is set but empty".to_owned());
        }

        let provider = Self::new(url.trim());
        match std::env::var("JSON_SERVER_TOKEN") {
            Ok(token) if token.trim().is_empty() => {
                Err("JSON_SERVER_TOKEN is set but empty".to_owned())
            }
            Ok(token) => Ok(provider.with_token_provider(StaticToken::new(token.trim()))),
            Err(_) => Ok(provider),
        }
    }

    /// Applies timeout and retry options.
    pub fn with_options(mut self, opts: ProviderOptions) -> Self {
        self.engine = self.engine.with_options(opts);
        self
    }

    /// Sets the source of the bearer token.
    pub fn with_token_provider(mut self, token_provider: impl TokenProvider + 'static) -> Self {
        self.engine = self.engine.with_token_provider(Arc::new(token_provider));
        self
    }

    /// Replaces the HTTP transport.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.engine = self.engine.with_transport(Arc::new(transport));
        self
    }

    /// Replaces the response parser.
    pub fn with_response_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(JsonValue) -> JsonValue + Send + Sync + 'static,
    {
        self.response_parser = Arc::new(parser);
        self
    }

    /// Replaces the query-string renderer used by [`Self::list_many`].
    pub fn with_query_renderer<F>(mut self, renderer: F) -> Self
    where
        F: Fn(&ListParams) -> String + Send + Sync + 'static,
    {
        self.query_renderer = Arc::new(renderer);
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn engine(&self) -> &RequestEngine {
        &self.engine
    }

    /// `GET {api}/{resource}?{query}`.
    pub async fn list_many(&self, resource: &str, params: &ListParams) -> Result<DataEnvelope> {
        let query = (self.query_renderer)(params);
        let url = if query.is_empty() {
            self.collection_url(resource)
        } else {
            format!("{}?{query}", self.collection_url(resource))
        };
        self.send_parsed(&url, RequestOptions::get()).await
    }

    /// `GET {api}/{resource}/{id}`.
    pub async fn get_one(&self, resource: &str, id: impl Into<Id>) -> Result<DataEnvelope> {
        let url = self.record_url(resource, &id.into());
        self.send_parsed(&url, RequestOptions::get()).await
    }

    /// `POST {api}/{resource}` with every field of `data` except `id`.
    pub async fn create_one<T>(&self, resource: &str, data: &T) -> Result<DataEnvelope>
    where
        T: Serialize + ?Sized,
    {
        let body = without_id(to_json(data)?);
        let url = self.collection_url(resource);
        self.send_parsed(&url, RequestOptions::post(body)).await
    }

    /// `PATCH {api}/{resource}/{id}` with every field of `data` except `id`.
    pub async fn update_one<T>(
        &self,
        resource: &str,
        id: impl Into<Id>,
        data: &T,
    ) -> Result<DataEnvelope>
    where
        T: Serialize + ?Sized,
    {
        let body = without_id(to_json(data)?);
        let url = self.record_url(resource, &id.into());
        self.send_parsed(&url, RequestOptions::patch(body)).await
    }

    /// `PATCH {api}/{resource}` with `data` sent as is.
    pub async fn update_many<T>(&self, resource: &str, data: &T) -> Result<DataEnvelope>
    where
        T: Serialize + ?Sized,
    {
        let body = to_json(data)?;
        let url = self.collection_url(resource);
        self.send_parsed(&url, RequestOptions::patch(body)).await
    }

    /// `DELETE {api}/{resource}/{id}`.
    ///
    /// The result echoes `id`; the response body is never decoded, so an
    /// empty or plain-text success body is accepted.
    pub async fn delete_one(
        &self,
        resource: &str,
        id: impl Into<Id>,
    ) -> Result<DataEnvelope<DeletedRecord>> {
        let id = id.into();
        let url = self.record_url(resource, &id);
        let attempts = self.engine.options().max_retries;
        self.engine
            .execute(&url, RequestOptions::delete(), attempts, None)
            .await?;
        Ok(DataEnvelope::new(DeletedRecord { id }))
    }

    async fn send(&self, url: &str, request: RequestOptions) -> Result<JsonValue> {
        let attempts = self.engine.options().max_retries;
        self.engine
            .perform_request(url, request, attempts, None)
            .await
    }

    async fn send_parsed(&self, url: &str, request: RequestOptions) -> Result<DataEnvelope> {
        let body = self.send(url, request).await?;
        Ok(DataEnvelope::new((self.response_parser)(body)))
    }

    fn collection_url(&self, resource: &str) -> String {
        format!("{}/{resource}", self.api_url)
    }

    fn record_url(&self, resource: &str, id: &Id) -> String {
        format!("{}/{resource}/{id}", self.api_url)
    }
}

fn to_json<T: Serialize + ?Sized>(data: &T) -> Result<JsonValue> {
    serde_json::to_value(data).map_err(|err| ProviderError::Encode(err.to_string()))
}

fn without_id(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(fields) => JsonValue::Object(
            fields
                .into_iter()
                .filter(|(key, _)| key != "id")
                .collect::<Map<_, _>>(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::{unwrap_data, without_id, JsonServerProvider};
    use crate::{
        Method, RequestBody, Result, StaticToken, Transport, TransportRequest, TransportResponse,
    };

    /// Answers every request with a fixed body and keeps the last request.
    #[derive(Clone, Default)]
    struct EchoTransport {
        last: Arc<Mutex<Option<(String, TransportRequest)>>>,
    }

    #[async_trait]
    impl Transport for EchoTransport {
        async fn send(&self, url: &str, request: TransportRequest) -> Result<TransportResponse> {
            *self.last.lock().expect("last request mutex") = Some((url.to_owned(), request));
            Ok(TransportResponse::new(201, "Created", r#"{"data":{"id":1,"name":"x"}}"#))
        }
    }

    #[tokio::test]
    async fn create_one_routes_through_custom_transport() {
        let transport = EchoTransport::default();
        let provider = JsonServerProvider::new("http://api.test").with_transport(transport.clone());

        let created = provider
            .create_one("widgets", &json!({"id": 5, "name": "x"}))
            .await
            .expect("create must succeed");

        assert_eq!(created.data, json!({"id": 1, "name": "x"}));
        let (url, request) = transport
            .last
            .lock()
            .expect("last request mutex")
            .clone()
            .expect("transport must be called");
        assert_eq!(url, "http://api.test/widgets");
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, Some(RequestBody::Json(json!({"name": "x"}))));
    }

    #[test]
    fn unwrap_data_prefers_data_field() {
        assert_eq!(unwrap_data(json!({"data": [1, 2], "meta": {}})), json!([1, 2]));
        assert_eq!(unwrap_data(json!({"data": null})), json!(null));
        assert_eq!(unwrap_data(json!({"id": 1})), json!({"id": 1}));
        assert_eq!(unwrap_data(json!([{"data": 1}])), json!([{"data": 1}]));
    }

    #[test]
    fn without_id_strips_only_top_level_id() {
        assert_eq!(
            without_id(json!({"id": 5, "name": "x", "owner": {"id": 2}})),
            json!({"name": "x", "owner": {"id": 2}})
        );
        assert_eq!(without_id(json!([{"id": 1}])), json!([{"id": 1}]));
    }

    #[test]
    fn debug_redacts_token_source() {
        let provider = JsonServerProvider::new("http://localhost:3000")
            .with_token_provider(StaticToken::new("secret-token"));
        let debug = format!("{provider:?}");
        assert!(debug.contains("http://localhost:3000"));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }
}
