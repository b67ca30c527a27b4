use std::{fmt, future::Future};

use async_trait::async_trait;

use crate::BoxError;

/// Supplies the bearer token attached to every request attempt.
///
/// `Ok(None)` sends the request without an `Authorization` value. An error
/// aborts the whole operation.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> std::result::Result<Option<String>, BoxError>;
}

/// Provider that never yields a token.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoToken;

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl TokenProvider for NoToken {
    async fn token(&self) -> std::result::Result<Option<String>, BoxError> {
        Ok(None)
    }
}

/// Provider returning a fixed token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticToken").field(&"<redacted>").finish()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl TokenProvider for StaticToken {
    async fn token(&self) -> std::result::Result<Option<String>, BoxError> {
        Ok(Some(self.0.clone()))
    }
}

/// Adapts an async closure into a [`TokenProvider`].
///
/// ```no_run
/// use json_server_provider::{token_fn, BoxError};
///
/// let provider = token_fn(|| async {
///     let token = std::env::var("API_TOKEN").ok();
///     Ok::<_, BoxError>(token)
/// });
/// # let _ = provider;
/// ```
pub fn token_fn<F, Fut, E>(getter: F) -> TokenFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Option<String>, E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    TokenFn(getter)
}

/// Closure-backed token provider created by [`token_fn`].
#[derive(Clone)]
pub struct TokenFn<F>(F);

impl<F> fmt::Debug for TokenFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenFn")
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<F, Fut, E> TokenProvider for TokenFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Option<String>, E>> + Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    async fn token(&self) -> std::result::Result<Option<String>, BoxError> {
        (self.0)().await.map_err(Into::into)
    }
}
