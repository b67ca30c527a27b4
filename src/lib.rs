//! `json-server-provider` is an async CRUD data provider for json-server style
//! REST APIs.
//!
//! Resources are collections addressed by path; filters, sorting and
//! pagination travel as query parameters. Every operation goes through a
//! single [`RequestEngine`] that injects the bearer token, applies the
//! timeout and retries transient failures with exponential backoff:
//! - [`JsonServerProvider::list_many`]
//! - [`JsonServerProvider::get_one`]
//! - [`JsonServerProvider::create_one`]
//! - [`JsonServerProvider::update_one`]
//! - [`JsonServerProvider::update_many`]
//! - [`JsonServerProvider::delete_one`]

mod engine;
mod error;
mod options;
mod provider;
mod query;
mod token;
mod transport;
mod types;

pub use engine::{is_retryable_status, RequestEngine, RETRYABLE_STATUSES};
pub use error::{BoxError, ProviderError};
pub use options::ProviderOptions;
pub use provider::{unwrap_data, JsonServerProvider, QueryRenderer, ResponseParser};
pub use query::{encode_query, FilterScalar, FilterValue, ListParams, SortOrder};
pub use reqwest::Method;
pub use token::{token_fn, NoToken, StaticToken, TokenFn, TokenProvider};
pub use transport::{
    Headers, ReqwestTransport, RequestBody, RequestOptions, Transport, TransportRequest,
    TransportResponse,
};
pub use types::{DataEnvelope, DeletedRecord, Id};

pub type Result<T> = std::result::Result<T, ProviderError>;
