//! Thread-safe, retrying, pluggable-authentication HTTP client core.
//!
//! Mirrors the shape of Python's `utils/net.py`: a small set of free
//! functions (`url_open`, `url_read`, `configure_auth`) backed by a
//! process-wide [`context::ClientContext`] that caches one [`service::HttpService`]
//! per host, each wired to a shared [`cookie_jar::CookieJar`] and
//! [`auth::Authenticator`].

pub mod auth;
pub mod backoff;
pub mod codec;
pub mod config;
pub mod context;
pub mod cookie_jar;
pub mod engine;
pub mod error;
pub mod message;
pub mod retry;
pub mod service;

pub use auth::AuthMethod;
pub use context::ClientContext;
pub use error::NetError;
pub use message::{HttpRequest, HttpResponse, Method};
pub use service::{HttpService, RequestOptions};

use std::collections::HashMap;
use std::sync::Arc;

use auth::OAuthOptions;
use serde_json::Value;

/// Fetches `url` and returns a (possibly streamed) response, using the
/// default process-wide context. Mirrors the distilled module's
/// `url_open` free function. `method` defaults to GET/POST by body
/// presence when omitted; see [`HttpService::request`].
pub fn url_open(url: &str, method: Option<Method>, options: RequestOptions) -> Option<HttpResponse> {
    service_for(url).request(url, method, options)
}

/// Fetches `url` and reads the full response body. Returns `None` on
/// any network error, non-retriable status, or retry exhaustion.
pub fn url_read(url: &str, options: RequestOptions) -> Option<Vec<u8>> {
    let mut response = url_open(url, None, options)?;
    response.read(None).ok()
}

/// JSON convenience wrapper over the default context's service.
pub fn json_request(
    url: &str,
    method: Method,
    body: Option<Value>,
    options: RequestOptions,
) -> Option<Value> {
    service_for(url).json_request(url, method, body, options)
}

/// Reconfigures authentication for the default context: default method,
/// per-host overrides, and OAuth options.
pub fn configure_auth(
    default: Option<AuthMethod>,
    per_host: HashMap<String, AuthMethod>,
    oauth_options: Option<OAuthOptions>,
) {
    context::default_context().configure_auth(default, per_host, oauth_options);
}

fn service_for(url: &str) -> Arc<HttpService> {
    context::default_context().service_for(url)
}
