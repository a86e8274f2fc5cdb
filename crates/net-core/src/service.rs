//! `HttpService`: ties the retry controller, an authenticator, and the
//! transport engine into `request()`/`json_request()`.
//!
//! Grounded on Python's `HttpService.request` -- a generator-driven retry
//! loop that reattempts on connection/timeout errors, retries once after
//! an opportunistic re-auth on 401/403, and classifies the remaining
//! status codes as transient or terminal.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde_json::Value;

use crate::auth::Authenticator;
use crate::codec;
use crate::engine::Engine;
use crate::error::{programmer_error, NetError};
use crate::message::{HeaderMap, HttpRequest, HttpResponse, Method};
use crate::retry::RetryController;

const DEFAULT_MAX_ATTEMPTS: u32 = 30;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(360);

/// Tunables for a single `request()` call.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub params: Vec<(String, String)>,
    pub body: Option<codec::Body>,
    pub headers: HeaderMap,
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
    pub retry_404: bool,
    pub retry_50x: bool,
    pub stream: bool,
    pub read_timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            params: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            timeout: Some(DEFAULT_TIMEOUT),
            retry_404: false,
            retry_50x: true,
            stream: true,
            read_timeout: None,
        }
    }
}

impl RequestOptions {
    /// Whether `body` is absent or an explicitly empty raw payload --
    /// the case that keeps `method` defaulting to GET and adds no
    /// `Content-Length`/`Content-Type` header.
    fn body_is_empty(&self) -> bool {
        match &self.body {
            None => true,
            Some(body) => body.is_empty(),
        }
    }
}

/// Whether an HTTP status code should be retried.
fn is_transient(code: u16, retry_404: bool, retry_50x: bool) -> bool {
    match code {
        408 => true,
        404 => retry_404,
        400..=499 => false,
        _ if code >= 500 => retry_50x,
        _ => false,
    }
}

pub struct HttpService {
    host_url: String,
    engine: Arc<Engine>,
    auth: Arc<dyn Authenticator>,
    /// Whether retries past the first attempt carry `UrlOpenAttempt=<n>`
    /// in the query string. Signed-URL hosts set this `false` -- their
    /// query string already carries the entire auth state.
    use_count_key: bool,
}

impl HttpService {
    pub fn new(host_url: String, engine: Arc<Engine>, auth: Arc<dyn Authenticator>) -> Self {
        Self::with_count_key(host_url, engine, auth, true)
    }

    pub fn with_count_key(
        host_url: String,
        engine: Arc<Engine>,
        auth: Arc<dyn Authenticator>,
        use_count_key: bool,
    ) -> Self {
        Self {
            host_url,
            engine,
            auth,
            use_count_key,
        }
    }

    pub fn host_url(&self) -> &str {
        &self.host_url
    }

    fn full_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.host_url.trim_end_matches('/'), path.trim_start_matches('/'))
        }
    }

    fn prepare_request(
        &self,
        path: &str,
        method: Method,
        options: &RequestOptions,
        attempt: u32,
    ) -> HttpRequest {
        let mut params = options.params.clone();
        if self.use_count_key && attempt > 0 {
            params.push(("UrlOpenAttempt".to_string(), attempt.to_string()));
        }

        let declared_content_type = options.headers.get("Content-Type").map(str::to_string);
        // Body present, no explicit content type: fall back to form
        // encoding, the same default Python's `encode_request_body` applies.
        let effective_content_type = declared_content_type
            .clone()
            .or_else(|| (!options.body_is_empty()).then(|| codec::FORM_URLENCODED.to_string()));

        let body_bytes = match &options.body {
            Some(body) => codec::encode(body.clone(), effective_content_type.as_deref()),
            None => Vec::new(),
        };

        let mut headers = options.headers.clone();
        if !body_bytes.is_empty() {
            headers.set("Content-Length", body_bytes.len().to_string());
            if declared_content_type.is_none() {
                if let Some(content_type) = &effective_content_type {
                    headers.set("Content-Type", content_type.clone());
                }
            }
        }

        HttpRequest::new(
            method,
            self.full_url(path),
            params,
            body_bytes,
            headers,
            options.read_timeout,
            options.stream,
        )
    }

    /// Resolves the method to use: an explicit method is validated
    /// against body presence (GET cannot carry a body); omitting it
    /// defaults to GET with no body, POST with one.
    fn resolve_method(method: Option<Method>, has_body: bool) -> Method {
        match method {
            Some(Method::Get) if has_body => {
                programmer_error!("GET requests cannot carry a body")
            }
            Some(m) => m,
            None if has_body => Method::Post,
            None => Method::Get,
        }
    }

    /// Performs `method` against `path`, retrying transient failures and
    /// transparently re-authenticating on 401/403. Returns `None` only
    /// after every attempt is exhausted or a terminal error is hit.
    ///
    /// `method` defaults to GET when `options.body` is absent/empty and
    /// POST otherwise; an explicit GET with a body is a programmer error.
    pub fn request(
        &self,
        path: &str,
        method: Option<Method>,
        options: RequestOptions,
    ) -> Option<HttpResponse> {
        let method = Self::resolve_method(method, !options.body_is_empty());
        let mut retry = RetryController::new(options.max_attempts, options.timeout);
        let mut skip_sleep = false;
        let mut last_error: Option<NetError> = None;
        let mut auth_attempted = false;

        while let Some(attempt) = retry.next(skip_sleep) {
            skip_sleep = false;
            let mut req = self.prepare_request(path, method, &options, attempt.attempt);
            self.auth.authorize(&mut req);

            match self.engine.perform_request(&req) {
                Ok(response) => return Some(response),
                Err(NetError::Connection { url, source }) => {
                    debug!("connection error for {url}: {source}, retrying");
                    last_error = Some(NetError::Connection { url, source });
                }
                Err(NetError::Timeout { url, source }) => {
                    debug!("timeout for {url}: {source}, retrying");
                    last_error = Some(NetError::Timeout { url, source });
                }
                Err(NetError::Http {
                    code,
                    url,
                    headers,
                    body_snippet,
                }) if code == 401 || code == 403 => {
                    if auth_attempted {
                        warn!("got {code} from {url} after an opportunistic re-auth already ran this call, giving up");
                        return None;
                    }
                    auth_attempted = true;
                    debug!("got {code} from {url}, attempting non-interactive re-auth");
                    if self.auth.login(false) {
                        skip_sleep = true;
                        last_error = Some(NetError::Http { code, url, headers, body_snippet });
                        continue;
                    }
                    warn!("re-auth failed for {url}, giving up");
                    return None;
                }
                Err(NetError::Http { code, url, headers, body_snippet }) => {
                    if is_transient(code, options.retry_404, options.retry_50x) {
                        debug!("transient HTTP {code} from {url}, retrying");
                        last_error = Some(NetError::Http { code, url, headers, body_snippet });
                    } else {
                        warn!(
                            "terminal HTTP {code} from {url}: {}",
                            NetError::Http { code, url: url.clone(), headers, body_snippet }.format(true)
                        );
                        return None;
                    }
                }
            }
        }

        if let Some(err) = last_error {
            warn!("giving up on {}: {}", path, err.format(true));
        }
        None
    }

    /// JSON convenience wrapper: serializes `body` as canonical JSON (if
    /// present), forces a buffered, non-404-retrying response, and
    /// deserializes the result. A network failure, timeout, or malformed
    /// JSON response are indistinguishable to the caller -- all `None`.
    pub fn json_request(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
        mut options: RequestOptions,
    ) -> Option<Value> {
        options.stream = false;
        options.retry_404 = false;
        options.retry_50x = true;
        if let Some(value) = body {
            options.headers.set("Content-Type", codec::JSON_CONTENT_TYPE);
            options.body = Some(codec::Body::Json(value));
        }

        let mut response = self.request(path, Some(method), options)?;
        let bytes = response.read(None).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_transient_matches_documented_table() {
        assert!(is_transient(408, false, false));
        assert!(!is_transient(404, false, true));
        assert!(is_transient(404, true, true));
        assert!(!is_transient(400, true, true));
        assert!(is_transient(500, false, true));
        assert!(!is_transient(500, false, false));
    }

    #[test]
    fn resolve_method_defaults_by_body_presence() {
        assert_eq!(HttpService::resolve_method(None, false), Method::Get);
        assert_eq!(HttpService::resolve_method(None, true), Method::Post);
    }

    #[test]
    fn resolve_method_keeps_explicit_choice() {
        assert_eq!(HttpService::resolve_method(Some(Method::Put), true), Method::Put);
        assert_eq!(HttpService::resolve_method(Some(Method::Get), false), Method::Get);
    }

    #[test]
    #[should_panic]
    fn resolve_method_rejects_get_with_body() {
        HttpService::resolve_method(Some(Method::Get), true);
    }
}
