//! Transport engine: a thin adapter over `ureq`.
//!
//! One pooled agent per engine instance, grounded on `jhol-core`'s
//! `http_client.rs` (a single `ureq::Agent` reused across requests for
//! connection pooling). This engine owns no retry logic of its own --
//! the core's retry controller is the single source of truth for
//! retries, so the agent must not retry underneath it.

use std::io::Read;
use std::time::Duration;

use crate::error::NetError;
use crate::message::{HeaderMap, HttpRequest, HttpResponse, Method};

const DEFAULT_POOL_SIZE: usize = 64;

/// Configuration for constructing an `Engine`.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Path to a PEM CA bundle to verify peer certificates against.
    /// `None` uses the platform's default trust store.
    pub ca_bundle: Option<String>,
    pub pool_size: usize,
    pub connect_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ca_bundle: None,
            pool_size: DEFAULT_POOL_SIZE,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Executes `HttpRequest`s via `ureq`, translating library exceptions
/// into `NetError`. Does not read the environment for proxy or trust
/// configuration.
pub struct Engine {
    agent: ureq::Agent,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let mut builder = ureq::AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .max_idle_connections(config.pool_size)
            .max_idle_connections_per_host(config.pool_size);

        if let Some(ca_bundle) = &config.ca_bundle {
            match load_root_cert_store(ca_bundle) {
                Ok(store) => {
                    let tls_config = std::sync::Arc::new(
                        rustls::ClientConfig::builder()
                            .with_safe_defaults()
                            .with_root_certificates(store)
                            .with_no_client_auth(),
                    );
                    builder = builder.tls_config(tls_config);
                }
                Err(e) => {
                    log::warn!("failed to load CA bundle {ca_bundle}: {e}, using platform default");
                }
            }
        }

        Self {
            agent: builder.build(),
        }
    }

    /// Sends `req` and classifies the outcome. Returns the response on
    /// success (status < 400); otherwise an error describing the
    /// failure, for the retry loop to classify further.
    pub fn perform_request(&self, req: &HttpRequest) -> Result<HttpResponse, NetError> {
        let full_url = req.full_url();
        let mut builder = self.agent.request(req.method.as_str(), &full_url);

        if let Some(read_timeout) = req.read_timeout {
            builder = builder.timeout_read(read_timeout);
        }
        for (name, value) in req.headers.iter() {
            builder = builder.set(name, value);
        }
        if !req.cookies.is_empty() {
            let cookie_header = req
                .cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.set("Cookie", &cookie_header);
        }

        let outcome = if matches!(req.method, Method::Post | Method::Put) {
            builder.send_bytes(&req.body)
        } else {
            builder.call()
        };

        match outcome {
            Ok(response) => Ok(to_http_response(response, &full_url, req.stream)),
            Err(ureq::Error::Status(code, response)) => {
                let headers = response_headers(&response);
                let body_snippet = read_error_body(response);
                Err(NetError::Http {
                    code,
                    url: full_url,
                    headers: headers.into_pairs(),
                    body_snippet,
                })
            }
            Err(ureq::Error::Transport(t)) => {
                let message = t.to_string();
                if matches!(t.kind(), ureq::ErrorKind::Io) && is_timeout_message(&message) {
                    Err(NetError::Timeout {
                        url: full_url,
                        source: message,
                    })
                } else {
                    Err(NetError::Connection {
                        url: full_url,
                        source: message,
                    })
                }
            }
        }
    }
}

fn is_timeout_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("timed out") || lower.contains("timeout")
}

fn response_headers(response: &ureq::Response) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in response.headers_names() {
        if let Some(value) = response.header(&name) {
            headers.set(name, value.to_string());
        }
    }
    headers
}

fn to_http_response(response: ureq::Response, url: &str, stream: bool) -> HttpResponse {
    let headers = response_headers(&response);
    if stream {
        let reader = response.into_reader();
        HttpResponse::new_streamed(Box::new(reader), url.to_string(), headers)
    } else {
        let mut buf = Vec::new();
        let _ = response.into_reader().read_to_end(&mut buf);
        HttpResponse::new_buffered(buf, url.to_string(), headers)
    }
}

fn read_error_body(response: ureq::Response) -> String {
    let mut buf = Vec::new();
    let _ = response.into_reader().take(64 * 1024).read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Parses a PEM file into a `rustls::RootCertStore` containing only its
/// certificates -- the platform's trust roots are not mixed in, matching
/// Python's `requests` session `verify=ca_certs` semantics (pin, don't
/// extend).
fn load_root_cert_store(path: &str) -> std::io::Result<rustls::RootCertStore> {
    let pem = std::fs::read(path)?;
    let mut reader = std::io::BufReader::new(pem.as_slice());
    let certs = rustls_pemfile::certs(&mut reader)?;
    let mut store = rustls::RootCertStore::empty();
    for cert in certs {
        store
            .add(&rustls::Certificate(cert))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_sane_pool_size() {
        let config = EngineConfig::default();
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert!(config.ca_bundle.is_none());
    }
}
