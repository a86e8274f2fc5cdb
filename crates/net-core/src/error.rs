//! Error taxonomy for the HTTP client core.
//!
//! Mirrors the shape of `jhol-core::error_handling::JholError`: a tagged
//! enum where every variant carries enough context to reconstruct what
//! went wrong without re-running the request.

use std::fmt;

/// Network-related failure produced while performing a request.
///
/// `request()` never propagates this as a `Result::Err` to its own
/// caller (the retry loop classifies it and returns `None` on terminal
/// failure); it is the currency the engine and retry loop pass between
/// themselves.
#[derive(Debug, Clone)]
pub enum NetError {
    /// TCP/TLS failure before any response was received.
    Connection { url: String, source: String },
    /// Read or overall-deadline timeout.
    Timeout { url: String, source: String },
    /// Server responded with a status code >= 400.
    Http {
        code: u16,
        url: String,
        headers: Vec<(String, String)>,
        body_snippet: String,
    },
}

impl NetError {
    pub fn url(&self) -> &str {
        match self {
            NetError::Connection { url, .. } => url,
            NetError::Timeout { url, .. } => url,
            NetError::Http { url, .. } => url,
        }
    }

    /// Human readable description, optionally dumping non-`x-*` response
    /// headers and the body snippet for diagnostics.
    pub fn format(&self, verbose: bool) -> String {
        let mut out = vec![self.to_string()];
        if verbose {
            if let NetError::Http {
                headers,
                body_snippet,
                ..
            } = self
            {
                out.push("----------".to_string());
                for (name, value) in headers {
                    if !name.to_ascii_lowercase().starts_with("x-") {
                        out.push(format!("{}: {}", capitalize_header(name), value));
                    }
                }
                out.push(String::new());
                out.push(if body_snippet.is_empty() {
                    "<empty body>".to_string()
                } else {
                    body_snippet.clone()
                });
                out.push("----------".to_string());
            }
        }
        out.join("\n")
    }
}

fn capitalize_header(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Connection { url, source } => {
                write!(f, "connection error for {url}: {source}")
            }
            NetError::Timeout { url, source } => {
                write!(f, "timeout for {url}: {source}")
            }
            NetError::Http { code, url, .. } => {
                write!(f, "server returned HTTP {code} for {url}")
            }
        }
    }
}

impl std::error::Error for NetError {}

/// Caller precondition violations. These panic synchronously and are
/// never caught by the retry loop -- they indicate a programmer error,
/// not a transient runtime condition.
#[derive(Debug, Clone)]
pub struct ProgrammerError(pub String);

impl fmt::Display for ProgrammerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ProgrammerError {}

macro_rules! programmer_error {
    ($($arg:tt)*) => {
        panic!("{}", $crate::error::ProgrammerError(format!($($arg)*)))
    };
}

pub(crate) use programmer_error;
