//! Request/response value types.
//!
//! Plain data carriers for a request and its response: they hide whether
//! the response body is streamed or buffered and expose a
//! case-insensitive header lookup.

use std::io::{Read, Result as IoResult};
use std::time::Duration;

use crate::error::NetError;

/// HTTP method. GET/POST/PUT cover every case this client needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Case-insensitive header map that preserves insertion order and
/// rejects duplicate keys up front (mirrors `get_case_insensitive_dict`
/// raising on duplicates).
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from an iterator of pairs, returning an error if two
    /// keys collide case-insensitively.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            if map.get(&k).is_some() {
                return Err(format!("duplicate header key: {k}"));
            }
            map.entries.push((k, v));
        }
        Ok(map)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Inserts or replaces a header, case-insensitively.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            entry.1 = value.into();
        } else {
            self.entries.push((key, value.into()));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.entries
    }
}

/// A cookie carried on a per-request basis. Coarser than a full jar:
/// just enough to round-trip name/value pairs copied in by an
/// authenticator.
#[derive(Debug, Clone)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// Request to `HttpService`.
///
/// Invariant: if `body` is non-empty, `headers` must carry
/// `Content-Length` equal to `body.len()` and `Content-Type` matching
/// the codec used to produce it.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL, without query string.
    pub url: String,
    /// Ordered (key, value) query parameters; duplicates allowed.
    pub params: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub headers: HeaderMap,
    pub read_timeout: Option<Duration>,
    pub stream: bool,
    pub cookies: Vec<Cookie>,
}

impl HttpRequest {
    pub fn new(
        method: Method,
        url: String,
        params: Vec<(String, String)>,
        body: Vec<u8>,
        headers: HeaderMap,
        read_timeout: Option<Duration>,
        stream: bool,
    ) -> Self {
        Self {
            method,
            url,
            params,
            body,
            headers,
            read_timeout,
            stream,
            cookies: Vec::new(),
        }
    }

    /// Resource URL with url-encoded query parameters appended.
    pub fn full_url(&self) -> String {
        if self.params.is_empty() {
            return self.url.clone();
        }
        let query = self
            .params
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    urlencoding::encode(k),
                    urlencoding::encode(v)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.url, query)
    }
}

/// The body backing an `HttpResponse`: either a live stream or a fully
/// buffered reader. Resource release on the stream variant is
/// deterministic -- it is just a boxed reader dropped with the response.
enum Body {
    Stream(Box<dyn Read + Send>),
    Buffered(std::io::Cursor<Vec<u8>>),
}

/// Response from `HttpService`.
pub struct HttpResponse {
    body: Body,
    url: String,
    headers: HeaderMap,
    read_count: usize,
}

impl HttpResponse {
    pub fn new_streamed(reader: Box<dyn Read + Send>, url: String, headers: HeaderMap) -> Self {
        Self {
            body: Body::Stream(reader),
            url,
            headers,
            read_count: 0,
        }
    }

    pub fn new_buffered(bytes: Vec<u8>, url: String, headers: HeaderMap) -> Self {
        Self {
            body: Body::Buffered(std::io::Cursor::new(bytes)),
            url,
            headers,
            read_count: 0,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Total length of the response, if the server sent `Content-Length`.
    pub fn content_length(&self) -> Option<u64> {
        self.headers.get("Content-Length").and_then(|v| v.parse().ok())
    }

    /// Reads up to `size` bytes (or all remaining if `size` is `None`).
    /// I/O timeout surfaces as `NetError::Timeout`.
    pub fn read(&mut self, size: Option<usize>) -> Result<Vec<u8>, NetError> {
        let result: IoResult<Vec<u8>> = match size {
            Some(n) => {
                let mut buf = vec![0u8; n];
                let got = self.read_body(&mut buf)?;
                buf.truncate(got);
                Ok(buf)
            }
            None => {
                let mut buf = Vec::new();
                self.read_to_end(&mut buf)?;
                Ok(buf)
            }
        };
        match result {
            Ok(data) => {
                self.read_count += data.len();
                Ok(data)
            }
            Err(e) => {
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock
                {
                    Err(NetError::Timeout {
                        url: self.url.clone(),
                        source: e.to_string(),
                    })
                } else {
                    Err(NetError::Connection {
                        url: self.url.clone(),
                        source: e.to_string(),
                    })
                }
            }
        }
    }

    fn read_body(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.body {
            Body::Stream(r) => r.read(buf),
            Body::Buffered(c) => Read::read(c, buf),
        }
    }

    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> IoResult<()> {
        match &mut self.body {
            Body::Stream(r) => {
                r.read_to_end(buf)?;
                Ok(())
            }
            Body::Buffered(c) => {
                Read::read_to_end(c, buf)?;
                Ok(())
            }
        }
    }

    pub fn bytes_read(&self) -> usize {
        self.read_count
    }
}
