//! OAuth Bearer-token authenticator.
//!
//! Grounded on Python's `OAuthAuthenticator`: authorize sets an
//! `Authorization: Bearer <token>` header when a token is cached; login
//! exchanges credentials for a fresh token through the `oauth` module's
//! `create_access_token`; logout clears the cached token and purges any
//! on-disk copy. The concrete token-minting flow is an external
//! collaborator here too -- `TokenSource` is the seam, same boundary.

use std::sync::Mutex;

use log::info;

use crate::auth::Authenticator;
use crate::message::HttpRequest;

/// Per-host OAuth configuration: which client id/scopes to request and
/// where to cache the minted token on disk.
#[derive(Debug, Clone, Default)]
pub struct OAuthOptions {
    pub client_id: Option<String>,
    pub scopes: Vec<String>,
    pub token_cache_path: Option<std::path::PathBuf>,
}

/// Mints and revokes access tokens for a host. Production code backs
/// this with a real OAuth2 device/browser flow; tests substitute a
/// fixed token. (The system secret store is wired in on the cookie
/// side -- see `auth::cookie::KeyringCredentials` -- since OAuth tokens
/// are short-lived and cached in memory rather than kept at rest.)
pub trait TokenSource: Send + Sync {
    fn load_cached(&self, host: &str) -> Option<String>;
    fn create(&self, host: &str, options: &OAuthOptions, interactive: bool) -> Option<String>;
    fn purge(&self, host: &str);
}

/// `TokenSource` that never has a cached token and can never mint one.
/// Used when no credential backend was configured; `login` then returns
/// `false` instead of panicking.
pub struct NoTokenSource;

impl TokenSource for NoTokenSource {
    fn load_cached(&self, _host: &str) -> Option<String> {
        None
    }
    fn create(&self, _host: &str, _options: &OAuthOptions, _interactive: bool) -> Option<String> {
        None
    }
    fn purge(&self, _host: &str) {}
}

pub struct OAuthAuthenticator {
    host: String,
    options: OAuthOptions,
    source: Box<dyn TokenSource>,
    access_token: Mutex<Option<String>>,
}

impl OAuthAuthenticator {
    pub fn new(host: String, options: OAuthOptions, source: Box<dyn TokenSource>) -> Self {
        let access_token = source.load_cached(&host);
        Self {
            host,
            options,
            source,
            access_token: Mutex::new(access_token),
        }
    }
}

impl Authenticator for OAuthAuthenticator {
    fn authorize(&self, req: &mut HttpRequest) {
        let token = self.access_token.lock().unwrap();
        if let Some(token) = token.as_ref() {
            req.headers.set("Authorization", format!("Bearer {token}"));
        }
    }

    fn login(&self, interactive: bool) -> bool {
        let mut token = self.access_token.lock().unwrap();
        *token = self.source.create(&self.host, &self.options, interactive);
        if token.is_some() {
            info!("minted OAuth access token for {}", self.host);
        }
        token.is_some()
    }

    fn logout(&self) {
        let mut token = self.access_token.lock().unwrap();
        *token = None;
        self.source.purge(&self.host);
    }
}
