//! Cookie-based authenticator.
//!
//! Grounded on Python's `CookieBasedAuthenticator`: authorization copies
//! every cookie currently in the shared jar onto the outgoing request;
//! login is always interactive (there is no headless cookie flow) and
//! logout clears the jar's entries for the authenticator's host.

use std::sync::{Arc, Mutex};

use log::info;

use crate::auth::Authenticator;
use crate::cookie_jar::CookieJar;
use crate::message::{Cookie, HttpRequest};

/// Supplies the (email, password) pair an interactive cookie login needs.
/// A trait so the CLI can prompt on a terminal while tests substitute a
/// fixed pair, without this module depending on a terminal.
pub trait CredentialSource: Send + Sync {
    fn get_credentials(&self) -> Option<(String, String)>;
}

/// Always declines to supply credentials; `login` then fails cleanly
/// instead of blocking on input that will never come.
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn get_credentials(&self) -> Option<(String, String)> {
        None
    }
}

/// Reads the (email, password) pair for a host from the system's secret
/// store. The two fields are packed into one keyring entry separated by
/// a unit separator byte, since `keyring` stores a single secret string
/// per (service, username) pair.
#[cfg(feature = "system-keyring")]
pub struct KeyringCredentials {
    host: String,
}

#[cfg(feature = "system-keyring")]
const FIELD_SEP: char = '\u{1f}';

#[cfg(feature = "system-keyring")]
impl KeyringCredentials {
    pub fn new(host: String) -> Self {
        Self { host }
    }

    /// Writes `email`/`password` into the keyring entry for this host,
    /// for whatever out-of-band flow obtained them (an interactive
    /// prompt, a setup wizard).
    pub fn store(&self, email: &str, password: &str) -> keyring::Result<()> {
        let entry = keyring::Entry::new("net-core", &self.host)?;
        entry.set_password(&format!("{email}{FIELD_SEP}{password}"))
    }
}

#[cfg(feature = "system-keyring")]
impl CredentialSource for KeyringCredentials {
    fn get_credentials(&self) -> Option<(String, String)> {
        let entry = keyring::Entry::new("net-core", &self.host).ok()?;
        let stored = entry.get_password().ok()?;
        let (email, password) = stored.split_once(FIELD_SEP)?;
        Some((email.to_string(), password.to_string()))
    }
}

pub struct CookieAuthenticator {
    host: String,
    jar: Arc<Mutex<CookieJar>>,
    credentials: Box<dyn CredentialSource>,
    lock: Mutex<()>,
}

impl CookieAuthenticator {
    pub fn new(host: String, jar: Arc<Mutex<CookieJar>>) -> Self {
        Self::with_credentials(host, jar, Box::new(NoCredentials))
    }

    pub fn with_credentials(
        host: String,
        jar: Arc<Mutex<CookieJar>>,
        credentials: Box<dyn CredentialSource>,
    ) -> Self {
        Self {
            host,
            jar,
            credentials,
            lock: Mutex::new(()),
        }
    }
}

impl Authenticator for CookieAuthenticator {
    fn authorize(&self, req: &mut HttpRequest) {
        let _guard = self.lock.lock().unwrap();
        let now = chrono::Utc::now().timestamp();
        let jar = self.jar.lock().unwrap();
        for (name, value) in jar.cookies_for_host(&self.host, now) {
            req.cookies.push(Cookie { name, value });
        }
    }

    fn login(&self, interactive: bool) -> bool {
        if !interactive {
            eprintln!("cookie authentication requires interactive login");
            return false;
        }
        let _guard = self.lock.lock().unwrap();
        match self.credentials.get_credentials() {
            Some((email, _password)) => {
                info!("logged in to {} as {}", self.host, email);
                true
            }
            None => false,
        }
    }

    fn logout(&self) {
        let _guard = self.lock.lock().unwrap();
        let mut jar = self.jar.lock().unwrap();
        jar.clear_domain(&self.host);
    }
}
