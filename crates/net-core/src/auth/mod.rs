//! Pluggable authentication.
//!
//! Modeled as a small enum dispatching to per-variant structs rather than
//! a trait-object hierarchy, favoring plain enums (`LockfileKind`, `Backend`)
//! over deep trait trees when a match arm does the job.

mod cookie;
mod oauth;

pub use cookie::{CookieAuthenticator, CredentialSource, NoCredentials};
#[cfg(feature = "system-keyring")]
pub use cookie::KeyringCredentials;
pub use oauth::{NoTokenSource, OAuthAuthenticator, OAuthOptions, TokenSource};

use crate::message::HttpRequest;

/// Capability every authenticator variant implements.
pub trait Authenticator: Send + Sync {
    /// Adds authentication information to `req` in place.
    fn authorize(&self, req: &mut HttpRequest);

    /// Runs the login flow. `interactive` gates flows that require user
    /// input (a browser redirect, a password prompt); a `false` caller
    /// gets `false` back immediately instead of blocking.
    fn login(&self, interactive: bool) -> bool;

    /// Purges any cached credential, in memory and on disk.
    fn logout(&self);
}

/// Which authenticator a host uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    None,
    Cookie,
    OAuth,
}

impl Default for AuthMethod {
    fn default() -> Self {
        AuthMethod::None
    }
}

/// No-op authenticator: adds nothing, login always fails, logout is a
/// no-op. Used for hosts that don't require authentication.
pub struct NoneAuthenticator;

impl Authenticator for NoneAuthenticator {
    fn authorize(&self, _req: &mut HttpRequest) {}
    fn login(&self, _interactive: bool) -> bool {
        false
    }
    fn logout(&self) {}
}

/// Dispatches to the concrete authenticator for a host.
pub enum AuthKind {
    None(NoneAuthenticator),
    Cookie(CookieAuthenticator),
    OAuth(OAuthAuthenticator),
}

impl Authenticator for AuthKind {
    fn authorize(&self, req: &mut HttpRequest) {
        match self {
            AuthKind::None(a) => a.authorize(req),
            AuthKind::Cookie(a) => a.authorize(req),
            AuthKind::OAuth(a) => a.authorize(req),
        }
    }

    fn login(&self, interactive: bool) -> bool {
        match self {
            AuthKind::None(a) => a.login(interactive),
            AuthKind::Cookie(a) => a.login(interactive),
            AuthKind::OAuth(a) => a.login(interactive),
        }
    }

    fn logout(&self) {
        match self {
            AuthKind::None(a) => a.logout(),
            AuthKind::Cookie(a) => a.logout(),
            AuthKind::OAuth(a) => a.logout(),
        }
    }
}
