//! `ClientContext`: the process-wide state an `HttpService` needs,
//! bundled into one value instead of scattered module-level statics.
//!
//! Grounded on `jhol-core`'s use of `dashmap` for a concurrent
//! host → service cache, with the cookie jar, CA bundle, and auth
//! configuration each behind their own lock so unrelated requests never
//! contend on each other's state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use dashmap::DashMap;

use crate::auth::{
    AuthKind, AuthMethod, Authenticator, CookieAuthenticator, NoTokenSource, NoneAuthenticator,
    OAuthAuthenticator, OAuthOptions,
};
use crate::config::Config;
use crate::cookie_jar::CookieJar;
use crate::engine::{Engine, EngineConfig};
use crate::service::HttpService;

/// Hosts matching this suffix carry their own signed-URL authentication
/// and must never have an `Authorization` header or retry-count query
/// parameter attached.
const SIGNED_STORAGE_SUFFIX: &str = ".storage.googleapis.com";

pub fn is_signed_storage_host(host: &str) -> bool {
    host.ends_with(SIGNED_STORAGE_SUFFIX)
}

/// Default method + per-host overrides + OAuth option bag, all guarded
/// by one mutex that also scopes interactive `login()` calls so two
/// threads never race to open two login prompts at once.
#[derive(Default)]
pub struct AuthConfig {
    pub default_method: AuthMethod,
    pub per_host: HashMap<String, AuthMethod>,
    pub oauth_options: OAuthOptions,
}

pub struct ClientContext {
    services: DashMap<String, Arc<HttpService>>,
    cookie_jar: OnceLock<Arc<Mutex<CookieJar>>>,
    ca_bundle: OnceLock<Option<PathBuf>>,
    auth_config: Mutex<AuthConfig>,
    engine: OnceLock<Arc<Engine>>,
    pool_size: usize,
}

impl ClientContext {
    pub fn new() -> Self {
        let config = crate::config::load_config();
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Self {
        let mut auth_config = AuthConfig::default();
        if let Some(method) = config.default_auth_method {
            auth_config.default_method = method;
        }
        auth_config.per_host = config.per_host_auth_method;
        auth_config.oauth_options = OAuthOptions {
            client_id: config.oauth_client_id,
            scopes: config.oauth_scopes,
            token_cache_path: None,
        };

        let ca_bundle = config.ca_bundle;
        let cell = OnceLock::new();
        let _ = cell.set(ca_bundle);

        Self {
            services: DashMap::new(),
            cookie_jar: OnceLock::new(),
            ca_bundle: cell,
            auth_config: Mutex::new(auth_config),
            engine: OnceLock::new(),
            pool_size: config.pool_size.unwrap_or(64),
        }
    }

    fn engine(&self) -> Arc<Engine> {
        self.engine
            .get_or_init(|| {
                let ca_bundle = self
                    .ca_bundle
                    .get()
                    .and_then(|p| p.clone())
                    .map(|p| p.to_string_lossy().into_owned());
                Arc::new(Engine::new(EngineConfig {
                    ca_bundle,
                    pool_size: self.pool_size,
                    ..EngineConfig::default()
                }))
            })
            .clone()
    }

    fn cookie_jar(&self) -> Arc<Mutex<CookieJar>> {
        self.cookie_jar
            .get_or_init(|| {
                let path = dirs::home_dir()
                    .unwrap_or_else(std::env::temp_dir)
                    .join(".isolated_cookies");
                let mut jar = CookieJar::new(path);
                let _ = jar.load();
                Arc::new(Mutex::new(jar))
            })
            .clone()
    }

    /// Replaces the default auth method, per-host overrides, and OAuth
    /// option bag used for subsequently-created services. Hosts already
    /// cached keep their existing authenticator.
    pub fn configure_auth(
        &self,
        default: Option<AuthMethod>,
        per_host: HashMap<String, AuthMethod>,
        oauth_options: Option<OAuthOptions>,
    ) {
        let mut config = self.auth_config.lock().unwrap();
        if let Some(default) = default {
            config.default_method = default;
        }
        for (host, method) in per_host {
            config.per_host.insert(host, method);
        }
        if let Some(opts) = oauth_options {
            config.oauth_options = opts;
        }
    }

    fn build_authenticator(&self, host: &str) -> AuthKind {
        if is_signed_storage_host(host) {
            return AuthKind::None(NoneAuthenticator);
        }
        let config = self.auth_config.lock().unwrap();
        let method = config
            .per_host
            .get(host)
            .copied()
            .unwrap_or(config.default_method);
        match method {
            AuthMethod::None => AuthKind::None(NoneAuthenticator),
            AuthMethod::Cookie => {
                let jar = self.cookie_jar();
                AuthKind::Cookie(CookieAuthenticator::new(host.to_string(), jar))
            }
            AuthMethod::OAuth => AuthKind::OAuth(OAuthAuthenticator::new(
                host.to_string(),
                config.oauth_options.clone(),
                Box::new(NoTokenSource),
            )),
        }
    }

    /// Gets or creates the cached `HttpService` for the origin (scheme +
    /// host) of `url`. The service is keyed by origin, not the full URL,
    /// so every path under a host shares one authenticator and one
    /// connection pool.
    pub fn service_for(&self, url: &str) -> Arc<HttpService> {
        let origin = origin_of(url);
        if let Some(existing) = self.services.get(&origin) {
            return existing.value().clone();
        }
        let host = host_from_url(&origin);
        let auth: Arc<dyn Authenticator> = Arc::new(self.build_authenticator(&host));
        let use_count_key = !is_signed_storage_host(&host);
        let service = Arc::new(HttpService::with_count_key(
            origin.clone(),
            self.engine(),
            auth,
            use_count_key,
        ));
        self.services.insert(origin, service.clone());
        service
    }
}

fn host_from_url(url: &str) -> String {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or(url)
        .to_string()
}

/// Scheme + host, dropping any path/query. Lowercased and stripped of
/// trailing slashes so differently-cased spellings of the same host
/// share one cached `HttpService` -- mirrors Python's
/// `urlhost.lower().rstrip('/')` (net.py:205).
fn origin_of(url: &str) -> String {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let host_end = url[scheme_end..]
        .find('/')
        .map(|i| scheme_end + i)
        .unwrap_or(url.len());
    url[..host_end].trim_end_matches('/').to_ascii_lowercase()
}

static DEFAULT_CONTEXT: OnceLock<ClientContext> = OnceLock::new();

pub fn default_context() -> &'static ClientContext {
    DEFAULT_CONTEXT.get_or_init(ClientContext::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_of_strips_path_and_query() {
        assert_eq!(origin_of("https://example.com/api/v1?x=1"), "https://example.com");
        assert_eq!(origin_of("https://example.com"), "https://example.com");
    }

    #[test]
    fn origin_of_lowercases_and_strips_trailing_slashes() {
        assert_eq!(origin_of("https://Example.COM/"), "https://example.com");
        assert_eq!(origin_of("HTTPS://Example.Com//"), "https://example.com");
    }

    #[test]
    fn signed_storage_hosts_never_authenticate() {
        assert!(is_signed_storage_host("bucket.storage.googleapis.com"));
        assert!(!is_signed_storage_host("storage.googleapis.com.evil.example"));
    }

    #[test]
    fn service_for_caches_by_origin() {
        let ctx = ClientContext::from_config(Config::default());
        let a = ctx.service_for("https://example.com/one");
        let b = ctx.service_for("https://example.com/two");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn service_for_normalizes_host_case() {
        let ctx = ClientContext::from_config(Config::default());
        let a = ctx.service_for("https://Example.com/one");
        let b = ctx.service_for("https://example.COM/two");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
