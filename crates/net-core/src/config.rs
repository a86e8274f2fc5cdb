//! Optional overrides loaded from `~/.netcorerc` (JSON).
//!
//! Grounded on `jhol-core::config::load_config`: a tolerant merge over a
//! `Default` -- a missing or invalid file just means defaults, logged at
//! `debug` rather than surfaced as an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;

use crate::auth::AuthMethod;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub ca_bundle: Option<PathBuf>,
    pub default_auth_method: Option<AuthMethod>,
    pub per_host_auth_method: HashMap<String, AuthMethod>,
    pub oauth_client_id: Option<String>,
    pub oauth_scopes: Vec<String>,
    pub pool_size: Option<usize>,
}

/// Loads `~/.netcorerc`. Any failure to locate, read, or parse the file
/// yields `Config::default()` -- this never returns `Err`.
pub fn load_config() -> Config {
    let Some(path) = dirs::home_dir().map(|h| h.join(".netcorerc")) else {
        debug!("no home directory available, using default config");
        return Config::default();
    };
    load_config_from(&path)
}

fn load_config_from(path: &Path) -> Config {
    let mut config = Config::default();
    if !path.is_file() {
        debug!("no config file at {}, using defaults", path.display());
        return config;
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            debug!("failed to read {}: {e}, using defaults", path.display());
            return config;
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            debug!("failed to parse {}: {e}, using defaults", path.display());
            return config;
        }
    };

    if let Some(s) = value.get("caBundle").and_then(|v| v.as_str()) {
        config.ca_bundle = Some(PathBuf::from(s));
    }
    if let Some(s) = value.get("defaultAuthMethod").and_then(|v| v.as_str()) {
        config.default_auth_method = parse_auth_method(s);
    }
    if let Some(map) = value.get("perHostAuthMethod").and_then(|v| v.as_object()) {
        for (host, v) in map {
            if let Some(method) = v.as_str().and_then(parse_auth_method) {
                config.per_host_auth_method.insert(host.clone(), method);
            }
        }
    }
    if let Some(s) = value.get("oauthClientId").and_then(|v| v.as_str()) {
        config.oauth_client_id = Some(s.to_string());
    }
    if let Some(arr) = value.get("oauthScopes").and_then(|v| v.as_array()) {
        config.oauth_scopes = arr
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
    }
    if let Some(n) = value.get("poolSize").and_then(|v| v.as_u64()) {
        config.pool_size = Some(n as usize);
    }

    debug!("loaded config from {}", path.display());
    config
}

fn parse_auth_method(s: &str) -> Option<AuthMethod> {
    match s {
        "none" => Some(AuthMethod::None),
        "cookie" => Some(AuthMethod::Cookie),
        "oauth" => Some(AuthMethod::OAuth),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config_from(&dir.path().join(".netcorerc"));
        assert!(config.ca_bundle.is_none());
        assert!(config.default_auth_method.is_none());
    }

    #[test]
    fn invalid_json_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".netcorerc");
        std::fs::write(&path, "not json").unwrap();
        let config = load_config_from(&path);
        assert!(config.default_auth_method.is_none());
    }

    #[test]
    fn parses_recognized_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".netcorerc");
        std::fs::write(
            &path,
            r#"{
                "caBundle": "/etc/ssl/custom.pem",
                "defaultAuthMethod": "oauth",
                "perHostAuthMethod": {"internal.example.com": "cookie"},
                "poolSize": 16
            }"#,
        )
        .unwrap();
        let config = load_config_from(&path);
        assert_eq!(config.ca_bundle, Some(PathBuf::from("/etc/ssl/custom.pem")));
        assert_eq!(config.default_auth_method, Some(AuthMethod::OAuth));
        assert_eq!(
            config.per_host_auth_method.get("internal.example.com"),
            Some(&AuthMethod::Cookie)
        );
        assert_eq!(config.pool_size, Some(16));
    }
}
