//! Persistent cookie jar in Netscape/Mozilla format.
//!
//! Grounded on Python's `ThreadSafeCookieJar` (a `cookielib.MozillaCookieJar`
//! subclass that serializes load/save under a lock and creates the backing
//! file with mode 0600 on first use). Saving writes to a temp file and
//! renames it into place, a common swap-in pattern for on-disk caches.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

const HEADER: &str = "# Netscape HTTP Cookie File\n# This file is generated by net-core. Do not edit.\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    /// Unix seconds; `0` means session cookie / no expiry recorded.
    pub expires: i64,
    pub name: String,
    pub value: String,
}

/// Cookies keyed by (domain, name) so that setting an existing cookie
/// overwrites it rather than appending a duplicate line.
#[derive(Default)]
pub struct CookieJar {
    path: PathBuf,
    cookies: Vec<StoredCookie>,
}

impl CookieJar {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cookies: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads cookies from disk if the file exists and parses cleanly.
    /// A missing or corrupt file is not an error -- it just means the jar
    /// starts empty, matching the tolerant `except (LoadError, IOError):
    /// pass` behavior of the source jar.
    pub fn load(&mut self) -> std::io::Result<()> {
        if !self.path.exists() {
            self.ensure_file_exists_with_mode()?;
            return Ok(());
        }
        match File::open(&self.path) {
            Ok(file) => {
                let reader = BufReader::new(file);
                let mut parsed = Vec::new();
                for line in reader.lines() {
                    let line = line?;
                    if let Some(cookie) = parse_netscape_line(&line) {
                        parsed.push(cookie);
                    }
                }
                self.cookies = parsed;
                debug!("loaded cookies from {}", self.path.display());
            }
            Err(e) => {
                warn!("failed to read cookie jar {}: {e}", self.path.display());
            }
        }
        self.fix_mode();
        Ok(())
    }

    fn ensure_file_exists_with_mode(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        drop(file);
        self.fix_mode();
        Ok(())
    }

    #[cfg(unix)]
    fn fix_mode(&self) {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(&self.path) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o600);
            if let Err(e) = fs::set_permissions(&self.path, perms) {
                debug!("failed to fix cookie jar mode for {}: {e}", self.path.display());
            }
        }
    }

    #[cfg(not(unix))]
    fn fix_mode(&self) {}

    /// Rewrites the whole file, replacing its previous contents.
    /// Writes to a sibling temp file and renames it into place so a
    /// crash mid-write never leaves a truncated jar.
    pub fn save(&self) -> std::io::Result<()> {
        let mut contents = String::from(HEADER);
        for cookie in &self.cookies {
            contents.push_str(&format_netscape_line(cookie));
            contents.push('\n');
        }

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(contents.as_bytes())?;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
        }
        match fs::rename(&tmp_path, &self.path) {
            Ok(()) => {
                debug!("saved cookies to {}", self.path.display());
                Ok(())
            }
            Err(e) => {
                warn!("failed to save cookie jar {}: {e}", self.path.display());
                let _ = fs::remove_file(&tmp_path);
                Err(e)
            }
        }
    }

    /// Cookies applicable to `host` (exact match, or a parent domain with
    /// `include_subdomains` set), filtering out ones already expired.
    pub fn cookies_for_host(&self, host: &str, now_unix: i64) -> Vec<(String, String)> {
        self.cookies
            .iter()
            .filter(|c| c.expires == 0 || c.expires > now_unix)
            .filter(|c| host_matches(&c.domain, c.include_subdomains, host))
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect()
    }

    /// Inserts or replaces a cookie, keyed by (domain, name).
    pub fn set_cookie(&mut self, cookie: StoredCookie) {
        if let Some(existing) = self
            .cookies
            .iter_mut()
            .find(|c| c.domain == cookie.domain && c.name == cookie.name)
        {
            *existing = cookie;
        } else {
            self.cookies.push(cookie);
        }
    }

    /// Removes every cookie for `domain` (exact match only).
    pub fn clear_domain(&mut self, domain: &str) {
        self.cookies.retain(|c| !c.domain.eq_ignore_ascii_case(domain));
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

fn host_matches(domain: &str, include_subdomains: bool, host: &str) -> bool {
    if domain.eq_ignore_ascii_case(host) {
        return true;
    }
    include_subdomains && host.to_ascii_lowercase().ends_with(&format!(".{}", domain.to_ascii_lowercase()))
}

fn parse_netscape_line(line: &str) -> Option<StoredCookie> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 7 {
        return None;
    }
    Some(StoredCookie {
        domain: fields[0].to_string(),
        include_subdomains: fields[1].eq_ignore_ascii_case("TRUE"),
        path: fields[2].to_string(),
        secure: fields[3].eq_ignore_ascii_case("TRUE"),
        expires: fields[4].parse().unwrap_or(0),
        name: fields[5].to_string(),
        value: fields[6].to_string(),
    })
}

fn format_netscape_line(cookie: &StoredCookie) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        cookie.domain,
        bool_field(cookie.include_subdomains),
        cookie.path,
        bool_field(cookie.secure),
        cookie.expires,
        cookie.name,
        cookie.value,
    )
}

fn bool_field(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_cookie() -> StoredCookie {
        StoredCookie {
            domain: "example.com".to_string(),
            include_subdomains: true,
            path: "/".to_string(),
            secure: true,
            expires: 0,
            name: "session".to_string(),
            value: "abc123".to_string(),
        }
    }

    #[test]
    fn missing_file_loads_as_empty_and_creates_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        let mut jar = CookieJar::new(path.clone());
        jar.load().unwrap();
        assert!(jar.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn corrupt_file_loads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        fs::write(&path, "not a cookie file\tat all").unwrap();
        let mut jar = CookieJar::new(path);
        jar.load().unwrap();
        assert!(jar.is_empty());
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        let mut jar = CookieJar::new(path.clone());
        jar.set_cookie(sample_cookie());
        jar.save().unwrap();

        let mut reloaded = CookieJar::new(path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.len(), 1);
        let found = reloaded.cookies_for_host("www.example.com", 0);
        assert_eq!(found, vec![("session".to_string(), "abc123".to_string())]);
    }

    #[test]
    fn exact_domain_excludes_subdomain_without_flag() {
        let mut cookie = sample_cookie();
        cookie.include_subdomains = false;
        let mut jar = CookieJar::new(PathBuf::from("/dev/null"));
        jar.set_cookie(cookie);
        assert!(jar.cookies_for_host("www.example.com", 0).is_empty());
        assert_eq!(jar.cookies_for_host("example.com", 0).len(), 1);
    }

    #[test]
    fn expired_cookie_is_filtered_out() {
        let mut cookie = sample_cookie();
        cookie.expires = 100;
        let mut jar = CookieJar::new(PathBuf::from("/dev/null"));
        jar.set_cookie(cookie);
        assert!(jar.cookies_for_host("example.com", 200).is_empty());
        assert_eq!(jar.cookies_for_host("example.com", 50).len(), 1);
    }

    #[test]
    fn clear_domain_removes_only_matching_entries() {
        let mut jar = CookieJar::new(PathBuf::from("/dev/null"));
        jar.set_cookie(sample_cookie());
        let mut other = sample_cookie();
        other.domain = "other.com".to_string();
        jar.set_cookie(other);
        jar.clear_domain("example.com");
        assert_eq!(jar.len(), 1);
    }

    #[test]
    #[cfg(unix)]
    fn save_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        let mut jar = CookieJar::new(path.clone());
        jar.set_cookie(sample_cookie());
        jar.save().unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
