//! Cookie-backed credential storage.
//!
//! `CookieJar` behaves like the ambient per-site cookie string of a browser: reads
//! see `name=value; name2=value2` and match keys exactly, writes are `Set-Cookie`
//! lines carrying an `expires` attribute, and a past expiry deletes the cookie.
//! `FileCookieJar` persists the same jar as JSON so a session outlives the process.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::store::CredentialStore;

const COOKIE_DATE_FMT: &str = "%a, %d %b %Y %H:%M:%S";
const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// `None` is a session cookie.
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String { "/".to_string() }

impl Cookie {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires.map(|e| e > now).unwrap_or(true)
    }
}

pub fn format_cookie_date(dt: DateTime<Utc>) -> String {
    format!("{} GMT", dt.format(COOKIE_DATE_FMT))
}

pub fn parse_cookie_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let s = s.strip_suffix(" GMT").or_else(|| s.strip_suffix(" UTC")).unwrap_or(s);
    NaiveDateTime::parse_from_str(s.trim(), COOKIE_DATE_FMT).ok().map(|n| n.and_utc())
}

/// Parse one `Set-Cookie` line. `Max-Age` wins over `Expires` when both are given.
pub fn parse_set_cookie(line: &str, now: DateTime<Utc>) -> Option<Cookie> {
    let mut parts = line.split(';');
    let (name, value) = parts.next()?.trim().split_once('=')?;
    let name = name.trim();
    if name.is_empty() { return None; }
    let mut cookie = Cookie { name: name.to_string(), value: value.trim().to_string(), expires: None, path: default_path() };
    let mut max_age: Option<DateTime<Utc>> = None;
    for attr in parts {
        let attr = attr.trim();
        let (k, v) = attr.split_once('=').unwrap_or((attr, ""));
        match k.trim().to_ascii_lowercase().as_str() {
            "expires" => cookie.expires = parse_cookie_date(v),
            "max-age" => {
                if let Ok(secs) = v.trim().parse::<i64>() {
                    max_age = Some(
                        TimeDelta::try_seconds(secs)
                            .and_then(|d| now.checked_add_signed(d))
                            .unwrap_or(if secs < 0 { DateTime::<Utc>::MIN_UTC } else { DateTime::<Utc>::MAX_UTC }),
                    );
                }
            }
            "path" if !v.trim().is_empty() => cookie.path = v.trim().to_string(),
            _ => {}
        }
    }
    if max_age.is_some() { cookie.expires = max_age; }
    Some(cookie)
}

/// Value of `name` in a `Cookie:`-style header, matched exactly.
pub fn lookup_cookie(header: &str, name: &str) -> Option<String> {
    for part in header.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                let v = &v[1..];
                return if v.is_empty() { None } else { Some(v.to_string()) };
            }
        }
    }
    None
}

/// Browser-style cookie jar.
///
/// Values are written verbatim, without percent-encoding: a value containing `;` or
/// leading/trailing whitespace does not read back unchanged. `set_credential` refuses
/// such tokens before they reach the jar.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<Vec<Cookie>>,
    /// Newest `Set-Cookie` line per cookie name since the last drain. Only recording
    /// jars keep one.
    pending: Option<RwLock<Vec<(String, String)>>>,
}

impl CookieJar {
    /// A jar that does not record its writes.
    pub fn new() -> Self { Self::default() }

    /// A jar that remembers the `Set-Cookie` lines it applies, for forwarding to a
    /// real client through `drain_set_cookies`.
    pub fn recording() -> Self {
        Self { cookies: RwLock::new(Vec::new()), pending: Some(RwLock::new(Vec::new())) }
    }

    /// Seed a recording jar from a request `Cookie` header. Seeded cookies are session cookies.
    pub fn from_cookie_header(header: &str) -> Self {
        let jar = Self::recording();
        {
            let mut cookies = jar.cookies.write();
            for part in header.split(';') {
                let Some((k, v)) = part.trim().split_once('=') else { continue; };
                if k.is_empty() { continue; }
                cookies.retain(|c| c.name != k);
                cookies.push(Cookie { name: k.to_string(), value: v.to_string(), expires: None, path: default_path() });
            }
        }
        jar
    }

    fn from_cookies(cookies: Vec<Cookie>) -> Self {
        Self { cookies: RwLock::new(cookies), pending: None }
    }

    fn replace_cookies(&self, cookies: Vec<Cookie>) {
        *self.cookies.write() = cookies;
    }

    /// The jar as a browser would expose it to script: live cookies only.
    pub fn cookie_header(&self) -> String {
        let now = Utc::now();
        self.cookies
            .read()
            .iter()
            .filter(|c| c.is_live(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Apply a `Set-Cookie` line. Unparseable lines are ignored.
    pub fn apply_set_cookie(&self, line: &str) {
        let now = Utc::now();
        let Some(cookie) = parse_set_cookie(line, now) else {
            debug!(target: "session.cookie", "ignoring malformed set-cookie line");
            return;
        };
        let name = cookie.name.clone();
        let mut cookies = self.cookies.write();
        cookies.retain(|c| c.name != cookie.name && c.is_live(now));
        if cookie.is_live(now) {
            cookies.push(cookie);
        }
        drop(cookies);
        if let Some(pending) = &self.pending {
            // a later line for the same cookie supersedes the earlier one
            let mut pending = pending.write();
            pending.retain(|(n, _)| *n != name);
            pending.push((name, line.to_string()));
        }
    }

    /// Take the recorded `Set-Cookie` lines, oldest first. Always empty for a
    /// non-recording jar.
    pub fn drain_set_cookies(&self) -> Vec<String> {
        match &self.pending {
            Some(pending) => pending.write().drain(..).map(|(_, line)| line).collect(),
            None => Vec::new(),
        }
    }

    pub fn snapshot(&self) -> Vec<Cookie> {
        let now = Utc::now();
        self.cookies.read().iter().filter(|c| c.is_live(now)).cloned().collect()
    }
}

impl CredentialStore for CookieJar {
    fn get(&self, key: &str) -> Option<String> {
        lookup_cookie(&self.cookie_header(), key)
    }

    fn set(&self, key: &str, value: &str, expires_at: DateTime<Utc>) {
        self.apply_set_cookie(&format!("{}={};expires={};path=/;SameSite=Lax", key, value, format_cookie_date(expires_at)));
    }

    fn remove(&self, key: &str) {
        self.apply_set_cookie(&format!("{}=;expires={};path=/;", key, EPOCH_EXPIRES));
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cookie file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("cookie file {path} is not valid JSON: {source}")]
    Format { path: String, #[source] source: serde_json::Error },
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct JarFile {
    #[serde(default)]
    cookies: Vec<Cookie>,
}

/// A `CookieJar` backed by a JSON file shared with other processes.
///
/// Every read reloads the file, and every write reloads, applies the change and
/// saves, so the last writer wins and readers see its write.
#[derive(Debug)]
pub struct FileCookieJar {
    path: PathBuf,
    jar: CookieJar,
    io: Mutex<()>,
}

impl FileCookieJar {
    /// Open the jar at `path`. A missing or unreadable file yields an empty jar.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let cookies = match Self::load(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(target: "session.cookie", "starting with an empty jar: {}", e);
                Vec::new()
            }
        };
        Self { path, jar: CookieJar::from_cookies(cookies), io: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn jar(&self) -> &CookieJar { &self.jar }

    fn load(path: &Path) -> Result<Vec<Cookie>, StoreError> {
        if !path.exists() { return Ok(Vec::new()); }
        let text = std::fs::read_to_string(path)
            .map_err(|source| StoreError::Io { path: path.display().to_string(), source })?;
        if text.trim().is_empty() { return Ok(Vec::new()); }
        let file: JarFile = serde_json::from_str(&text)
            .map_err(|source| StoreError::Format { path: path.display().to_string(), source })?;
        let now = Utc::now();
        Ok(file.cookies.into_iter().filter(|c| c.is_live(now)).collect())
    }

    /// Replace the in-memory jar with the file's contents. A missing file is an empty
    /// jar; an unreadable one leaves the in-memory jar as it was.
    fn sync(&self) {
        match Self::load(&self.path) {
            Ok(cookies) => self.jar.replace_cookies(cookies),
            Err(e) => debug!(target: "session.cookie", "keeping in-memory jar: {}", e),
        }
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io { path: self.path.display().to_string(), source };
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(io_err)?;
            }
        }
        let file = JarFile { cookies: self.jar.snapshot() };
        let text = serde_json::to_string_pretty(&file)
            .map_err(|source| StoreError::Format { path: self.path.display().to_string(), source })?;
        std::fs::write(&self.path, text).map_err(io_err)
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!(target: "session.cookie", "cookie jar not persisted: {}", e);
        }
    }
}

impl CredentialStore for FileCookieJar {
    fn get(&self, key: &str) -> Option<String> {
        let _io = self.io.lock();
        self.sync();
        self.jar.get(key)
    }

    fn set(&self, key: &str, value: &str, expires_at: DateTime<Utc>) {
        let _io = self.io.lock();
        self.sync();
        self.jar.set(key, value, expires_at);
        self.persist();
    }

    fn remove(&self, key: &str) {
        let _io = self.io.lock();
        self.sync();
        self.jar.remove(key);
        self.persist();
    }
}
