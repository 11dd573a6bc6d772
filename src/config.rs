//! Runtime configuration: backend base URL and session settings.
//! Values come from environment variables; the binary lets flags override them.

use std::path::PathBuf;

use crate::identity::{SessionPolicy, DEFAULT_TTL_DAYS};

pub const ENV_API_URL: &str = "SILVERCAR_API_URL";
pub const ENV_TOKEN_TTL_DAYS: &str = "SILVERCAR_TOKEN_TTL_DAYS";
pub const ENV_REQUIRE_DECODABLE: &str = "SILVERCAR_REQUIRE_DECODABLE";
pub const ENV_ENFORCE_EXPIRY: &str = "SILVERCAR_ENFORCE_EXPIRY";
pub const ENV_COOKIE_FILE: &str = "SILVERCAR_COOKIE_FILE";

/// Hosts where the site is served behind the reverse proxy that mounts the API at `/api`.
pub const PRODUCTION_HOSTS: &[&str] = &["24silvercar.ru", "www.24silvercar.ru"];
pub const PRODUCTION_API_PATH: &str = "/api";
pub const DEVELOPMENT_API_URL: &str = "http://127.0.0.1:8001";
pub const DEFAULT_COOKIE_FILE: &str = ".silvercar/cookies.json";

pub fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    /// Explicit override first, then the production proxy path, then the local dev server.
    pub fn resolve(explicit: Option<&str>, hostname: Option<&str>) -> Self {
        if let Some(url) = explicit.map(str::trim).filter(|u| !u.is_empty()) {
            return Self { base_url: url.trim_end_matches('/').to_string() };
        }
        let host = hostname.map(|h| h.trim().to_ascii_lowercase());
        if host.as_deref().map(|h| PRODUCTION_HOSTS.contains(&h)).unwrap_or(false) {
            return Self { base_url: PRODUCTION_API_PATH.to_string() };
        }
        Self { base_url: DEVELOPMENT_API_URL.to_string() }
    }

    pub fn from_env(hostname: Option<&str>) -> Self {
        let explicit = std::env::var(ENV_API_URL).ok();
        Self::resolve(explicit.as_deref(), hostname)
    }

    /// Join an endpoint path such as `/cars/7` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub policy: SessionPolicy,
    pub cookie_file: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { policy: SessionPolicy::default(), cookie_file: PathBuf::from(DEFAULT_COOKIE_FILE) }
    }
}

impl SessionSettings {
    /// Build settings from a variable lookup. Unparseable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Self::default();
        if let Some(days) = lookup(ENV_TOKEN_TTL_DAYS).and_then(|v| v.trim().parse::<i64>().ok()) {
            if days > 0 { s.policy.ttl_days = days; }
        }
        if let Some(b) = lookup(ENV_REQUIRE_DECODABLE).and_then(|v| parse_bool(&v)) {
            s.policy.require_decodable = b;
        }
        if let Some(b) = lookup(ENV_ENFORCE_EXPIRY).and_then(|v| parse_bool(&v)) {
            s.policy.enforce_expiry = b;
        }
        if let Some(p) = lookup(ENV_COOKIE_FILE).filter(|p| !p.trim().is_empty()) {
            s.cookie_file = PathBuf::from(p);
        }
        s
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn ttl_days(&self) -> i64 {
        if self.policy.ttl_days > 0 { self.policy.ttl_days } else { DEFAULT_TTL_DAYS }
    }
}
