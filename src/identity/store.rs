//! Credential persistence.
//!
//! The bearer credential lives in two scoped key/value entries (`access_token` and
//! `token_type`), each written with an expiry horizon. Every backend degrades to
//! "absent" instead of failing: the UI must render a logged-out state, never crash.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const TOKEN_TYPE_KEY: &str = "token_type";
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Site-scoped key/value storage with per-entry expiry.
///
/// Implementations must never panic and must treat a missing, expired or
/// unreadable entry as `None`.
pub trait CredentialStore: Send + Sync {
    /// False in contexts with no ambient storage (e.g. server-side rendering).
    fn is_available(&self) -> bool { true }
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str, expires_at: DateTime<Utc>);
    /// Expire the entry immediately. Removing a missing key is a no-op.
    fn remove(&self, key: &str);
}

fn expiry_after_days(now: DateTime<Utc>, ttl_days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(ttl_days.max(0))
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A value that survives a `name=value;` cookie write unchanged.
fn is_cookie_safe(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(|c| c == ';' || c.is_whitespace() || c.is_control())
}

/// Persist the credential pair. An empty token or an unavailable store is a silent no-op.
///
/// Tokens containing `;`, whitespace or control characters are refused: the cookie
/// backend cannot store them verbatim.
pub fn set_credential(store: &dyn CredentialStore, token: &str, token_type: &str, ttl_days: i64) {
    if token.is_empty() {
        debug!(target: "session.store", "ignoring empty credential");
        return;
    }
    if !is_cookie_safe(token) {
        warn!(target: "session.store", token_len = token.len(), "refusing credential that is not cookie-safe");
        return;
    }
    if !store.is_available() {
        debug!(target: "session.store", "storage unavailable; credential not persisted");
        return;
    }
    let token_type = if is_cookie_safe(token_type.trim()) { token_type.trim() } else { DEFAULT_TOKEN_TYPE };
    let expires_at = expiry_after_days(Utc::now(), ttl_days);
    store.set(ACCESS_TOKEN_KEY, token, expires_at);
    store.set(TOKEN_TYPE_KEY, token_type, expires_at);
    info!(target: "session.store", token_len = token.len(), token_type, %expires_at, "credential stored");
}

pub fn get_token(store: &dyn CredentialStore) -> Option<String> {
    if !store.is_available() { return None; }
    store.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty())
}

pub fn get_token_type(store: &dyn CredentialStore) -> String {
    if !store.is_available() { return DEFAULT_TOKEN_TYPE.to_string(); }
    store
        .get(TOKEN_TYPE_KEY)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string())
}

/// Expire both entries. Safe to call repeatedly or when nothing is stored.
pub fn clear(store: &dyn CredentialStore) {
    if !store.is_available() { return; }
    store.remove(ACCESS_TOKEN_KEY);
    store.remove(TOKEN_TYPE_KEY);
    info!(target: "session.store", "credential cleared");
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Process-local store, used by tests and by embedders that keep the session in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize {
        let now = Utc::now();
        self.entries.read().values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Drop `key` if it is still expired as of `now`. A writer may have replaced the
    /// entry between the reader's check and this call.
    fn evict_expired(&self, key: &str, now: DateTime<Utc>) {
        let mut map = self.entries.write();
        if map.get(key).is_some_and(|e| e.expires_at <= now) {
            map.remove(key);
        }
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let now = Utc::now();
        let mut expired = false;
        let out = {
            let map = self.entries.read();
            match map.get(key) {
                Some(e) if e.expires_at > now => Some(e.value.clone()),
                Some(_) => { expired = true; None }
                None => None,
            }
        };
        if expired {
            self.evict_expired(key, now);
        }
        out
    }

    fn set(&self, key: &str, value: &str, expires_at: DateTime<Utc>) {
        let mut map = self.entries.write();
        if expires_at <= Utc::now() {
            map.remove(key);
            return;
        }
        map.insert(key.to_string(), Entry { value: value.to_string(), expires_at });
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

/// Stand-in for a context without ambient storage: reads are absent, writes vanish.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl CredentialStore for UnavailableStore {
    fn is_available(&self) -> bool { false }
    fn get(&self, _key: &str) -> Option<String> { None }
    fn set(&self, _key: &str, _value: &str, _expires_at: DateTime<Utc>) {}
    fn remove(&self, _key: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips_both_entries() {
        let store = MemoryStore::new();
        set_credential(&store, "abc.def.ghi", "Bearer", DEFAULT_TTL_DAYS);
        assert_eq!(get_token(&store).as_deref(), Some("abc.def.ghi"));
        assert_eq!(get_token_type(&store), "Bearer");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn token_type_defaults_when_unset_or_blank() {
        let store = MemoryStore::new();
        assert_eq!(get_token_type(&store), "Bearer");
        set_credential(&store, "t", "  ", 1);
        assert_eq!(get_token_type(&store), "Bearer");
        set_credential(&store, "t", "JWT", 1);
        assert_eq!(get_token_type(&store), "JWT");
    }

    #[test]
    fn empty_token_is_not_persisted() {
        let store = MemoryStore::new();
        set_credential(&store, "", "Bearer", 7);
        assert!(store.is_empty());
        assert_eq!(get_token(&store), None);
    }

    #[test]
    fn tokens_that_break_a_cookie_write_are_refused() {
        let store = MemoryStore::new();
        for bad in ["a;b", " tok", "tok ", "to k", "tok\n"] {
            set_credential(&store, bad, "Bearer", 7);
            assert!(store.is_empty(), "{bad:?}");
        }
        set_credential(&store, "tok", "Bear;er", 7);
        assert_eq!(get_token_type(&store), DEFAULT_TOKEN_TYPE);
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let store = MemoryStore::new();
        set_credential(&store, "t", "Bearer", 0);
        assert_eq!(get_token(&store), None);
    }

    #[test]
    fn expired_entries_read_as_absent() {
        let store = MemoryStore::new();
        store.set(ACCESS_TOKEN_KEY, "t", Utc::now() + TimeDelta::try_days(1).unwrap());
        {
            // back-date the entry behind the store's back
            let mut map = store.entries.write();
            map.get_mut(ACCESS_TOKEN_KEY).unwrap().expires_at = Utc::now() - TimeDelta::try_seconds(1).unwrap();
        }
        assert_eq!(get_token(&store), None);
        assert!(store.entries.read().is_empty());
    }

    #[test]
    fn eviction_spares_an_entry_rewritten_after_the_expiry_check() {
        let store = MemoryStore::new();
        let checked_at = Utc::now();
        // a fresh login lands after a reader saw the old entry as expired
        store.set(ACCESS_TOKEN_KEY, "fresh", checked_at + TimeDelta::try_days(1).unwrap());
        store.evict_expired(ACCESS_TOKEN_KEY, checked_at);
        assert_eq!(get_token(&store).as_deref(), Some("fresh"));

        store.entries.write().get_mut(ACCESS_TOKEN_KEY).unwrap().expires_at = checked_at;
        store.evict_expired(ACCESS_TOKEN_KEY, checked_at);
        assert!(store.entries.read().is_empty());
    }

    #[test]
    fn clear_is_idempotent() {
        let store = MemoryStore::new();
        clear(&store);
        set_credential(&store, "t", "Bearer", 7);
        clear(&store);
        clear(&store);
        assert_eq!(get_token(&store), None);
        assert!(store.is_empty());
    }

    #[test]
    fn unavailable_store_degrades_silently() {
        let store = UnavailableStore;
        set_credential(&store, "t", "Bearer", 7);
        assert_eq!(get_token(&store), None);
        assert_eq!(get_token_type(&store), "Bearer");
        clear(&store);
    }

    #[test]
    fn huge_ttl_saturates_instead_of_overflowing() {
        let now = Utc::now();
        assert_eq!(expiry_after_days(now, i64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(expiry_after_days(now, -5), now);
    }
}
