use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::claims::Claims;
use super::role::Role;
use super::store::{self, CredentialStore, MemoryStore, DEFAULT_TTL_DAYS};
use super::token;

/// Knobs for the two places where a stricter reading of the credential is possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Treat an undecodable token as logged out instead of "authenticated but anonymous".
    pub require_decodable: bool,
    /// Compare the `exp` claim against the local clock.
    pub enforce_expiry: bool,
    pub ttl_days: i64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self { require_decodable: false, enforce_expiry: false, ttl_days: DEFAULT_TTL_DAYS }
    }
}

/// What one read of the store yields. Built fresh on every call.
struct Snapshot {
    authenticated: bool,
    claims: Option<Claims>,
}

/// The single surface the rest of the application queries about the current user.
///
/// Holds no state of its own beyond the injected store: every accessor re-reads the
/// credential and re-decodes it, so a login or logout elsewhere is visible immediately.
/// No accessor panics or returns an error; failure is always `None` / `false`.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn CredentialStore>,
    policy: SessionPolicy,
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("available", &self.store.is_available())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self::with_policy(store, SessionPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn CredentialStore>, policy: SessionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn in_memory() -> Self { Self::new(Arc::new(MemoryStore::new())) }

    pub fn policy(&self) -> SessionPolicy { self.policy }

    pub fn store(&self) -> &Arc<dyn CredentialStore> { &self.store }

    /// Persist a credential; `None` falls back to `Bearer` and the policy TTL.
    pub fn set_credential(&self, token: &str, token_type: Option<&str>, ttl_days: Option<i64>) {
        store::set_credential(
            self.store.as_ref(),
            token,
            token_type.unwrap_or(store::DEFAULT_TOKEN_TYPE),
            ttl_days.unwrap_or(self.policy.ttl_days),
        );
    }

    pub fn token(&self) -> Option<String> { store::get_token(self.store.as_ref()) }

    pub fn token_type(&self) -> String { store::get_token_type(self.store.as_ref()) }

    fn snapshot(&self) -> Snapshot {
        let Some(raw) = self.token() else {
            return Snapshot { authenticated: false, claims: None };
        };
        let claims = token::decode(&raw);
        if self.policy.require_decodable && claims.is_none() {
            return Snapshot { authenticated: false, claims: None };
        }
        if self.policy.enforce_expiry {
            if let Some(exp) = claims.as_ref().and_then(|c| c.expires_at()) {
                if exp <= Utc::now() {
                    debug!(target: "session", %exp, "credential past its exp claim");
                    return Snapshot { authenticated: false, claims: None };
                }
            }
        }
        Snapshot { authenticated: true, claims }
    }

    /// Presence of a stored token, plus whatever the policy additionally requires.
    pub fn is_authenticated(&self) -> bool { self.snapshot().authenticated }

    pub fn claims(&self) -> Option<Claims> { self.snapshot().claims }

    pub fn role(&self) -> Role { Role::from_claims(self.claims().as_ref()) }

    pub fn is_admin(&self) -> bool { self.role() == Role::Admin }

    pub fn is_manager(&self) -> bool { self.role() == Role::Manager }

    pub fn username(&self) -> Option<String> { self.claims()?.username() }

    pub fn email(&self) -> Option<String> { self.claims()?.email() }

    pub fn user_id(&self) -> Option<i64> { self.claims()?.user_id() }

    pub fn user_id_string(&self) -> Option<String> { self.claims()?.user_id_string() }

    /// `Authorization` header value for authenticated requests: `<token_type> <access_token>`.
    pub fn authorization_header(&self) -> Option<String> {
        if !self.is_authenticated() { return None; }
        let token = self.token()?;
        Some(format!("{} {}", self.token_type(), token))
    }

    /// Forget the credential. Callers must drop any UI state derived from the old session.
    pub fn logout(&self) {
        store::clear(self.store.as_ref());
    }
}
