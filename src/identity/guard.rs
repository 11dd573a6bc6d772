//! Route gating on top of the session facade.
//!
//! A guard starts `Unchecked`, passes through `Checking` on every navigation and
//! settles on `Allowed` or `Denied`. A denied guard renders nothing and carries the
//! path the router should redirect to.

use tracing::debug;

use super::session::Session;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// Any logged-in user.
    Authenticated,
    /// Logged-in users whose role is admin.
    AdminOnly,
    /// Login/register/reset pages: only for visitors without a session.
    GuestOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardRoutes {
    pub login: String,
    /// Where authenticated users without the required role are sent.
    pub unprivileged_landing: String,
    /// Where authenticated users are sent away from guest-only pages.
    pub authenticated_home: String,
}

impl Default for GuardRoutes {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            unprivileged_landing: "/profile".to_string(),
            authenticated_home: "/admin".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Unchecked,
    Checking,
    Allowed,
    Denied { redirect: String, reason: AppError },
}

/// One-shot policy decision for `kind` against the current session.
pub fn evaluate(kind: GuardKind, routes: &GuardRoutes, session: &Session) -> GuardState {
    let authenticated = session.is_authenticated();
    match kind {
        GuardKind::Authenticated | GuardKind::AdminOnly if !authenticated => GuardState::Denied {
            redirect: routes.login.clone(),
            reason: AppError::auth("login_required", "sign in to continue"),
        },
        GuardKind::AdminOnly if !session.is_admin() => GuardState::Denied {
            redirect: routes.unprivileged_landing.clone(),
            reason: AppError::forbidden("admin_required", "administrator role required"),
        },
        GuardKind::GuestOnly if authenticated => GuardState::Denied {
            redirect: routes.authenticated_home.clone(),
            reason: AppError::forbidden("already_authenticated", "already signed in"),
        },
        _ => GuardState::Allowed,
    }
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    kind: GuardKind,
    routes: GuardRoutes,
    state: GuardState,
    target: Option<String>,
}

impl RouteGuard {
    pub fn new(kind: GuardKind) -> Self { Self::with_routes(kind, GuardRoutes::default()) }

    pub fn with_routes(kind: GuardKind, routes: GuardRoutes) -> Self {
        Self { kind, routes, state: GuardState::Unchecked, target: None }
    }

    pub fn kind(&self) -> GuardKind { self.kind }

    pub fn state(&self) -> &GuardState { &self.state }

    pub fn target(&self) -> Option<&str> { self.target.as_deref() }

    /// Re-evaluate for a navigation to `target`. Runs on every call: the credential may
    /// have changed since the last navigation without a reload.
    pub fn on_navigate(&mut self, target: &str, session: &Session) -> &GuardState {
        self.begin(target);
        self.complete(session)
    }

    /// Start a navigation to `target`. The guard stays `Checking`, rendering nothing,
    /// until `complete` runs.
    pub fn begin(&mut self, target: &str) -> &GuardState {
        self.target = Some(target.to_string());
        self.state = GuardState::Checking;
        debug!(target: "session.guard", kind = ?self.kind, path = target, "checking route");
        &self.state
    }

    /// Settle the pending check against the session's current credential.
    pub fn complete(&mut self, session: &Session) -> &GuardState {
        self.state = evaluate(self.kind, &self.routes, session);
        debug!(target: "session.guard", kind = ?self.kind, path = self.target.as_deref().unwrap_or("/"), state = ?self.state, "route evaluated");
        &self.state
    }

    /// Re-run the check for the current target (e.g. after a login/logout event).
    pub fn refresh(&mut self, session: &Session) -> &GuardState {
        let target = self.target.clone().unwrap_or_else(|| "/".to_string());
        self.on_navigate(&target, session)
    }

    /// Children are rendered only once the guard has allowed the route.
    pub fn renders(&self) -> bool { matches!(self.state, GuardState::Allowed) }

    pub fn redirect(&self) -> Option<&str> {
        match &self.state {
            GuardState::Denied { redirect, .. } => Some(redirect.as_str()),
            _ => None,
        }
    }
}
