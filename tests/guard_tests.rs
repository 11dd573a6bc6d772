//! Route guard state transitions across login/logout without a reload.

use serde_json::json;

use silvercar::identity::{compose_unsigned, GuardKind, GuardState, RouteGuard, Session};

fn login_as(session: &Session, role: &str) {
    session.set_credential(&compose_unsigned(&json!({"id": 1, "role": role})), None, None);
}

#[test]
fn protected_route_redirects_anonymous_visitors_to_login() {
    let s = Session::in_memory();
    let mut g = RouteGuard::new(GuardKind::Authenticated);
    g.on_navigate("/profile", &s);
    assert!(!g.renders());
    assert_eq!(g.redirect(), Some("/login"));
}

#[test]
fn protected_route_allows_any_role() {
    let s = Session::in_memory();
    let mut g = RouteGuard::new(GuardKind::Authenticated);
    for role in ["user", "manager", "admin"] {
        login_as(&s, role);
        assert_eq!(g.on_navigate("/profile", &s), &GuardState::Allowed, "{role}");
    }
}

#[test]
fn admin_route_sends_non_admins_to_profile() {
    let s = Session::in_memory();
    let mut g = RouteGuard::new(GuardKind::AdminOnly);

    g.on_navigate("/admin", &s);
    assert_eq!(g.redirect(), Some("/login"));

    login_as(&s, "user");
    g.on_navigate("/admin", &s);
    assert_eq!(g.redirect(), Some("/profile"));

    login_as(&s, "Admin");
    g.on_navigate("/admin", &s);
    assert!(g.renders());
}

#[test]
fn garbled_token_passes_authenticated_guard_but_not_admin_guard() {
    let s = Session::in_memory();
    s.set_credential("not-a-jwt", None, None);
    let mut auth = RouteGuard::new(GuardKind::Authenticated);
    let mut admin = RouteGuard::new(GuardKind::AdminOnly);
    assert!(matches!(auth.on_navigate("/profile", &s), GuardState::Allowed));
    admin.on_navigate("/admin", &s);
    assert_eq!(admin.redirect(), Some("/profile"));
}

#[test]
fn guest_pages_bounce_signed_in_users() {
    let s = Session::in_memory();
    let mut g = RouteGuard::new(GuardKind::GuestOnly);
    assert!(matches!(g.on_navigate("/login", &s), GuardState::Allowed));
    login_as(&s, "user");
    g.on_navigate("/register", &s);
    assert_eq!(g.redirect(), Some("/admin"));
}

#[test]
fn logout_is_seen_on_next_navigation() {
    let s = Session::in_memory();
    login_as(&s, "admin");
    let mut g = RouteGuard::new(GuardKind::AdminOnly);
    assert!(matches!(g.on_navigate("/admin", &s), GuardState::Allowed));

    s.logout();
    // still Allowed until the guard re-evaluates
    assert!(g.renders());
    g.refresh(&s);
    assert_eq!(g.redirect(), Some("/login"));
    assert_eq!(g.target(), Some("/admin"));
}

#[test]
fn denial_reason_maps_to_http_status() {
    let s = Session::in_memory();
    let mut g = RouteGuard::new(GuardKind::Authenticated);
    match g.on_navigate("/orders", &s) {
        GuardState::Denied { reason, .. } => assert_eq!(reason.http_status(), 401),
        other => panic!("expected denial, got {:?}", other),
    }
}

#[test]
fn checking_state_renders_nothing_until_completed() {
    let s = Session::in_memory();
    login_as(&s, "admin");
    let mut g = RouteGuard::new(GuardKind::AdminOnly);

    assert_eq!(g.begin("/admin"), &GuardState::Checking);
    assert!(!g.renders());
    assert_eq!(g.redirect(), None);
    assert_eq!(g.target(), Some("/admin"));

    assert_eq!(g.complete(&s), &GuardState::Allowed);
    assert!(g.renders());

    // a full navigation never leaves the guard checking
    s.logout();
    assert_ne!(g.on_navigate("/admin", &s), &GuardState::Checking);
    assert_eq!(g.redirect(), Some("/login"));
}
