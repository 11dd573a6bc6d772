//! Session facade behaviour against the in-memory and cookie-backed stores.
//! Covers the decode properties, credential lifecycle and the claim scenarios
//! the front-end pages depend on (profile, admin panel, order history).

use std::sync::Arc;

use base64::Engine;
use serde_json::{json, Value};

use silvercar::identity::{
    compose_unsigned, decode, CookieJar, CredentialStore, MemoryStore, Role, Session, ACCESS_TOKEN_KEY, TOKEN_TYPE_KEY,
};

fn session_with(payload: Value) -> Session {
    let s = Session::in_memory();
    s.set_credential(&compose_unsigned(&payload), Some("Bearer"), None);
    s
}

#[test]
fn decode_returns_the_encoded_object() {
    let payloads = [
        json!({}),
        json!({"id": 42, "email": "a@b.com", "role": "admin"}),
        json!({"sub": "60f0c0ffee", "nested": {"k": [1, 2, 3]}, "name": "Иван"}),
    ];
    for p in payloads {
        let claims = decode(&compose_unsigned(&p)).expect("decodable");
        assert_eq!(Value::Object(claims.into_map()), p);
    }
}

#[test]
fn decode_rejects_wrong_segment_counts() {
    let body = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(r#"{"id":1}"#);
    let tokens = vec![
        String::new(),
        "x".to_string(),
        format!("h.{}", body),
        format!("h.{}.s.extra", body),
        format!(".{}..", body),
    ];
    for token in &tokens {
        assert!(decode(token).is_none(), "{token}");
    }
}

#[test]
fn decode_never_panics_on_garbage_payloads() {
    let b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let garbage = [
        "h.!!!.s".to_string(),
        "h.a.s".to_string(),
        format!("h.{}.s", b64.encode("{\"id\": ")),
        format!("h.{}.s", b64.encode([0xff_u8, 0xfe, 0x00])),
        format!("h.{}.s", b64.encode("[]")),
    ];
    for token in &garbage {
        assert!(decode(token).is_none(), "{token}");
    }
}

#[test]
fn credential_lifecycle() {
    let s = Session::in_memory();
    assert!(!s.is_authenticated());
    assert_eq!(s.token(), None);

    s.set_credential("t0k3n", Some("Bearer"), None);
    assert!(s.is_authenticated());
    assert_eq!(s.token().as_deref(), Some("t0k3n"));

    s.logout();
    assert!(!s.is_authenticated());
    assert_eq!(s.token(), None);
}

#[test]
fn role_matching_is_case_insensitive() {
    for raw in ["ADMIN", "Admin", "admin"] {
        let s = session_with(json!({ "role": raw }));
        assert!(s.is_admin(), "{raw}");
        assert!(!s.is_manager());
    }
    let s = session_with(json!({"user_role": "Manager"}));
    assert_eq!(s.role(), Role::Manager);
    assert!(s.is_manager());
}

#[test]
fn missing_role_claim_is_plain_user() {
    assert_eq!(session_with(json!({"id": 1})).role(), Role::User);
}

#[test]
fn admin_with_numeric_id() {
    let s = session_with(json!({"id": 42, "email": "a@b.com", "role": "admin"}));
    assert!(s.is_admin());
    assert_eq!(s.user_id(), Some(42));
    assert_eq!(s.user_id_string().as_deref(), Some("42"));
    assert_eq!(s.email().as_deref(), Some("a@b.com"));
}

#[test]
fn opaque_id_only_available_as_string() {
    let s = session_with(json!({"sub": "60f...abc", "username": "joe"}));
    assert_eq!(s.user_id(), None);
    assert_eq!(s.user_id_string().as_deref(), Some("60f...abc"));
    assert_eq!(s.username().as_deref(), Some("joe"));
    assert_eq!(s.role(), Role::User);
}

#[test]
fn no_token_means_everything_absent() {
    let s = Session::in_memory();
    assert!(!s.is_authenticated());
    assert_eq!(s.username(), None);
    assert_eq!(s.email(), None);
    assert_eq!(s.user_id(), None);
    assert_eq!(s.user_id_string(), None);
    assert_eq!(s.claims(), None);
    assert_eq!(s.role(), Role::User);
    assert!(!s.is_admin());
}

#[test]
fn logout_twice_equals_logout_once() {
    let store = Arc::new(MemoryStore::new());
    let s = Session::new(store.clone());
    s.set_credential("tok", None, None);
    s.logout();
    let after_once = (s.is_authenticated(), s.token(), s.token_type(), store.len());
    s.logout();
    let after_twice = (s.is_authenticated(), s.token(), s.token_type(), store.len());
    assert_eq!(after_once, after_twice);
    assert_eq!(store.len(), 0);
}

#[test]
fn accessors_reflect_store_changes_without_caching() {
    let store = Arc::new(MemoryStore::new());
    let a = Session::new(store.clone());
    let b = Session::new(store.clone());
    a.set_credential(&compose_unsigned(&json!({"role": "user"})), None, None);
    assert!(!b.is_admin());
    a.set_credential(&compose_unsigned(&json!({"role": "admin"})), None, None);
    assert!(b.is_admin());
    b.logout();
    assert!(!a.is_authenticated());
}

#[test]
fn cookie_backed_session_uses_documented_keys() {
    let jar = Arc::new(CookieJar::recording());
    let s = Session::new(jar.clone());
    let token = compose_unsigned(&json!({"id": 5, "username": "ann"}));
    s.set_credential(&token, None, Some(7));

    assert_eq!(jar.get(ACCESS_TOKEN_KEY).as_deref(), Some(token.as_str()));
    assert_eq!(jar.get(TOKEN_TYPE_KEY).as_deref(), Some("Bearer"));
    assert_eq!(s.authorization_header(), Some(format!("Bearer {}", token)));
    assert_eq!(s.username().as_deref(), Some("ann"));

    let written = jar.drain_set_cookies();
    assert_eq!(written.len(), 2);
    assert!(written.iter().all(|l| l.contains(";path=/;SameSite=Lax")));

    s.logout();
    assert_eq!(jar.cookie_header(), "");
    let cleared = jar.drain_set_cookies();
    assert_eq!(cleared.len(), 2);
    assert!(cleared.iter().all(|l| l.contains("expires=Thu, 01 Jan 1970 00:00:00 GMT")));
}

#[test]
fn session_seeded_from_request_cookie_header() {
    let token = compose_unsigned(&json!({"role": "manager", "email": "m@x.ru"}));
    let jar = CookieJar::from_cookie_header(&format!("theme=dark; access_token={}; token_type=Bearer", token));
    let s = Session::new(Arc::new(jar));
    assert!(s.is_manager());
    assert_eq!(s.email().as_deref(), Some("m@x.ru"));
}

#[test]
fn cookie_unsafe_tokens_are_not_stored() {
    let jar = Arc::new(CookieJar::new());
    let s = Session::new(jar.clone());
    s.set_credential("good", None, None);
    for bad in ["a;b", " padded ", "two words"] {
        s.set_credential(bad, None, None);
        // the previous credential is left in place
        assert_eq!(s.token().as_deref(), Some("good"), "{bad:?}");
    }
    assert_eq!(jar.cookie_header().matches("access_token=").count(), 1);
}
