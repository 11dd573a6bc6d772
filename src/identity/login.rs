use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::session::Session;
use super::store::DEFAULT_TOKEN_TYPE;

/// Body of a successful `/user/login` or registration response.
/// Some backends answer with `token` instead of `access_token`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl LoginResponse {
    pub fn bearer(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.token.as_deref().filter(|t| !t.is_empty()))
    }

    pub fn token_type(&self) -> &str {
        self.token_type.as_deref().filter(|t| !t.trim().is_empty()).unwrap_or(DEFAULT_TOKEN_TYPE)
    }
}

impl Session {
    /// Store the credential carried by a login response. Returns false when the
    /// response had no token, in which case the store is left untouched.
    pub fn apply_login(&self, resp: &LoginResponse) -> bool {
        let Some(token) = resp.bearer() else {
            warn!(target: "session.login", "login response carried no token");
            return false;
        };
        self.set_credential(token, Some(resp.token_type()), None);
        info!(target: "session.login", role = %self.role(), "login applied");
        true
    }
}

const ERROR_FIELDS: &[&str] = &["message", "error", "detail", "msg"];

/// Human-readable message for a failed backend call.
///
/// Tries the usual error fields in order, then an `errors` array, then the raw body,
/// and finally falls back to `HTTP <status>: <reason>` (or `HTTP <status>` when the
/// transport gave no reason phrase).
pub fn backend_error_message(status: u16, reason: Option<&str>, body: &str) -> String {
    let fallback = || match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => format!("HTTP {}: {}", status, r),
        None => format!("HTTP {}", status),
    };
    let body = body.trim();
    if body.is_empty() {
        return fallback();
    }
    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return body.to_string(),
    };
    match &parsed {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Object(map) => {
            for key in ERROR_FIELDS {
                if let Some(msg) = map.get(*key).and_then(message_text) {
                    return msg;
                }
            }
            if let Some(Value::Array(items)) = map.get("errors") {
                let joined = items.iter().filter_map(message_text).collect::<Vec<_>>().join(", ");
                if !joined.is_empty() {
                    return joined;
                }
            }
            parsed.to_string()
        }
        Value::Null => fallback(),
        other => other.to_string(),
    }
}

fn message_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        // e.g. validation detail lists: [{"loc": [...], "msg": "field required"}]
        Value::Array(items) => {
            let joined = items.iter().filter_map(message_text).collect::<Vec<_>>().join(", ");
            if joined.is_empty() { None } else { Some(joined) }
        }
        Value::Object(map) => map.get("msg").or_else(|| map.get("message")).and_then(message_text),
        _ => None,
    }
}
