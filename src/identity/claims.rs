use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// Alias tables, evaluated first-match-wins. Backends disagree on claim names.
pub const ID_CLAIMS: &[&str] = &["id", "user_id", "userId", "sub"];
pub const USERNAME_CLAIMS: &[&str] = &["username", "user_name", "name"];
pub const EMAIL_CLAIMS: &[&str] = &["email"];
pub const ROLE_CLAIMS: &[&str] = &["role", "user_role", "userRole"];
pub const EXPIRY_CLAIM: &str = "exp";

/// Decoded token payload. Recomputed from the credential on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn from_map(map: Map<String, Value>) -> Self { Self(map) }

    pub fn into_map(self) -> Map<String, Value> { self.0 }

    pub fn as_map(&self) -> &Map<String, Value> { &self.0 }

    pub fn get(&self, key: &str) -> Option<&Value> { self.0.get(key) }

    /// First non-null value among `aliases`.
    pub fn first_of(&self, aliases: &[&str]) -> Option<&Value> {
        aliases.iter().find_map(|k| self.0.get(*k).filter(|v| !v.is_null()))
    }

    fn text_of(&self, aliases: &[&str]) -> Option<String> {
        match self.first_of(aliases)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn username(&self) -> Option<String> { self.text_of(USERNAME_CLAIMS) }

    pub fn email(&self) -> Option<String> { self.text_of(EMAIL_CLAIMS) }

    pub fn role_claim(&self) -> Option<String> { self.text_of(ROLE_CLAIMS) }

    /// Identifier rendered as text; works for numeric and opaque ids alike.
    pub fn user_id_string(&self) -> Option<String> { self.text_of(ID_CLAIMS) }

    /// Numeric identifier. Opaque ids (e.g. document-store object ids) yield `None`
    /// rather than a coerced number.
    pub fn user_id(&self) -> Option<i64> {
        match self.first_of(ID_CLAIMS)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_f64)),
            Value::String(s) => {
                // integer text only: "1e5" or "0x1f" are ids, not numbers
                s.trim().parse::<i64>().ok()
            }
            _ => None,
        }
    }

    /// `exp` as a UTC instant, when present and numeric (seconds since the epoch).
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let secs = match self.0.get(EXPIRY_CLAIM)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64))?,
            Value::String(s) => s.trim().parse::<i64>().ok()?,
            _ => return None,
        };
        DateTime::<Utc>::from_timestamp(secs, 0)
    }
}

fn integral_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
