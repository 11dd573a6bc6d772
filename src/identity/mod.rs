//! Client-side identity: credential storage, token claims and role gating.
//! Keep the public surface thin and split implementation across sub-modules.

mod claims;
mod cookie;
mod guard;
mod login;
mod role;
mod session;
mod store;
mod token;

pub use claims::{Claims, EMAIL_CLAIMS, ID_CLAIMS, ROLE_CLAIMS, USERNAME_CLAIMS};
pub use cookie::{format_cookie_date, lookup_cookie, parse_cookie_date, parse_set_cookie, Cookie, CookieJar, FileCookieJar, StoreError};
pub use guard::{evaluate, GuardKind, GuardRoutes, GuardState, RouteGuard};
pub use login::{backend_error_message, LoginResponse};
pub use role::Role;
pub use session::{Session, SessionPolicy};
pub use store::{
    clear, get_token, get_token_type, set_credential, CredentialStore, MemoryStore, UnavailableStore,
    ACCESS_TOKEN_KEY, DEFAULT_TOKEN_TYPE, DEFAULT_TTL_DAYS, TOKEN_TYPE_KEY,
};
pub use token::{compose_unsigned, decode, decode_claims, TokenError};
