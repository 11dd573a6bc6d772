//!
//! silvercar session tool
//! ----------------------
//! Drives the session core against a file-backed cookie jar so a session can be
//! stored, inspected, gated and cleared outside the browser. Configuration comes from
//! `SILVERCAR_*` environment variables; flags override them.

use std::env;
use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;

use silvercar::config::{ApiConfig, SessionSettings};
use silvercar::error::AppError;
use silvercar::identity::{self, FileCookieJar, GuardKind, GuardState, LoginResponse, RouteGuard, Session};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--jar <path>] [--strict] [--enforce-expiry] <command> [args]\n\nCommands:\n  login --token <t> [--type <type>] [--ttl-days <n>]   store a credential\n  login --response [<json>]                           store the token from a login response body (stdin when omitted)\n  status                                              print the current session as JSON\n  header                                              print the Authorization header value\n  decode <token>                                      print the claims carried by a token\n  guard <authenticated|admin|guest> [--target <path>] check a route; prints allow or redirect\n  api-url [--host <hostname>]                         print the resolved backend base URL\n  logout                                              clear the stored credential\n\nFlags:\n  --jar <path>          cookie jar file (default: $SILVERCAR_COOKIE_FILE or .silvercar/cookies.json)\n  --strict              an undecodable token does not count as a session\n  --enforce-expiry      honour the token's exp claim\n  -h, --help            show this help"
    );
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn require<T>(v: Option<T>, what: &str) -> Result<T, AppError> {
    v.ok_or_else(|| AppError::user("missing_argument".to_string(), format!("{} is required", what)))
}

fn guard_kind(name: &str) -> Result<GuardKind, AppError> {
    match name.to_ascii_lowercase().as_str() {
        "authenticated" | "auth" => Ok(GuardKind::Authenticated),
        "admin" => Ok(GuardKind::AdminOnly),
        "guest" => Ok(GuardKind::GuestOnly),
        other => Err(AppError::user("bad_guard".to_string(), format!("unknown guard '{}'", other))),
    }
}

fn read_stdin() -> Result<String, AppError> {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn run(command: &str, rest: &[String], session: &Session, settings: &SessionSettings) -> Result<(), AppError> {
    match command {
        "login" => {
            if has_flag(rest, "--response") {
                let body = match flag_value(rest, "--response").filter(|v| !v.starts_with("--")) {
                    Some(b) => b,
                    None => read_stdin()?,
                };
                let resp: LoginResponse = serde_json::from_str(&body)
                    .map_err(|e| AppError::user("bad_response".to_string(), format!("login response is not JSON: {}", e)))?;
                if !session.apply_login(&resp) {
                    return Err(AppError::auth("no_token", "login response carried no token"));
                }
            } else {
                let token = require(flag_value(rest, "--token"), "--token")?;
                let ttl = match flag_value(rest, "--ttl-days") {
                    Some(v) => Some(v.parse::<i64>().map_err(|_| AppError::user("bad_ttl".to_string(), format!("invalid --ttl-days '{}'", v)))?),
                    None => Some(settings.ttl_days()),
                };
                session.set_credential(&token, flag_value(rest, "--type").as_deref(), ttl);
            }
            println!("{}", json!({"status": "ok", "authenticated": session.is_authenticated(), "role": session.role()}));
            Ok(())
        }
        "status" => {
            let out = json!({
                "authenticated": session.is_authenticated(),
                "role": session.role(),
                "is_admin": session.is_admin(),
                "is_manager": session.is_manager(),
                "username": session.username(),
                "email": session.email(),
                "user_id": session.user_id(),
                "user_id_string": session.user_id_string(),
                "token_type": session.token_type(),
            });
            println!("{}", serde_json::to_string_pretty(&out).map_err(|e| AppError::internal("encode".to_string(), e.to_string()))?);
            Ok(())
        }
        "header" => {
            let h = session
                .authorization_header()
                .ok_or_else(|| AppError::auth("login_required", "no stored credential"))?;
            println!("{}", h);
            Ok(())
        }
        "decode" => {
            let token = require(rest.first().cloned(), "<token>")?;
            let claims = identity::decode_claims(&token)
                .map_err(|e| AppError::user("undecodable_token".to_string(), e.to_string()))?;
            println!("{}", serde_json::to_string_pretty(&claims).map_err(|e| AppError::internal("encode".to_string(), e.to_string()))?);
            Ok(())
        }
        "guard" => {
            let kind = guard_kind(&require(rest.first().cloned(), "guard kind")?)?;
            let target = flag_value(rest, "--target").unwrap_or_else(|| "/".to_string());
            let mut guard = RouteGuard::new(kind);
            match guard.on_navigate(&target, session) {
                GuardState::Allowed => {
                    println!("allow {}", target);
                    Ok(())
                }
                GuardState::Denied { redirect, reason } => {
                    println!("redirect {}", redirect);
                    Err(reason.clone())
                }
                other => Err(AppError::internal("guard_unsettled".to_string(), format!("{:?}", other))),
            }
        }
        "api-url" => {
            let host = flag_value(rest, "--host");
            println!("{}", ApiConfig::from_env(host.as_deref()).base_url);
            Ok(())
        }
        "logout" => {
            session.logout();
            println!("{}", json!({"status": "ok"}));
            Ok(())
        }
        other => Err(AppError::user("unknown_command".to_string(), format!("unknown command '{}'", other))),
    }
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);
    if args.is_empty() || has_flag(&args, "-h") || has_flag(&args, "--help") {
        print_usage(&program);
        return Ok(());
    }

    let mut settings = SessionSettings::from_env();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--jar" if positional.is_empty() => {
                if i + 1 >= args.len() { eprintln!("--jar requires a path"); print_usage(&program); std::process::exit(2); }
                settings.cookie_file = args[i + 1].clone().into();
                i += 2; continue;
            }
            "--strict" if positional.is_empty() => { settings.policy.require_decodable = true; }
            "--enforce-expiry" if positional.is_empty() => { settings.policy.enforce_expiry = true; }
            _ => positional.push(args[i].clone()),
        }
        i += 1;
    }
    let command = positional.first().cloned().context("missing command")?;

    tracing::debug!(target: "silvercar", jar = %settings.cookie_file.display(), policy = ?settings.policy, "session tool starting");
    let jar = FileCookieJar::open(&settings.cookie_file);
    let session = Session::with_policy(Arc::new(jar), settings.policy);

    if let Err(e) = run(&command, &positional[1..], &session, &settings) {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
    Ok(())
}
