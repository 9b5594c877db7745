use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::model::{User, UserRole};
use crate::store::Store;

pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

/// Fails with `no_workspace` until `workspace.select` has been called.
pub fn require_store<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut Store, serde_json::Value> {
    match state.store.as_mut() {
        Some(store) => Ok(store),
        None => Err(err(&req.id, "no_workspace", "select a workspace first", None)),
    }
}

/// Returns a clone of the authenticated user so callers can keep mutating
/// the store while holding it.
pub fn require_session(store: &Store, req: &Request) -> Result<User, serde_json::Value> {
    match &store.session {
        Some(user) => Ok(user.clone()),
        None => Err(err(&req.id, "no_session", "log in first", None)),
    }
}

pub fn require_role(
    user: &User,
    allowed: &[UserRole],
    req: &Request,
) -> Result<(), serde_json::Value> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(err(
            &req.id,
            "forbidden",
            format!("not allowed for role {}", user.role.as_str()),
            None,
        ))
    }
}

pub fn str_param(req: &Request, name: &str) -> Result<String, serde_json::Value> {
    match req.params.get(name).and_then(|v| v.as_str()) {
        Some(v) => Ok(v.to_string()),
        None => Err(err(&req.id, "bad_params", format!("missing {}", name), None)),
    }
}

pub fn opt_str_param(req: &Request, name: &str) -> Option<String> {
    req.params
        .get(name)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

pub fn persist(store: &Store, req: &Request) -> Result<(), serde_json::Value> {
    store
        .save()
        .map_err(|e| err(&req.id, "persist_failed", format!("{e:?}"), None))
}
