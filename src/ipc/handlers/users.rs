use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{persist, require_role, require_session, require_store, str_param};
use crate::ipc::types::{AppState, Request};
use crate::model::{User, UserRole};
use serde_json::json;

fn handle_users_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let session = match require_session(store, req) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&session, &[UserRole::Admin], req) {
        return resp;
    }
    let users: Vec<serde_json::Value> = store.users.iter().map(User::public_json).collect();
    ok(&req.id, json!({ "users": users }))
}

fn handle_users_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let session = match require_session(store, req) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&session, &[UserRole::Admin], req) {
        return resp;
    }
    let user_id = match str_param(req, "userId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let before = store.users.len();
    store.users.retain(|u| u.id != user_id);
    if store.users.len() == before {
        return err(&req.id, "not_found", "user not found", None);
    }
    // Deleting the signed-in account also drops the session.
    if store.session.as_ref().map(|u| u.id.as_str()) == Some(user_id.as_str()) {
        store.session = None;
    }
    if let Err(resp) = persist(store, req) {
        return resp;
    }
    ok(&req.id, json!({ "deleted": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.list" => Some(handle_users_list(state, req)),
        "users.delete" => Some(handle_users_delete(state, req)),
        _ => None,
    }
}
