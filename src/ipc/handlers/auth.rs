use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    hash_password, opt_str_param, persist, require_store, str_param,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{School, Upazila, User, UserRole};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

fn handle_sign_up(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let name = opt_str_param(req, "name").unwrap_or_default();
    let email = opt_str_param(req, "email").unwrap_or_default();
    let mobile = opt_str_param(req, "mobile").unwrap_or_default();
    let password = opt_str_param(req, "password").unwrap_or_default();
    let confirm = opt_str_param(req, "confirmPassword").unwrap_or_default();
    let role_str = match str_param(req, "role") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(role) = UserRole::parse(&role_str) else {
        return err(&req.id, "bad_params", format!("unknown role: {role_str}"), None);
    };

    // Validation order matches the sign-up screen: missing fields, then
    // mismatch, then length, then the role-specific fields.
    if name.is_empty() || email.is_empty() || mobile.is_empty() || password.is_empty() {
        return err(&req.id, "validation_failed", "missing fields", None);
    }
    if password != confirm {
        return err(&req.id, "validation_failed", "password mismatch", None);
    }
    if password.chars().count() < 3 {
        return err(&req.id, "validation_failed", "password too short", None);
    }

    let upazila_name = opt_str_param(req, "upazilaName")
        .map(|v| v.trim().to_string())
        .unwrap_or_default();
    let ipemis_code = opt_str_param(req, "ipemisCode").unwrap_or_default();
    if matches!(role, UserRole::Upazila | UserRole::School) && upazila_name.is_empty() {
        return err(&req.id, "validation_failed", "upazila name is required", None);
    }
    if role == UserRole::School && ipemis_code.is_empty() {
        return err(&req.id, "validation_failed", "ipemis code is required", None);
    }

    if store.users.iter().any(|u| u.email == email) {
        return err(&req.id, "duplicate_account", "email already registered", None);
    }

    // Reuse an upazila with the exact same name; otherwise provision one
    // with an id embedding the timestamp and the typed name.
    let mut created_upazila: Option<Upazila> = None;
    let upazila_id = if role == UserRole::Admin {
        None
    } else if let Some(existing) = store.upazila_by_name(&upazila_name) {
        Some(existing.id.clone())
    } else {
        let upazila = Upazila {
            id: format!("upz-custom-{}-{}", Utc::now().timestamp_millis(), upazila_name),
            name: upazila_name.clone(),
        };
        let id = upazila.id.clone();
        store.upazilas.push(upazila.clone());
        created_upazila = Some(upazila);
        Some(id)
    };

    // A school account immediately materializes a placeholder School so the
    // upazila's monitoring view can see it. The typed ipemis code is NOT
    // applied here; the placeholder keeps the zero-filled code until a
    // profile update supplies the real one.
    let mut created_school: Option<School> = None;
    let school_id = if role == UserRole::School {
        let school = School {
            id: format!("sch-{}", Uuid::new_v4()),
            name: if name.contains("স্কুল") {
                name.clone()
            } else {
                format!("{} এর বিদ্যালয়", name)
            },
            ipemis_code: "00000000000".to_string(),
            upazila_id: upazila_id.clone().unwrap_or_default(),
        };
        let id = school.id.clone();
        store.schools.push(school.clone());
        created_school = Some(school);
        Some(id)
    } else {
        None
    };

    let designation = match role {
        UserRole::School => "প্রধান শিক্ষক",
        UserRole::Upazila => "উপজেলা অফিসার",
        UserRole::Admin => "এডমিন",
    };

    let user = User {
        id: format!("u-{}", Uuid::new_v4()),
        name,
        email,
        password_hash: hash_password(&password),
        role,
        designation: Some(designation.to_string()),
        mobile: Some(mobile),
        division: None,
        district: None,
        upazila_id,
        school_id,
    };

    store.users.push(user.clone());
    store.session = Some(user.clone());
    if let Err(resp) = persist(store, req) {
        return resp;
    }

    ok(
        &req.id,
        json!({
            "user": user.public_json(),
            "createdUpazila": created_upazila,
            "createdSchool": created_school,
        }),
    )
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let identifier = match str_param(req, "identifier") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let password = match str_param(req, "password") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // The identifier matches either the email or the mobile number.
    let Some(user) = store.user_by_identifier(&identifier) else {
        return err(&req.id, "auth_unknown_user", "no account for that identifier", None);
    };
    if user.password_hash != hash_password(&password) {
        return err(&req.id, "auth_wrong_password", "wrong password", None);
    }

    let user = user.clone();
    store.session = Some(user.clone());
    if let Err(resp) = persist(store, req) {
        return resp;
    }
    ok(&req.id, json!({ "user": user.public_json() }))
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    store.session = None;
    if let Err(resp) = persist(store, req) {
        return resp;
    }
    ok(&req.id, json!({ "loggedOut": true }))
}

fn handle_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let user = store.session.as_ref().map(User::public_json);
    ok(&req.id, json!({ "user": user }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.signUp" => Some(handle_sign_up(state, req)),
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.current" => Some(handle_current(state, req)),
        _ => None,
    }
}
