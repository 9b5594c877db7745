use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{opt_str_param, persist, require_session, require_store};
use crate::ipc::types::{AppState, Request};
use crate::model::{School, UserRole};
use serde_json::json;

/// Profile edits cascade: an upazila officer's "office name" renames the
/// Upazila record itself (visible to every school under it), and a school
/// user's office fields rewrite or create the School record.
fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let session = match require_session(store, req) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let office_name = opt_str_param(req, "officeName");
    let office_code = opt_str_param(req, "officeCode");
    let new_upazila_id = opt_str_param(req, "upazilaId");

    let Some(user) = store.users.iter_mut().find(|u| u.id == session.id) else {
        return err(&req.id, "not_found", "account no longer exists", None);
    };

    if let Some(name) = opt_str_param(req, "name") {
        user.name = name;
    }
    if let Some(designation) = opt_str_param(req, "designation") {
        user.designation = Some(designation);
    }
    if let Some(mobile) = opt_str_param(req, "mobile") {
        user.mobile = Some(mobile);
    }
    if let Some(division) = opt_str_param(req, "division") {
        user.division = Some(division);
    }
    if let Some(district) = opt_str_param(req, "district") {
        user.district = Some(district);
    }

    match user.role {
        UserRole::Upazila => {
            if let (Some(name), Some(upazila_id)) = (&office_name, user.upazila_id.clone()) {
                if let Some(upazila) = store.upazilas.iter_mut().find(|u| u.id == upazila_id) {
                    upazila.name = name.clone();
                }
            }
        }
        UserRole::School => {
            if let Some(school_id) = user.school_id.clone() {
                if new_upazila_id.is_some() {
                    user.upazila_id = new_upazila_id.clone();
                }
                let fallback_upazila = user.upazila_id.clone().unwrap_or_default();
                match store.schools.iter_mut().find(|s| s.id == school_id) {
                    Some(school) => {
                        if let Some(name) = &office_name {
                            school.name = name.clone();
                        }
                        if let Some(code) = &office_code {
                            school.ipemis_code = code.clone();
                        }
                        if let Some(uid) = &new_upazila_id {
                            school.upazila_id = uid.clone();
                        }
                    }
                    None => {
                        // Inconsistent state from an earlier save; rebuild
                        // the record from whatever was supplied.
                        store.schools.push(School {
                            id: school_id,
                            name: office_name
                                .clone()
                                .unwrap_or_else(|| "নতুন বিদ্যালয়".to_string()),
                            ipemis_code: office_code
                                .clone()
                                .unwrap_or_else(|| "00000000000".to_string()),
                            upazila_id: new_upazila_id.clone().unwrap_or(fallback_upazila),
                        });
                    }
                }
            }
        }
        UserRole::Admin => {}
    }

    let Some(updated) = store.users.iter().find(|u| u.id == session.id).cloned() else {
        return err(&req.id, "not_found", "account no longer exists", None);
    };
    store.session = Some(updated.clone());
    if let Err(resp) = persist(store, req) {
        return resp;
    }
    ok(&req.id, json!({ "user": updated.public_json() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "profile.update" => Some(handle_update(state, req)),
        _ => None,
    }
}
