use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    opt_str_param, persist, require_role, require_session, require_store, str_param,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{School, Upazila, UserRole};
use serde_json::json;
use uuid::Uuid;

// The upazila directory is readable without a session: the sign-up screen
// offers the existing names for name-based resolution.
fn handle_upazilas_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    ok(&req.id, json!({ "upazilas": store.upazilas }))
}

fn handle_upazilas_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let name = match str_param(req, "name") {
        Ok(v) => v.trim().to_string(),
        Err(resp) => return resp,
    };
    if name.is_empty() {
        return err(&req.id, "validation_failed", "name must not be empty", None);
    }

    // Seeding is idempotent by name, the same resolution rule sign-up uses.
    if let Some(existing) = store.upazila_by_name(&name) {
        let existing = existing.clone();
        return ok(&req.id, json!({ "upazila": existing, "created": false }));
    }

    let upazila = Upazila {
        id: format!("upz-{}", Uuid::new_v4()),
        name,
    };
    store.upazilas.push(upazila.clone());
    if let Err(resp) = persist(store, req) {
        return resp;
    }
    ok(&req.id, json!({ "upazila": upazila, "created": true }))
}

fn handle_schools_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let session = match require_session(store, req) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let filter = opt_str_param(req, "upazilaId");
    let schools: Vec<&School> = match session.role {
        UserRole::Admin => store
            .schools
            .iter()
            .filter(|s| filter.as_deref().map_or(true, |f| s.upazila_id == f))
            .collect(),
        UserRole::Upazila => {
            let own = session.upazila_id.as_deref().unwrap_or_default();
            if let Some(f) = filter.as_deref() {
                if f != own {
                    return err(&req.id, "forbidden", "outside your upazila", None);
                }
            }
            store.schools.iter().filter(|s| s.upazila_id == own).collect()
        }
        UserRole::School => store
            .schools
            .iter()
            .filter(|s| Some(s.id.as_str()) == session.school_id.as_deref())
            .collect(),
    };
    ok(&req.id, json!({ "schools": schools }))
}

fn handle_schools_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let session = match require_session(store, req) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&session, &[UserRole::Admin, UserRole::Upazila], req) {
        return resp;
    }

    let name = match str_param(req, "name") {
        Ok(v) => v.trim().to_string(),
        Err(resp) => return resp,
    };
    if name.is_empty() {
        return err(&req.id, "validation_failed", "name must not be empty", None);
    }
    let ipemis_code = match str_param(req, "ipemisCode") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let upazila_id = match session.role {
        // An upazila office only creates schools inside its own scope.
        UserRole::Upazila => {
            let own = session.upazila_id.clone().unwrap_or_default();
            if let Some(requested) = opt_str_param(req, "upazilaId") {
                if requested != own {
                    return err(&req.id, "forbidden", "outside your upazila", None);
                }
            }
            own
        }
        _ => match str_param(req, "upazilaId") {
            Ok(v) => v,
            Err(resp) => return resp,
        },
    };

    // The foreign key is not enforced strictly: an unknown upazila id heals
    // itself with a synthetic record instead of failing the create.
    if !store.upazilas.iter().any(|u| u.id == upazila_id) {
        store.upazilas.push(Upazila {
            id: upazila_id.clone(),
            name: upazila_id.clone(),
        });
    }

    let school = School {
        id: format!("sch-{}", Uuid::new_v4()),
        name,
        ipemis_code,
        upazila_id,
    };
    store.schools.push(school.clone());
    if let Err(resp) = persist(store, req) {
        return resp;
    }
    ok(&req.id, json!({ "school": school }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "upazilas.list" => Some(handle_upazilas_list(state, req)),
        "upazilas.create" => Some(handle_upazilas_create(state, req)),
        "schools.list" => Some(handle_schools_list(state, req)),
        "schools.create" => Some(handle_schools_create(state, req)),
        _ => None,
    }
}
