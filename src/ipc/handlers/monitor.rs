use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_role, require_session, require_store, str_param};
use crate::ipc::types::{AppState, Request};
use crate::model::{School, Submission, UserRole};
use serde_json::json;

fn upazila_schools<'a>(
    schools: &'a [School],
    upazila_id: Option<&str>,
) -> Vec<&'a School> {
    schools
        .iter()
        .filter(|s| Some(s.upazila_id.as_str()) == upazila_id)
        .collect()
}

/// Completion statistics for one form over the office's schools. NOT_STARTED
/// is derived: schools with no record at all.
fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let session = match require_session(store, req) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&session, &[UserRole::Upazila], req) {
        return resp;
    }
    let form_id = match str_param(req, "formId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let schools = upazila_schools(&store.schools, session.upazila_id.as_deref());
    let total = schools.len();
    let in_scope = |s: &&Submission| {
        s.form_id == form_id && schools.iter().any(|sch| sch.id == s.school_id)
    };
    let submitted = store
        .submissions
        .iter()
        .filter(in_scope)
        .filter(|s| s.status.counts_as_submitted())
        .count();
    let pending = store
        .submissions
        .iter()
        .filter(in_scope)
        .filter(|s| !s.status.counts_as_submitted())
        .count();

    ok(
        &req.id,
        json!({
            "total": total,
            "submitted": submitted,
            "pending": pending,
            "notStarted": total.saturating_sub(submitted + pending),
        }),
    )
}

/// One row per school in the office's scope, with the derived display
/// status for the selected form.
fn handle_school_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let session = match require_session(store, req) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&session, &[UserRole::Upazila], req) {
        return resp;
    }
    let form_id = match str_param(req, "formId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let rows: Vec<serde_json::Value> = upazila_schools(&store.schools, session.upazila_id.as_deref())
        .into_iter()
        .map(|school| {
            let sub = store.submission_for(&form_id, &school.id);
            json!({
                "school": school,
                "status": sub.map(|s| s.status.as_str()).unwrap_or("NOT_STARTED"),
                "submissionId": sub.map(|s| s.id.clone()),
                "updatedAt": sub.map(|s| s.updated_at.clone()),
            })
        })
        .collect();
    ok(&req.id, json!({ "rows": rows }))
}

/// Every submission a school has ever made, newest update first, with the
/// form title joined in for display.
fn handle_school_history(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let school_id = match str_param(req, "schoolId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if session.role == UserRole::Upazila {
        let in_scope = store
            .school(&school_id)
            .map(|s| Some(s.upazila_id.as_str()) == session.upazila_id.as_deref())
            .unwrap_or(false);
        if !in_scope {
            return err(&req.id, "forbidden", "school is outside your upazila", None);
        }
    }

    let mut history: Vec<&Submission> = store
        .submissions
        .iter()
        .filter(|s| s.school_id == school_id)
        .collect();
    history.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    let entries: Vec<serde_json::Value> = history
        .into_iter()
        .map(|s| {
            json!({
                "submission": s,
                "formTitle": store.form(&s.form_id).map(|f| f.title.clone()),
            })
        })
        .collect();
    ok(&req.id, json!({ "history": entries }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "monitor.summary" => Some(handle_summary(state, req)),
        "monitor.schoolStatus" => Some(handle_school_status(state, req)),
        "monitor.schoolHistory" => Some(handle_school_history(state, req)),
        _ => None,
    }
}
