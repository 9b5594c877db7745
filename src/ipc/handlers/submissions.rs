use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    now, opt_str_param, persist, require_role, require_session, require_store, str_param,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Submission, SubmissionStatus, UserRole};
use crate::schema;
use serde_json::json;
use uuid::Uuid;

/// Opens a form for editing from the school side. A LOCKED record is
/// rejected outright with no state change; otherwise the stored data comes
/// back with every table field reconciled for the editor.
fn handle_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let session = match require_session(store, req) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_role(&session, &[UserRole::School], req) {
        return resp;
    }
    let form_id = match str_param(req, "formId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(school_id) = session.school_id.clone() else {
        return err(&req.id, "bad_params", "account has no school", None);
    };

    let Some(form) = store.form(&form_id) else {
        return err(&req.id, "not_found", "form not found", None);
    };
    if !form.is_active || (form.upazila_id.is_some() && form.upazila_id != session.upazila_id) {
        return err(&req.id, "forbidden", "form is not available to this school", None);
    }

    let existing = store.submission_for(&form_id, &school_id);
    if let Some(sub) = existing {
        if sub.status == SubmissionStatus::Locked {
            return err(
                &req.id,
                "locked",
                "this form has been locked by the upazila office",
                None,
            );
        }
    }

    let mut data = existing.map(|s| s.data.clone()).unwrap_or_default();
    let status = existing.map(|s| s.status.as_str()).unwrap_or("NOT_STARTED");
    let submission_id = existing.map(|s| s.id.clone());
    schema::reconcile_tables(form, &mut data);

    ok(
        &req.id,
        json!({
            "data": data,
            "status": status,
            "submissionId": submission_id,
        }),
    )
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let session = match require_session(store, req) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let form_id = match str_param(req, "formId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let status_str = match str_param(req, "status") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status = match SubmissionStatus::parse(&status_str) {
        // A school save lands as a draft or a final submission; locking and
        // approval travel through submissions.updateStatus.
        Some(s @ (SubmissionStatus::Pending | SubmissionStatus::Submitted)) => s,
        _ => return err(&req.id, "bad_params", format!("bad status: {status_str}"), None),
    };

    let school_id = match session.role {
        UserRole::School => {
            let Some(own) = session.school_id.clone() else {
                return err(&req.id, "bad_params", "account has no school", None);
            };
            if let Some(requested) = opt_str_param(req, "schoolId") {
                if requested != own {
                    return err(&req.id, "forbidden", "not your school", None);
                }
            }
            own
        }
        UserRole::Upazila | UserRole::Admin => {
            let requested = match str_param(req, "schoolId") {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            if session.role == UserRole::Upazila {
                let in_scope = store
                    .school(&requested)
                    .map(|s| Some(s.upazila_id.as_str()) == session.upazila_id.as_deref())
                    .unwrap_or(false);
                if !in_scope {
                    return err(&req.id, "forbidden", "school is outside your upazila", None);
                }
            }
            requested
        }
    };

    let Some(data) = req.params.get("data").and_then(|v| v.as_object()).cloned() else {
        return err(&req.id, "bad_params", "missing data object", None);
    };

    let Some(form) = store.form(&form_id) else {
        return err(&req.id, "not_found", "form not found", None);
    };
    // Saving obeys the same visibility rule as opening: a school only ever
    // writes against an active form that is global or in its own upazila.
    if session.role == UserRole::School
        && (!form.is_active || (form.upazila_id.is_some() && form.upazila_id != session.upazila_id))
    {
        return err(&req.id, "forbidden", "form is not available to this school", None);
    }
    if let Err(msg) = schema::validate_submission_data(form, &data) {
        return err(&req.id, "validation_failed", msg, None);
    }

    // Locked records are frozen; the save is a store-level no-op.
    if let Some(existing) = store.submission_for(&form_id, &school_id) {
        if existing.status == SubmissionStatus::Locked {
            return err(
                &req.id,
                "locked",
                "this form has been locked by the upazila office",
                None,
            );
        }
    }

    let stamp = now();
    let existing_idx = store
        .submissions
        .iter()
        .position(|s| s.form_id == form_id && s.school_id == school_id);
    let saved = match existing_idx {
        Some(idx) => {
            let existing = &mut store.submissions[idx];
            existing.data = data;
            existing.status = status;
            existing.submitted_at = stamp.clone();
            existing.updated_at = stamp;
            existing.clone()
        }
        None => {
            let submission = Submission {
                id: format!("sub-{}", Uuid::new_v4()),
                form_id,
                school_id,
                data,
                status,
                submitted_at: stamp.clone(),
                updated_at: stamp,
            };
            store.submissions.push(submission.clone());
            submission
        }
    };

    if let Err(resp) = persist(store, req) {
        return resp;
    }
    ok(&req.id, json!({ "submission": saved }))
}

/// The office-side status flip: lock, unlock, and (through the same generic
/// entry point) the APPROVED value. Data is never touched here.
fn handle_update_status(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let submission_id = match str_param(req, "submissionId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status_str = match str_param(req, "status") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(status) = SubmissionStatus::parse(&status_str) else {
        return err(&req.id, "bad_params", format!("bad status: {status_str}"), None);
    };

    if session.role == UserRole::Upazila {
        let in_scope = store
            .submissions
            .iter()
            .find(|s| s.id == submission_id)
            .and_then(|s| store.school(&s.school_id))
            .map(|sch| Some(sch.upazila_id.as_str()) == session.upazila_id.as_deref())
            .unwrap_or(false);
        if !in_scope {
            return err(&req.id, "forbidden", "school is outside your upazila", None);
        }
    }

    let Some(submission) = store.submissions.iter_mut().find(|s| s.id == submission_id)
    else {
        return err(&req.id, "not_found", "submission not found", None);
    };
    submission.status = status;
    submission.updated_at = now();
    let submission = submission.clone();

    if let Err(resp) = persist(store, req) {
        return resp;
    }
    ok(&req.id, json!({ "submission": submission }))
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match require_store(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let session = match require_session(store, req) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let form_filter = opt_str_param(req, "formId");
    let school_filter = opt_str_param(req, "schoolId");

    let submissions: Vec<&Submission> = store
        .submissions
        .iter()
        .filter(|s| form_filter.as_deref().map_or(true, |f| s.form_id == f))
        .filter(|s| school_filter.as_deref().map_or(true, |f| s.school_id == f))
        .filter(|s| match session.role {
            UserRole::Admin => true,
            UserRole::Upazila => store
                .school(&s.school_id)
                .map(|sch| Some(sch.upazila_id.as_str()) == session.upazila_id.as_deref())
                .unwrap_or(false),
            UserRole::School => Some(s.school_id.as_str()) == session.school_id.as_deref(),
        })
        .collect();
    ok(&req.id, json!({ "submissions": submissions }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "submissions.open" => Some(handle_open(state, req)),
        "submissions.save" => Some(handle_save(state, req)),
        "submissions.updateStatus" => Some(handle_update_status(state, req)),
        "submissions.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
