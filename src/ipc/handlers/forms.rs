use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    now, opt_str_param, persist, require_role, require_session, require_store, str_param,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{Form, FormField, User, UserRole};
use serde_json::json;
use uuid::Uuid;

fn parse_fields(req: &Request) -> Result<Vec<FormField>, serde_json::Value> {
    let Some(raw) = req.params.get("fields") else {
        return Err(err(&req.id, "bad_params", "missing fields", None));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| err(&req.id, "bad_params", format!("bad fields: {e}"), None))
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let title = opt_str_param(req, "title").unwrap_or_default();
    let fields = match parse_fields(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    if title.is_empty() || fields.is_empty() {
        return err(
            &req.id,
            "validation_failed",
            "a title and at least one field are required",
            None,
        );
    }

    let form = Form {
        id: format!("f-{}", Uuid::new_v4()),
        title,
        description: opt_str_param(req, "description").unwrap_or_default(),
        fields,
        is_active: req
            .params
            .get("isActive")
            .and_then(|v| v.as_bool())
            .unwrap_or(true),
        created_at: now(),
        deadline: opt_str_param(req, "deadline"),
        // Admin forms are global; an upazila office's form is scoped to it.
        upazila_id: match session.role {
            UserRole::Upazila => session.upazila_id.clone(),
            _ => None,
        },
    };

    store.forms.insert(0, form.clone());
    if let Err(resp) = persist(store, req) {
        return resp;
    }
    ok(&req.id, json!({ "form": form }))
}

fn may_manage(user: &User, form: &Form) -> bool {
    match user.role {
        UserRole::Admin => true,
        UserRole::Upazila => form.upazila_id == user.upazila_id && form.upazila_id.is_some(),
        UserRole::School => false,
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let fields = match req.params.get("fields") {
        Some(_) => match parse_fields(req) {
            Ok(f) => Some(f),
            Err(resp) => return resp,
        },
        None => None,
    };
    if let Some(fields) = &fields {
        if fields.is_empty() {
            return err(
                &req.id,
                "validation_failed",
                "a form keeps at least one field",
                None,
            );
        }
    }

    let title = opt_str_param(req, "title");
    let description = opt_str_param(req, "description");
    let deadline = opt_str_param(req, "deadline");
    let is_active = req.params.get("isActive").and_then(|v| v.as_bool());

    let Some(form) = store.forms.iter_mut().find(|f| f.id == form_id) else {
        return err(&req.id, "not_found", "form not found", None);
    };
    if !may_manage(&session, form) {
        return err(&req.id, "forbidden", "not your form", None);
    }

    if let Some(title) = title {
        if title.is_empty() {
            return err(&req.id, "validation_failed", "title must not be empty", None);
        }
        form.title = title;
    }
    if let Some(description) = description {
        form.description = description;
    }
    if let Some(fields) = fields {
        form.fields = fields;
    }
    if let Some(active) = is_active {
        form.is_active = active;
    }
    if let Some(deadline) = deadline {
        form.deadline = if deadline.is_empty() { None } else { Some(deadline) };
    }

    let form = form.clone();
    if let Err(resp) = persist(store, req) {
        return resp;
    }
    ok(&req.id, json!({ "form": form }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let Some(form) = store.form(&form_id) else {
        return err(&req.id, "not_found", "form not found", None);
    };
    if !may_manage(&session, form) {
        return err(&req.id, "forbidden", "not your form", None);
    }

    // Hard delete. Submissions for the form stay behind, orphaned.
    store.forms.retain(|f| f.id != form_id);
    if let Err(resp) = persist(store, req) {
        return resp;
    }
    ok(&req.id, json!({ "deleted": true }))
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

    let view = opt_str_param(req, "view").unwrap_or_else(|| {
        match session.role {
            UserRole::School => "fillable",
            UserRole::Upazila => "monitorable",
            UserRole::Admin => "all",
        }
        .to_string()
    });

    match (view.as_str(), session.role) {
        ("fillable", UserRole::School) => {
            let school_id = session.school_id.as_deref().unwrap_or_default();
            let forms: Vec<serde_json::Value> = store
                .forms
                .iter()
                .filter(|f| {
                    f.is_active
                        && (f.upazila_id.is_none() || f.upazila_id == session.upazila_id)
                })
                .map(|f| {
                    // NOT_STARTED is a derived display value, never stored.
                    let status = store
                        .submission_for(&f.id, school_id)
                        .map(|s| s.status.as_str())
                        .unwrap_or("NOT_STARTED");
                    json!({ "form": f, "submissionStatus": status })
                })
                .collect();
            ok(&req.id, json!({ "forms": forms }))
        }
        ("monitorable", UserRole::Upazila) => {
            let forms: Vec<&Form> = store
                .forms
                .iter()
                .filter(|f| f.upazila_id.is_none() || f.upazila_id == session.upazila_id)
                .collect();
            ok(&req.id, json!({ "forms": forms }))
        }
        ("own", UserRole::Upazila) => {
            let forms: Vec<&Form> = store
                .forms
                .iter()
                .filter(|f| f.upazila_id.is_some() && f.upazila_id == session.upazila_id)
                .collect();
            ok(&req.id, json!({ "forms": forms }))
        }
        ("all", UserRole::Admin) => ok(&req.id, json!({ "forms": store.forms })),
        _ => err(
            &req.id,
            "forbidden",
            format!("view '{}' is not available to role {}", view, session.role.as_str()),
            None,
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "forms.create" => Some(handle_create(state, req)),
        "forms.update" => Some(handle_update(state, req)),
        "forms.delete" => Some(handle_delete(state, req)),
        "forms.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
