use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_eduofficed");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn eduofficed");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn ok_result(resp: &serde_json::Value) -> serde_json::Value {
    assert_eq!(
        resp.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "expected ok response: {resp}"
    );
    resp.get("result").cloned().expect("result")
}

fn error_code(resp: &serde_json::Value) -> String {
    assert_eq!(
        resp.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "expected error response: {resp}"
    );
    resp["error"]["code"].as_str().unwrap_or("").to_string()
}

fn sign_up(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    extra: serde_json::Value,
) -> serde_json::Value {
    let mut params = json!({
        "password": "123",
        "confirmPassword": "123",
    });
    if let (Some(base), Some(more)) = (params.as_object_mut(), extra.as_object()) {
        for (k, v) in more {
            base.insert(k.clone(), v.clone());
        }
    }
    ok_result(&request(stdin, reader, id, "auth.signUp", params))
}

fn create_form(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    title: &str,
    is_active: bool,
) -> String {
    let created = ok_result(&request(
        stdin,
        reader,
        id,
        "forms.create",
        json!({
            "title": title,
            "isActive": is_active,
            "fields": [
                { "id": "fd-1", "label": "মন্তব্য", "type": "TEXT", "required": false }
            ]
        }),
    ));
    created["form"]["id"].as_str().expect("form id").to_string()
}

fn titles_of(forms: &serde_json::Value, key: &str) -> Vec<String> {
    forms["forms"]
        .as_array()
        .expect("forms array")
        .iter()
        .map(|f| {
            f.pointer(key)
                .and_then(|v| v.as_str())
                .expect("title")
                .to_string()
        })
        .collect()
}

#[test]
fn each_role_sees_exactly_its_slice_of_the_form_catalog() {
    let workspace = temp_dir("eduoffice-form-visibility");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    ok_result(&request(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    ));

    // Admin: one live global form, one switched off.
    sign_up(
        &mut stdin,
        &mut reader,
        "1",
        json!({ "name": "Admin", "email": "admin@example.com", "mobile": "01700000000", "role": "ADMIN" }),
    );
    create_form(&mut stdin, &mut reader, "2", "জাতীয় জরিপ", true);
    create_form(&mut stdin, &mut reader, "3", "পুরাতন জরিপ", false);
    ok_result(&request(&mut stdin, &mut reader, "4", "auth.logout", json!({})));

    // Two upazila offices, each with its own scoped form.
    sign_up(
        &mut stdin,
        &mut reader,
        "5",
        json!({
            "name": "Officer A", "email": "a@upz.example", "mobile": "01711111111",
            "role": "UPAZILA", "upazilaName": "সাভার উপজেলা"
        }),
    );
    create_form(&mut stdin, &mut reader, "6", "সাভার মাসিক ছক", true);
    ok_result(&request(&mut stdin, &mut reader, "7", "auth.logout", json!({})));

    sign_up(
        &mut stdin,
        &mut reader,
        "8",
        json!({
            "name": "Officer B", "email": "b@upz.example", "mobile": "01722222222",
            "role": "UPAZILA", "upazilaName": "ধামরাই উপজেলা"
        }),
    );
    create_form(&mut stdin, &mut reader, "9", "ধামরাই মাসিক ছক", true);
    ok_result(&request(&mut stdin, &mut reader, "10", "auth.logout", json!({})));

    // A school in সাভার sees the live global form and its own upazila's
    // form, never the other office's or the inactive one.
    sign_up(
        &mut stdin,
        &mut reader,
        "11",
        json!({
            "name": "Head", "email": "head@school.example", "mobile": "01911556677",
            "role": "SCHOOL", "upazilaName": "সাভার উপজেলা", "ipemisCode": "91104020101"
        }),
    );
    let fillable = ok_result(&request(
        &mut stdin,
        &mut reader,
        "12",
        "forms.list",
        json!({ "view": "fillable" }),
    ));
    let mut titles = titles_of(&fillable, "/form/title");
    titles.sort();
    assert_eq!(titles, vec!["জাতীয় জরিপ", "সাভার মাসিক ছক"]);
    for entry in fillable["forms"].as_array().expect("forms") {
        assert_eq!(entry["submissionStatus"], "NOT_STARTED");
    }
    // No management view for a school account.
    let resp = request(&mut stdin, &mut reader, "13", "forms.list", json!({ "view": "all" }));
    assert_eq!(error_code(&resp), "forbidden");
    ok_result(&request(&mut stdin, &mut reader, "14", "auth.logout", json!({})));

    // Officer A monitors the globals plus their own form, and "own" narrows
    // to the form they authored.
    ok_result(&request(
        &mut stdin,
        &mut reader,
        "15",
        "auth.login",
        json!({ "identifier": "a@upz.example", "password": "123" }),
    ));
    let monitorable = ok_result(&request(
        &mut stdin,
        &mut reader,
        "16",
        "forms.list",
        json!({ "view": "monitorable" }),
    ));
    let mut titles = titles_of(&monitorable, "/title");
    titles.sort();
    assert_eq!(titles, vec!["জাতীয় জরিপ", "পুরাতন জরিপ", "সাভার মাসিক ছক"]);
    let own = ok_result(&request(
        &mut stdin,
        &mut reader,
        "17",
        "forms.list",
        json!({ "view": "own" }),
    ));
    assert_eq!(titles_of(&own, "/title"), vec!["সাভার মাসিক ছক"]);
    ok_result(&request(&mut stdin, &mut reader, "18", "auth.logout", json!({})));

    // The admin catalog holds everything.
    ok_result(&request(
        &mut stdin,
        &mut reader,
        "19",
        "auth.login",
        json!({ "identifier": "admin@example.com", "password": "123" }),
    ));
    let all = ok_result(&request(&mut stdin, &mut reader, "20", "forms.list", json!({})));
    assert_eq!(all["forms"].as_array().expect("forms").len(), 4);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn deactivating_a_form_hides_it_from_schools_but_not_from_the_office() {
    let workspace = temp_dir("eduoffice-form-toggle");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    ok_result(&request(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    ));

    sign_up(
        &mut stdin,
        &mut reader,
        "1",
        json!({
            "name": "Officer", "email": "officer@upz.example", "mobile": "01711223344",
            "role": "UPAZILA", "upazilaName": "সাভার উপজেলা"
        }),
    );
    let form_id = create_form(&mut stdin, &mut reader, "2", "মাসিক ছক", true);
    ok_result(&request(&mut stdin, &mut reader, "3", "auth.logout", json!({})));

    sign_up(
        &mut stdin,
        &mut reader,
        "4",
        json!({
            "name": "Head", "email": "head@school.example", "mobile": "01911556677",
            "role": "SCHOOL", "upazilaName": "সাভার উপজেলা", "ipemisCode": "91104020101"
        }),
    );
    let fillable = ok_result(&request(&mut stdin, &mut reader, "5", "forms.list", json!({})));
    assert_eq!(fillable["forms"].as_array().expect("forms").len(), 1);
    ok_result(&request(&mut stdin, &mut reader, "6", "auth.logout", json!({})));

    ok_result(&request(
        &mut stdin,
        &mut reader,
        "7",
        "auth.login",
        json!({ "identifier": "officer@upz.example", "password": "123" }),
    ));
    ok_result(&request(
        &mut stdin,
        &mut reader,
        "8",
        "forms.update",
        json!({ "formId": form_id, "isActive": false }),
    ));
    // Still on the office's monitoring list.
    let monitorable = ok_result(&request(
        &mut stdin,
        &mut reader,
        "9",
        "forms.list",
        json!({ "view": "monitorable" }),
    ));
    assert_eq!(monitorable["forms"].as_array().expect("forms").len(), 1);
    ok_result(&request(&mut stdin, &mut reader, "10", "auth.logout", json!({})));

    // Gone from the school's list, and opening it is refused.
    ok_result(&request(
        &mut stdin,
        &mut reader,
        "11",
        "auth.login",
        json!({ "identifier": "head@school.example", "password": "123" }),
    ));
    let fillable = ok_result(&request(&mut stdin, &mut reader, "12", "forms.list", json!({})));
    assert_eq!(fillable["forms"].as_array().expect("forms").len(), 0);
    let resp = request(
        &mut stdin,
        &mut reader,
        "13",
        "submissions.open",
        json!({ "formId": form_id }),
    );
    assert_eq!(error_code(&resp), "forbidden");
    // Writing is barred the same way reading is.
    let resp = request(
        &mut stdin,
        &mut reader,
        "14",
        "submissions.save",
        json!({
            "formId": form_id,
            "status": "SUBMITTED",
            "data": { "fd-1": "দেরিতে" }
        }),
    );
    assert_eq!(error_code(&resp), "forbidden");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn a_school_cannot_save_into_another_upazilas_form() {
    let workspace = temp_dir("eduoffice-form-foreign-save");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    ok_result(&request(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    ));

    sign_up(
        &mut stdin,
        &mut reader,
        "1",
        json!({
            "name": "Officer B", "email": "b@upz.example", "mobile": "01722222222",
            "role": "UPAZILA", "upazilaName": "ধামরাই উপজেলা"
        }),
    );
    let form_id = create_form(&mut stdin, &mut reader, "2", "ধামরাই মাসিক ছক", true);
    ok_result(&request(&mut stdin, &mut reader, "3", "auth.logout", json!({})));

    // A school under a different upazila can neither open nor save it.
    sign_up(
        &mut stdin,
        &mut reader,
        "4",
        json!({
            "name": "Head", "email": "head@school.example", "mobile": "01911556677",
            "role": "SCHOOL", "upazilaName": "সাভার উপজেলা", "ipemisCode": "91104020101"
        }),
    );
    let resp = request(
        &mut stdin,
        &mut reader,
        "5",
        "submissions.open",
        json!({ "formId": form_id }),
    );
    assert_eq!(error_code(&resp), "forbidden");
    let resp = request(
        &mut stdin,
        &mut reader,
        "6",
        "submissions.save",
        json!({
            "formId": form_id,
            "status": "SUBMITTED",
            "data": { "fd-1": "অনুপ্রবেশ" }
        }),
    );
    assert_eq!(error_code(&resp), "forbidden");
    ok_result(&request(&mut stdin, &mut reader, "7", "auth.logout", json!({})));

    // Nothing leaked into the foreign office's monitoring.
    ok_result(&request(
        &mut stdin,
        &mut reader,
        "8",
        "auth.login",
        json!({ "identifier": "b@upz.example", "password": "123" }),
    ));
    let stats = ok_result(&request(
        &mut stdin,
        &mut reader,
        "9",
        "monitor.summary",
        json!({ "formId": form_id }),
    ));
    assert_eq!(stats["submitted"], 0);
    assert_eq!(stats["pending"], 0);
    let listed = ok_result(&request(
        &mut stdin,
        &mut reader,
        "10",
        "submissions.list",
        json!({ "formId": form_id }),
    ));
    assert!(listed["submissions"].as_array().expect("list").is_empty());

    drop(stdin);
    let _ = child.wait();
}
