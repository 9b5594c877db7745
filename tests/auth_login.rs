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

#[test]
fn login_accepts_email_or_mobile_and_rejects_bad_credentials() {
    let workspace = temp_dir("eduoffice-auth-login");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    ok_result(&request(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    ));

    ok_result(&request(
        &mut stdin,
        &mut reader,
        "1",
        "auth.signUp",
        json!({
            "name": "মোঃ হাফিজুর রহমান",
            "email": "officer@upz.example",
            "mobile": "01711223344",
            "password": "secret-3",
            "confirmPassword": "secret-3",
            "role": "UPAZILA",
            "upazilaName": "সাভার উপজেলা"
        }),
    ));
    ok_result(&request(&mut stdin, &mut reader, "2", "auth.logout", json!({})));

    let current = ok_result(&request(&mut stdin, &mut reader, "3", "auth.current", json!({})));
    assert!(current["user"].is_null());

    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "auth.login",
        json!({ "identifier": "nobody@example", "password": "secret-3" }),
    );
    assert_eq!(error_code(&resp), "auth_unknown_user");

    let resp = request(
        &mut stdin,
        &mut reader,
        "5",
        "auth.login",
        json!({ "identifier": "officer@upz.example", "password": "wrong" }),
    );
    assert_eq!(error_code(&resp), "auth_wrong_password");

    let by_email = ok_result(&request(
        &mut stdin,
        &mut reader,
        "6",
        "auth.login",
        json!({ "identifier": "officer@upz.example", "password": "secret-3" }),
    ));
    assert_eq!(by_email["user"]["role"], "UPAZILA");

    ok_result(&request(&mut stdin, &mut reader, "7", "auth.logout", json!({})));
    let by_mobile = ok_result(&request(
        &mut stdin,
        &mut reader,
        "8",
        "auth.login",
        json!({ "identifier": "01711223344", "password": "secret-3" }),
    ));
    assert_eq!(by_mobile["user"]["email"], "officer@upz.example");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn credentials_never_appear_in_responses() {
    let workspace = temp_dir("eduoffice-auth-sanitized");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    ok_result(&request(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    ));

    let signed_up = ok_result(&request(
        &mut stdin,
        &mut reader,
        "1",
        "auth.signUp",
        json!({
            "name": "প্রধান এডমিন",
            "email": "admin@edu.gov.bd",
            "mobile": "01700000000",
            "password": "Admin12@#",
            "confirmPassword": "Admin12@#",
            "role": "ADMIN"
        }),
    ));
    assert!(signed_up["user"].get("password").is_none());
    assert!(signed_up["user"].get("passwordHash").is_none());

    let listed = ok_result(&request(&mut stdin, &mut reader, "2", "users.list", json!({})));
    for user in listed["users"].as_array().expect("array") {
        assert!(user.get("password").is_none());
        assert!(user.get("passwordHash").is_none());
    }

    // The persisted registry carries only the digest, never the cleartext.
    let raw = std::fs::read_to_string(workspace.join("users.json")).expect("users blob");
    assert!(raw.contains("passwordHash"));
    assert!(!raw.contains("Admin12@#"));

    drop(stdin);
    let _ = child.wait();
}
