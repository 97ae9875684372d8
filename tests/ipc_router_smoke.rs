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
    let exe = env!("CARGO_BIN_EXE_rosterd");
    let mut child = Command::new(exe)
        .env_remove("ROSTERD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rosterd");
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

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

const WORKSPACE_METHODS: [&str; 13] = [
    "catalog.get",
    "catalog.import",
    "codes.preview",
    "codes.classOptions",
    "students.list",
    "students.get",
    "students.query",
    "students.create",
    "students.update",
    "students.bulkDelete",
    "students.seedDemo",
    "setup.get",
    "setup.update",
];

#[test]
fn methods_need_a_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let health = request_ok(&mut stdin, &mut reader, "h", "health", json!({}));
    assert!(health["workspacePath"].is_null());
    assert!(health["version"].is_string());

    for (i, method) in WORKSPACE_METHODS.iter().enumerate() {
        let resp = request(&mut stdin, &mut reader, &i.to_string(), method, json!({}));
        assert_eq!(error_code(&resp), "no_workspace", "{}", method);
    }
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("rosterd-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let health = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    assert!(health["workspacePath"].is_string());

    for (i, method) in WORKSPACE_METHODS.iter().enumerate() {
        let resp = request(&mut stdin, &mut reader, &format!("m{}", i), method, json!({}));
        assert_ne!(error_code(&resp), "not_implemented", "{}", method);
        assert_ne!(error_code(&resp), "no_workspace", "{}", method);
    }

    let unknown = request(&mut stdin, &mut reader, "3", "grades.list", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    let missing_path = request(&mut stdin, &mut reader, "4", "workspace.select", json!({}));
    assert_eq!(error_code(&missing_path), "bad_params");

    // Garbage lines get a bad_json reply and the loop keeps going.
    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush garbage");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json reply");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse bad_json reply");
    assert_eq!(error_code(&value), "bad_json");

    let _ = request_ok(&mut stdin, &mut reader, "5", "health", json!({}));

    drop(stdin);
    let status = child.wait().expect("wait for sidecar");
    assert!(status.success());
}
