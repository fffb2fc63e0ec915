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
    let exe = env!("CARGO_BIN_EXE_admissiond");
    let mut child = Command::new(exe)
        .env("ADMISSIOND_INTAKE_YEAR", "2025")
        .env_remove("ADMISSIOND_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn admissiond");
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

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn admission_form(first: &str, faculty: &str, intake_month: &str, shift: &str) -> serde_json::Value {
    json!({
        "personalInformation": {
            "firstName": first,
            "middleName": "",
            "lastName": "Mwangi",
            "dateOfBirth": "2004-05-06",
            "gender": "Female",
            "nationality": "Kenyan",
            "phone": "+254700000000",
            "email": format!("{}@example.com", first.to_lowercase())
        },
        "programmeInformation": {
            "studyLevel": "Degree",
            "faculty": faculty,
            "department": "General",
            "programmeName": "Bachelor of Science",
            "intakeMonth": intake_month,
            "shift": shift
        },
        "scholarship": {
            "hasScholarship": false,
            "fullScholarship": false,
            "halfScholarship": false
        },
        "emergencyContact": {
            "name": "Peter Mwangi",
            "relationship": "Father",
            "phone": "+254711111111"
        },
        "educationBackground": {
            "highSchoolName": "Alliance High",
            "completionYear": "2022"
        }
    })
}

fn write_raw_slot(workspace: &std::path::Path, value: &str) {
    let conn = rusqlite::Connection::open(workspace.join("admissions.sqlite3")).expect("open db");
    conn.execute(
        "CREATE TABLE IF NOT EXISTS slots(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .expect("create slots");
    conn.execute(
        "INSERT OR REPLACE INTO slots(key, value, updated_at) VALUES('submittedStudents', ?, '')",
        [value],
    )
    .expect("write slot");
}

fn read_raw_slot(workspace: &std::path::Path, key: &str) -> Option<String> {
    let conn = rusqlite::Connection::open(workspace.join("admissions.sqlite3")).expect("open db");
    conn.query_row("SELECT value FROM slots WHERE key = ?", [key], |r| r.get(0))
        .ok()
}

#[test]
fn corrupt_slot_loads_empty_and_recovers_on_next_submit() {
    let workspace = temp_dir("admissiond-corrupt");
    write_raw_slot(&workspace, "[{\"personalInformation\": ");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["recordCount"], json!(0));
    assert_eq!(selected["loadStatus"], json!("corrupt"));

    let listed = request_ok(&mut stdin, &mut reader, "2", "admissions.list", json!({}));
    assert_eq!(listed["records"], json!([]));

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "admissions.submit",
        admission_form("Otieno", "SOCIAL SCIENCE", "September", "Morning"),
    );
    assert_eq!(res["studentId"], json!("SS/25/M/01"));

    drop(stdin);
    let _ = child.wait();

    assert_eq!(
        read_raw_slot(&workspace, "submittedStudents.corrupt").as_deref(),
        Some("[{\"personalInformation\": ")
    );
    let stored = read_raw_slot(&workspace, "submittedStudents").expect("records slot");
    let parsed: serde_json::Value = serde_json::from_str(&stored).expect("valid json");
    assert_eq!(parsed.as_array().map(|a| a.len()), Some(1));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn legacy_browser_export_loads_and_seeds_counters() {
    let workspace = temp_dir("admissiond-legacy");
    let mut legacy = admission_form("Wanjiru", "COMPUTING & INFORMATION TECHNOLOGY", "September", "Morning");
    legacy["programmeInformation"]["intakeYear"] = json!(2025);
    legacy["studentID"] = json!("CIT/25/M/07");
    write_raw_slot(&workspace, &json!([legacy]).to_string());

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["recordCount"], json!(1));

    let listed = request_ok(&mut stdin, &mut reader, "2", "admissions.list", json!({}));
    let first = &listed["records"][0];
    assert!(first["recordId"].as_str().is_some());
    assert_eq!(first["educationBackground"]["completionYear"], json!(2022));

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "admissions.submit",
        admission_form("Zawadi", "COMPUTING & INFORMATION TECHNOLOGY", "September", "Morning"),
    );
    assert_eq!(res["studentId"], json!("CIT/25/M/08"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn duplicated_legacy_student_id_is_not_deleted_by_id() {
    let workspace = temp_dir("admissiond-duplicate-id");
    let mut first = admission_form("First", "COMPUTING & INFORMATION TECHNOLOGY", "September", "Morning");
    first["programmeInformation"]["intakeYear"] = json!(2025);
    first["studentID"] = json!("CIT/25/M/01");
    let mut second = first.clone();
    second["personalInformation"]["firstName"] = json!("Second");
    write_raw_slot(&workspace, &json!([first, second]).to_string());

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "2", "admissions.list", json!({}));
    let record_ids: Vec<serde_json::Value> = listed["records"]
        .as_array()
        .expect("records")
        .iter()
        .map(|r| r["recordId"].clone())
        .collect();
    assert_eq!(record_ids.len(), 2);

    let res = request(
        &mut stdin,
        &mut reader,
        "3",
        "admissions.delete",
        json!({ "studentId": "CIT/25/M/01" }),
    );
    assert_eq!(error_code(&res), Some("ambiguous"));
    assert_eq!(res["error"]["details"]["recordIds"], json!(record_ids));

    let after = request_ok(&mut stdin, &mut reader, "4", "admissions.list", json!({}));
    assert_eq!(after["records"], listed["records"]);

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "admissions.delete",
        json!({ "recordId": record_ids[1] }),
    );
    assert_eq!(deleted["deleted"]["personalInformation"]["firstName"], json!("Second"));
    assert_eq!(deleted["remaining"], json!(1));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn exhausted_counter_fails_submit_without_killing_the_sidecar() {
    let workspace = temp_dir("admissiond-exhausted");
    let mut legacy = admission_form("Max", "COMPUTING & INFORMATION TECHNOLOGY", "September", "Morning");
    legacy["programmeInformation"]["intakeYear"] = json!(2025);
    legacy["studentID"] = json!("CIT/25/M/4294967295");
    write_raw_slot(&workspace, &json!([legacy]).to_string());

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let res = request(
        &mut stdin,
        &mut reader,
        "2",
        "admissions.submit",
        admission_form("Next", "COMPUTING & INFORMATION TECHNOLOGY", "September", "Morning"),
    );
    assert_eq!(error_code(&res), Some("ids_exhausted"));

    let other = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "admissions.submit",
        admission_form("Eve", "COMPUTING & INFORMATION TECHNOLOGY", "September", "Evening"),
    );
    assert_eq!(other["studentId"], json!("CIT/25/E/01"));

    let listed = request_ok(&mut stdin, &mut reader, "4", "admissions.list", json!({}));
    assert_eq!(listed["records"].as_array().map(|a| a.len()), Some(2));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
