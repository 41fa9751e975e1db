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
    let exe = env!("CARGO_BIN_EXE_schoold");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn schoold");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
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
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn export_reflects_store_before_and_after_delete() {
    let workspace = temp_dir("schoold-export");
    let before_path = workspace.join("before.csv");
    let after_path = workspace.join("after.csv");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "id": "1", "name": "A", "email": "a@x.com" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "courses.create",
        json!({ "id": "10", "name": "Math" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "registration.enroll",
        json!({ "studentId": "1", "courseId": "10" }),
    );

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "data.exportCsv",
        json!({ "path": before_path.to_string_lossy() }),
    );
    assert_eq!(summary.get("studentRows").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(summary.get("courseRows").and_then(|v| v.as_u64()), Some(1));

    let before = std::fs::read_to_string(&before_path).expect("read before.csv");
    assert!(before.contains("[students]\nid,name,email,age,registered_course_ids\n"));
    assert!(before.contains("1,A,a@x.com,,10\n"));
    assert!(before.contains("10,Math,,1\n"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.delete",
        json!({ "studentId": "1" }),
    );
    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "data.exportCsv",
        json!({ "path": after_path.to_string_lossy() }),
    );
    assert_eq!(summary.get("studentRows").and_then(|v| v.as_u64()), Some(0));

    let after = std::fs::read_to_string(&after_path).expect("read after.csv");
    assert!(!after.contains("a@x.com"));
    // The course survives, now with an empty enrollment column.
    assert!(after.contains("10,Math,,\n"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn export_quotes_names_containing_commas() {
    let workspace = temp_dir("schoold-export-quote");
    let csv_path = workspace.join("out.csv");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "instructors.create",
        json!({ "id": "i1", "name": "Hopper, Grace", "email": "grace@x.com" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "data.exportCsv",
        json!({ "path": csv_path.to_string_lossy() }),
    );

    let text = std::fs::read_to_string(&csv_path).expect("read csv");
    assert!(text.contains("i1,\"Hopper, Grace\",grace@x.com,,\n"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn search_spans_all_record_types() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "id": "s1", "name": "Mathilda", "email": "m@x.com" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "courses.create",
        json!({ "id": "c1", "name": "Mathematics" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "instructors.create",
        json!({ "id": "i1", "name": "Ms. Math", "email": "msm@x.com" }),
    );

    let hits = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "records.search",
        json!({ "query": "math" }),
    );
    let hits = hits.get("hits").and_then(|v| v.as_array()).cloned().expect("hits");
    assert_eq!(hits.len(), 3);
    let kinds: Vec<&str> = hits
        .iter()
        .filter_map(|h| h.get("kind").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(kinds, ["student", "instructor", "course"]);

    drop(stdin);
    let _ = child.wait();
}
