use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .env("GRADEBOOKD_LOG", "off")
        .env_remove("GRADEBOOKD_PUBLISH_POLICY")
        .env_remove("GRADEBOOKD_GRADE_SCALE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn read_response(reader: &mut BufReader<ChildStdout>) -> serde_json::Value {
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response");
    serde_json::from_str(line.trim()).expect("parse response json")
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

    let value = read_response(reader);
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], json!(true));
    assert_eq!(health["result"]["gradeScale"], json!("cbse"));
    assert_eq!(health["result"]["publishPolicy"], json!("warn"));

    let scale = request(&mut stdin, &mut reader, "2", "grades.scale", json!({ "scale": "school" }));
    assert_eq!(scale["result"]["bands"].as_array().map(|b| b.len()), Some(8));
    assert_eq!(scale["result"]["passingBand"]["grade"], json!("D"));

    let band = request(&mut stdin, &mut reader, "3", "grades.band", json!({ "percentage": 91 }));
    assert_eq!(band["result"]["band"]["grade"], json!("A1"));
    assert_eq!(band["result"]["band"]["gradePoint"], json!(10.0));

    let agg = request(
        &mut stdin,
        &mut reader,
        "4",
        "scores.aggregate",
        json!({
            "assessments": [
                { "id": "q1", "name": "Quiz 1", "maxMarks": 20 },
                { "id": "a1", "name": "Assignment 1", "maxMarks": 30 },
                { "id": "mid", "name": "Midterm", "maxMarks": 50 },
                { "id": "final", "name": "Final Exam", "maxMarks": 100 }
            ],
            "scores": { "q1": 18, "a1": 28, "mid": 45, "final": 92 }
        }),
    );
    assert_eq!(agg["result"]["summary"]["total"], json!(183.0));
    assert_eq!(agg["result"]["summary"]["maxTotal"], json!(200.0));
    assert_eq!(agg["result"]["percentageDisplay"], json!(91.5));
    assert_eq!(agg["result"]["grade"], json!("A1"));

    let overall = request(
        &mut stdin,
        &mut reader,
        "5",
        "grades.overall",
        json!({ "percentages": [85, 95, 0] }),
    );
    assert_eq!(overall["result"]["overall"]["grade"], json!("A2"));
    assert_eq!(overall["result"]["overall"]["subjectCount"], json!(2));

    let template = request(&mut stdin, &mut reader, "6", "students.importTemplate", json!({}));
    assert!(template["result"]["csv"]
        .as_str()
        .unwrap_or_default()
        .starts_with("firstName,lastName,admissionNo"));

    let list = request(&mut stdin, &mut reader, "7", "students.list", json!({}));
    assert_eq!(list["result"]["students"], json!([]));

    let unknown = request(
        &mut stdin,
        &mut reader,
        "8",
        "gradebook.get",
        json!({ "gradebookId": "nope" }),
    );
    assert_eq!(unknown["error"]["code"], json!("not_found"));

    writeln!(stdin, "{{\"id\":\"9\",\"method\":\"not.a.method\"}}").expect("write");
    stdin.flush().expect("flush");
    let resp = read_response(&mut reader);
    assert_eq!(resp["error"]["code"], json!("not_implemented"));

    writeln!(stdin, "this is not json").expect("write");
    stdin.flush().expect("flush");
    let resp = read_response(&mut reader);
    assert_eq!(resp["error"]["code"], json!("bad_json"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn aggregate_rejects_out_of_range_scores() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "scores.aggregate",
        json!({
            "assessments": [{ "id": "q1", "name": "Quiz 1", "maxMarks": 20 }],
            "scores": { "q1": 21 }
        }),
    );
    assert_eq!(resp["ok"], json!(false));
    assert_eq!(resp["error"]["code"], json!("validation_failed"));
    assert_eq!(resp["error"]["details"]["kind"], json!("out_of_range_score"));

    let missing = request(
        &mut stdin,
        &mut reader,
        "2",
        "scores.aggregate",
        json!({
            "assessments": [{ "id": "q1", "name": "Quiz 1", "maxMarks": 20, "weight": 100 }],
            "scores": { "q1": null }
        }),
    );
    assert_eq!(missing["result"]["summary"]["completedCount"], json!(0));
    assert_eq!(missing["result"]["summary"]["percentage"], json!(0.0));
    assert_eq!(missing["result"]["grade"], json!("E"));

    let typo = request(
        &mut stdin,
        &mut reader,
        "3",
        "scores.aggregate",
        json!({
            "assessments": [{ "id": "q1", "name": "Quiz 1", "maxMarks": 20 }],
            "scores": { "q11": 18 }
        }),
    );
    assert_eq!(typo["error"]["code"], json!("bad_params"));
    assert_eq!(typo["error"]["details"]["assessmentId"], json!("q11"));

    let states = request(
        &mut stdin,
        &mut reader,
        "4",
        "scores.aggregate",
        json!({
            "assessments": [
                { "id": "q1", "name": "Quiz 1", "maxMarks": 20 },
                { "id": "mid", "name": "Midterm", "maxMarks": 50 },
                { "id": "final", "name": "Final Exam", "maxMarks": 100 }
            ],
            "scores": { "q1": 18, "mid": "absent", "final": "exempt" }
        }),
    );
    assert_eq!(states["result"]["summary"]["total"], json!(18.0));
    assert_eq!(states["result"]["summary"]["maxTotal"], json!(70.0));
    assert_eq!(states["result"]["summary"]["expectedCount"], json!(2));

    drop(stdin);
    let _ = child.wait();
}
