use serde_json::json;

use crate::import::{
    into_student_records, student_import_instructions, student_template_csv, validate_students,
    ImportReport, ImportTable, STUDENT_OPTIONAL_COLUMNS, STUDENT_REQUIRED_COLUMNS,
};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::str_param;
use crate::ipc::types::{AppState, Request};

fn preview(state: &AppState, text: &str) -> ImportReport {
    match ImportTable::parse_csv(text) {
        Ok(table) => validate_students(&table, &state.admission_numbers()),
        Err(e) => ImportReport {
            valid_rows: Vec::new(),
            errors: vec![e],
        },
    }
}

fn report_json(report: &ImportReport) -> serde_json::Value {
    let issues: Vec<serde_json::Value> = report
        .errors
        .iter()
        .map(|e| {
            json!({
                "row": e.row(),
                "code": e.code(),
                "message": e.to_string(),
            })
        })
        .collect();
    json!({
        "validRows": report.valid_rows,
        "errors": report.messages(),
        "issues": issues,
    })
}

fn handle_template(_state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "fileName": "student_import_template.csv",
            "csv": student_template_csv(),
            "instructions": student_import_instructions(),
            "requiredColumns": STUDENT_REQUIRED_COLUMNS,
            "optionalColumns": STUDENT_OPTIONAL_COLUMNS,
        }),
    )
}

fn handle_import_preview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let text = match str_param(req, "csvText") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let report = preview(state, text);
    ok(&req.id, report_json(&report))
}

fn handle_import_commit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let text = match str_param(req, "csvText") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let report = preview(state, text);
    let records = match into_student_records(&report.valid_rows) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "validation_failed",
                e.to_string(),
                Some(json!({ "kind": e.code() })),
            )
        }
    };

    let imported = records.len();
    state.students.extend(records.iter().cloned());
    tracing::info!(
        imported,
        rejected = report.errors.len(),
        total = state.students.len(),
        "student import committed"
    );

    let mut result = report_json(&report);
    result["imported"] = json!(imported);
    result["students"] = json!(records);
    ok(&req.id, result)
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "students": state.students }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.importTemplate" => Some(handle_template(state, req)),
        "students.importPreview" => Some(handle_import_preview(state, req)),
        "students.importCommit" => Some(handle_import_commit(state, req)),
        "students.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
