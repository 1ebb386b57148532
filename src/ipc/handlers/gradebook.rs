use serde_json::json;

use crate::calc::{round_off_1_decimal, Assessment, Mark};
use crate::gradebook::{Gradebook, GradebookMeta, RosterStudent};
use crate::ipc::error::{err, gradebook_err, ok};
use crate::ipc::helpers::{parse_opt_param, parse_param, str_param};
use crate::ipc::types::{AppState, Request};

fn gradebook_mut<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut Gradebook, serde_json::Value> {
    let id = str_param(req, "gradebookId")?;
    state.gradebooks.get_mut(id).ok_or_else(|| {
        err(
            &req.id,
            "not_found",
            "gradebook not found",
            Some(json!({ "gradebookId": id })),
        )
    })
}

fn handle_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let meta = match parse_opt_param::<GradebookMeta>(req, "meta") {
        Ok(v) => v.unwrap_or_default(),
        Err(resp) => return resp,
    };
    let assessments = match parse_param::<Vec<Assessment>>(req, "assessments") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let students = match parse_param::<Vec<RosterStudent>>(req, "students") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let gradebook = match Gradebook::new(
        meta,
        assessments,
        students,
        state.config.grade_scale.clone(),
        state.config.publish_policy,
    ) {
        Ok(g) => g,
        Err(e) => return gradebook_err(&req.id, &e),
    };
    let id = gradebook.id().to_string();
    let status = gradebook.status();
    state.gradebooks.insert(id.clone(), gradebook);
    ok(&req.id, json!({ "gradebookId": id, "status": status }))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let gb = match gradebook_mut(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    let students = match gb.summaries() {
        Ok(v) => v,
        Err(e) => return gradebook_err(&req.id, &e),
    };
    let rows: Vec<serde_json::Value> = students
        .into_iter()
        .map(|s| {
            let display = round_off_1_decimal(s.summary.percentage);
            let mut v = json!(s);
            v["percentageDisplay"] = json!(display);
            v
        })
        .collect();
    ok(
        &req.id,
        json!({
            "status": gb.status(),
            "assessments": gb.assessments(),
            "students": rows,
            "assessmentStats": gb.assessment_stats(),
        }),
    )
}

fn handle_set_score(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match str_param(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let assessment_id = match str_param(req, "assessmentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    // number, null, "absent" or "exempt"
    let mark = match parse_opt_param::<Mark>(req, "value") {
        Ok(v) => v.unwrap_or_default(),
        Err(resp) => return resp,
    };
    let gb = match gradebook_mut(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };

    match gb.set_score(student_id, assessment_id, mark) {
        Ok(mark) => ok(
            &req.id,
            json!({
                "value": mark,
                "unsavedChanges": gb.has_unsaved_changes(),
                "missingCount": gb.count_missing(),
            }),
        ),
        Err(e) => {
            tracing::debug!(error = %e, "score rejected");
            gradebook_err(&req.id, &e)
        }
    }
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let gb = match gradebook_mut(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    let saved = gb.save();
    ok(&req.id, json!({ "saved": saved, "status": gb.status() }))
}

fn handle_lock(state: &mut AppState, req: &Request) -> serde_json::Value {
    let gb = match gradebook_mut(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    match gb.lock() {
        Ok(()) => ok(&req.id, json!({ "status": gb.status() })),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_unlock(state: &mut AppState, req: &Request) -> serde_json::Value {
    let gb = match gradebook_mut(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    match gb.unlock() {
        Ok(()) => ok(&req.id, json!({ "status": gb.status() })),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_publish(state: &mut AppState, req: &Request) -> serde_json::Value {
    let gb = match gradebook_mut(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    match gb.publish() {
        Ok(outcome) => ok(
            &req.id,
            json!({
                "status": gb.status(),
                "missingCount": outcome.missing_count,
                "warning": outcome.warning,
            }),
        ),
        Err(e) => gradebook_err(&req.id, &e),
    }
}

fn handle_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match str_param(req, "gradebookId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.gradebooks.remove(id) {
        Some(_) => ok(&req.id, json!({ "closed": true })),
        None => err(
            &req.id,
            "not_found",
            "gradebook not found",
            Some(json!({ "gradebookId": id })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "gradebook.open" => Some(handle_open(state, req)),
        "gradebook.get" => Some(handle_get(state, req)),
        "gradebook.setScore" => Some(handle_set_score(state, req)),
        "gradebook.save" => Some(handle_save(state, req)),
        "gradebook.lock" => Some(handle_lock(state, req)),
        "gradebook.unlock" => Some(handle_unlock(state, req)),
        "gradebook.publish" => Some(handle_publish(state, req)),
        "gradebook.close" => Some(handle_close(state, req)),
        _ => None,
    }
}
