use std::collections::HashMap;

use serde_json::json;

use crate::calc::{aggregate, round_off_1_decimal, Assessment, Mark};
use crate::grading::{band_for, overall_grade, GradeBand, GradeScale};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{parse_opt_param, parse_param};
use crate::ipc::types::{AppState, Request};

fn resolve_scale(state: &AppState, req: &Request) -> Result<GradeScale, serde_json::Value> {
    match parse_opt_param::<String>(req, "scale")? {
        None => Ok(state.config.grade_scale.clone()),
        Some(name) => GradeScale::by_name(&name)
            .map_err(|e| err(&req.id, "bad_params", e.to_string(), None)),
    }
}

fn handle_scale(state: &mut AppState, req: &Request) -> serde_json::Value {
    let scale = match resolve_scale(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    ok(
        &req.id,
        json!({
            "name": scale.name(),
            "bands": scale.bands(),
            "passingBand": scale.passing_band(),
        }),
    )
}

fn handle_band(state: &mut AppState, req: &Request) -> serde_json::Value {
    let percentage = match parse_param::<f64>(req, "percentage") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    // Explicit bands are looked up as given, without scale validation.
    let band = match parse_opt_param::<Vec<GradeBand>>(req, "bands") {
        Ok(Some(bands)) => band_for(percentage, &bands),
        Ok(None) => match resolve_scale(state, req) {
            Ok(scale) => scale.band_for(percentage),
            Err(resp) => return resp,
        },
        Err(resp) => return resp,
    };
    match band {
        Ok(b) => ok(&req.id, json!({ "band": b })),
        Err(e) => err(
            &req.id,
            "bad_params",
            e.to_string(),
            Some(json!({ "percentage": percentage })),
        ),
    }
}

fn handle_overall(state: &mut AppState, req: &Request) -> serde_json::Value {
    let percentages = match parse_param::<Vec<f64>>(req, "percentages") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let scale = match resolve_scale(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    match overall_grade(&percentages, &scale) {
        Ok(overall) => ok(&req.id, json!({ "overall": overall })),
        Err(e) => err(&req.id, "bad_params", e.to_string(), None),
    }
}

fn handle_aggregate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let assessments = match parse_param::<Vec<Assessment>>(req, "assessments") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let scores = match parse_opt_param::<HashMap<String, Mark>>(req, "scores") {
        Ok(v) => v.unwrap_or_default(),
        Err(resp) => return resp,
    };
    let scale = match resolve_scale(state, req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    if let Some(unknown) = scores
        .keys()
        .find(|id| !assessments.iter().any(|a| &a.id == *id))
    {
        return err(
            &req.id,
            "bad_params",
            format!("unknown assessment: {unknown}"),
            Some(json!({ "assessmentId": unknown })),
        );
    }

    for a in &assessments {
        if let Err(reason) = a.check() {
            return err(
                &req.id,
                "bad_params",
                reason,
                Some(json!({ "assessmentId": a.id })),
            );
        }
        if let Some(Mark::Entered(v)) = scores.get(&a.id) {
            if let Err(e) = a.check_mark(*v) {
                return err(
                    &req.id,
                    "validation_failed",
                    e.to_string(),
                    Some(json!({ "kind": e.code(), "assessmentId": a.id })),
                );
            }
        }
    }

    let summary = aggregate(assessments.iter().map(|a| {
        let mark = scores.get(&a.id).copied().unwrap_or_default();
        (mark, a)
    }));
    let band = match scale.band_for(summary.percentage.clamp(0.0, 100.0)) {
        Ok(b) => b,
        Err(e) => return err(&req.id, "bad_config", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "summary": summary,
            "percentageDisplay": round_off_1_decimal(summary.percentage),
            "grade": band.grade,
            "gradePoint": band.grade_point,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.scale" => Some(handle_scale(state, req)),
        "grades.band" => Some(handle_band(state, req)),
        "grades.overall" => Some(handle_overall(state, req)),
        "scores.aggregate" => Some(handle_aggregate(state, req)),
        _ => None,
    }
}
