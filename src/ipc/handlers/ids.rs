use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::student_id::NoStudentId;
use serde_json::json;

/// Accepts the year as a JSON number or a numeric string; blank means absent.
fn intake_year_param(params: &serde_json::Value) -> Result<Option<i32>, String> {
    match params.get("intakeYear") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| format!("intakeYear out of range: {n}")),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| format!("intakeYear is not a number: {s:?}")),
        Some(other) => Err(format!("intakeYear has unexpected type: {other}")),
    }
}

fn handle_ids_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let faculty = req
        .params
        .get("faculty")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let shift = req
        .params
        .get("shift")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let intake_year = match intake_year_param(&req.params) {
        Ok(v) => v,
        Err(message) => {
            return err(
                &req.id,
                "bad_params",
                message,
                Some(json!({ "field": "intakeYear" })),
            )
        }
    };

    match state.ids.generate(faculty, intake_year, shift) {
        Ok(id) => ok(
            &req.id,
            json!({
                "studentId": id.to_string(),
                "key": id.key.to_string(),
                "sequence": id.sequence,
            }),
        ),
        Err(e @ NoStudentId::MissingFields) => err(&req.id, "no_id", e.to_string(), None),
        Err(e @ NoStudentId::Exhausted(_)) => err(&req.id, "ids_exhausted", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "ids.generate" => Some(handle_ids_generate(state, req)),
        _ => None,
    }
}
