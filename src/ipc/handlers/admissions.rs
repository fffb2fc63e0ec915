use crate::admission::{ApplicationForm, Choice, IntakeMonth, Shift};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::letter::AdmissionLetter;
use crate::store::{RecordFilter, StoreError};
use crate::student_id::{canonical_faculty, NoStudentId};
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

fn store_err(id: &str, e: StoreError) -> serde_json::Value {
    match e {
        StoreError::NotFound(what) => {
            err(id, "not_found", format!("record not found: {what}"), None)
        }
        StoreError::Persist(message) => err(id, "persist_failed", message, None),
        StoreError::Ambiguous { what, record_ids } => err(
            id,
            "ambiguous",
            format!("more than one record matches {what}"),
            Some(json!({ "recordIds": record_ids })),
        ),
    }
}

fn optional_str<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn handle_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let form: ApplicationForm = match serde_json::from_value(req.params.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let draft = match form.validate(state.default_intake_year) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                e.to_string(),
                Some(json!({ "field": e.field() })),
            )
        }
    };

    // A missing faculty or shift is not fatal: the record is kept without an ID.
    let p = &draft.programme_information;
    let student_id = match state
        .ids
        .generate(&p.faculty, Some(p.intake_year), p.shift_label())
    {
        Ok(id) => Some(id.to_string()),
        Err(e @ NoStudentId::MissingFields) => {
            tracing::info!("submitting without a student ID: {e}");
            None
        }
        Err(e @ NoStudentId::Exhausted(_)) => {
            tracing::warn!("refusing submission: {e}");
            return err(&req.id, "ids_exhausted", e.to_string(), None);
        }
    };

    let record = draft.into_record(student_id, chrono::Utc::now());
    if let Err(e) = store.append(record.clone()) {
        tracing::warn!(error = %e, "failed to store submitted record");
        return store_err(&req.id, e);
    }
    tracing::info!(
        record_id = %record.record_id,
        student_id = record.student_id.as_deref().unwrap_or("-"),
        "application submitted"
    );

    ok(
        &req.id,
        json!({
            "record": record,
            "studentId": record.student_id,
        }),
    )
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return ok(&req.id, json!({ "records": [] }));
    };
    ok(&req.id, json!({ "records": store.list() }))
}

fn parse_choice_param<C: Choice>(
    req: &Request,
    key: &'static str,
) -> Result<Option<C>, serde_json::Value> {
    match optional_str(&req.params, key) {
        None => Ok(None),
        Some(raw) => C::from_label(raw).map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("unknown {key}: {raw}"),
                Some(json!({ "field": key })),
            )
        }),
    }
}

fn handle_filter(state: &mut AppState, req: &Request) -> serde_json::Value {
    let intake_month = match parse_choice_param::<IntakeMonth>(req, "intakeMonth") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let shift = match parse_choice_param::<Shift>(req, "shift") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let filter = RecordFilter {
        faculty: optional_str(&req.params, "faculty")
            .map(|f| canonical_faculty(f).unwrap_or(f).to_string()),
        intake_month,
        shift,
    };

    let Some(store) = state.store.as_ref() else {
        return ok(
            &req.id,
            json!({ "records": [], "options": crate::store::FilterOptions::default(), "total": 0 }),
        );
    };
    ok(
        &req.id,
        json!({
            "records": store.filter(&filter),
            "options": store.filter_options(),
            "total": store.len(),
        }),
    )
}

fn handle_filter_options(state: &mut AppState, req: &Request) -> serde_json::Value {
    let options = state
        .store
        .as_ref()
        .map(|s| s.filter_options())
        .unwrap_or_default();
    ok(&req.id, json!(options))
}

fn parse_record_id(req: &Request) -> Result<Option<Uuid>, serde_json::Value> {
    match optional_str(&req.params, "recordId") {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(raw).map(Some).map_err(|_| {
            err(
                &req.id,
                "bad_params",
                format!("recordId is not a uuid: {raw}"),
                Some(json!({ "field": "recordId" })),
            )
        }),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let record_id = match parse_record_id(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // Positions are always resolved against the full collection.
    let result = if let Some(record_id) = record_id {
        store.delete(record_id)
    } else if let Some(student_id) = optional_str(&req.params, "studentId") {
        store.delete_by_student_id(student_id)
    } else if let Some(index) = req.params.get("index").and_then(|v| v.as_u64()) {
        store.delete_at(index as usize)
    } else {
        return err(
            &req.id,
            "bad_params",
            "missing recordId, studentId or index",
            None,
        );
    };

    match result {
        Ok(removed) => {
            tracing::info!(record_id = %removed.record_id, "record deleted");
            ok(
                &req.id,
                json!({ "deleted": removed, "remaining": store.len() }),
            )
        }
        Err(e) => store_err(&req.id, e),
    }
}

fn handle_letter(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let record_id = match parse_record_id(req) {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "bad_params", "missing recordId", None),
        Err(resp) => return resp,
    };
    let date = match optional_str(&req.params, "date") {
        None => chrono::Local::now().date_naive(),
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => {
                return err(
                    &req.id,
                    "bad_params",
                    "date must be YYYY-MM-DD",
                    Some(json!({ "field": "date" })),
                )
            }
        },
    };

    match store.get(record_id) {
        Some(record) => ok(&req.id, json!(AdmissionLetter::for_record(record, date))),
        None => store_err(&req.id, StoreError::NotFound(format!("recordId {record_id}"))),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "admissions.submit" => Some(handle_submit(state, req)),
        "admissions.list" => Some(handle_list(state, req)),
        "admissions.filter" => Some(handle_filter(state, req)),
        "admissions.filterOptions" => Some(handle_filter_options(state, req)),
        "admissions.delete" => Some(handle_delete(state, req)),
        "admissions.letter" => Some(handle_letter(state, req)),
        _ => None,
    }
}
