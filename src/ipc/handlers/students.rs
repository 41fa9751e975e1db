use serde_json::json;
use uuid::Uuid;

use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::store::{PersonPatch, RecordStore, Student};

pub(super) fn student_json(store: &RecordStore, s: &Student) -> serde_json::Value {
    let registered: Vec<&str> = store
        .courses()
        .iter()
        .filter(|c| c.enrolled_student_ids.iter().any(|sid| sid == &s.id))
        .map(|c| c.id.as_str())
        .collect();
    json!({
        "id": s.id,
        "name": s.name,
        "email": s.email,
        "age": s.age,
        "updatedAt": s.updated_at,
        "registeredCourseIds": registered,
    })
}

/// Parses the shared name/email/age patch shape used by both person types.
/// `age: null` clears the field; a missing key leaves it unchanged.
pub(super) fn parse_person_patch(
    patch: &serde_json::Map<String, serde_json::Value>,
) -> Result<PersonPatch, String> {
    let mut out = PersonPatch::default();
    if let Some(v) = patch.get("name") {
        match v.as_str() {
            Some(s) => out.name = Some(s.to_string()),
            None => return Err("patch.name must be a string".into()),
        }
    }
    if let Some(v) = patch.get("email") {
        match v.as_str() {
            Some(s) => out.email = Some(s.to_string()),
            None => return Err("patch.email must be a string".into()),
        }
    }
    if let Some(v) = patch.get("age") {
        if v.is_null() {
            out.age = Some(None);
        } else {
            match v.as_u64().and_then(|a| u32::try_from(a).ok()) {
                Some(a) => out.age = Some(Some(a)),
                None => return Err("patch.age must be a non-negative integer or null".into()),
            }
        }
    }
    Ok(out)
}

pub(super) fn parse_create_person(
    req: &Request,
) -> Result<(String, String, String, Option<u32>), String> {
    // Front-ends let users type ids; generate one when the field is left out.
    let id = match req.params.get("id") {
        None | Some(serde_json::Value::Null) => Uuid::new_v4().to_string(),
        Some(v) => match v.as_str() {
            Some(s) => s.to_string(),
            None => return Err("id must be a string".into()),
        },
    };
    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return Err("missing name".into()),
    };
    let email = match req.params.get("email").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return Err("missing email".into()),
    };
    let age = match req.params.get("age") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => match v.as_u64().and_then(|a| u32::try_from(a).ok()) {
            Some(a) => Some(a),
            None => return Err("age must be a non-negative integer".into()),
        },
    };
    Ok((id, name, email, age))
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let students: Vec<_> = state
        .store
        .students()
        .iter()
        .map(|s| student_json(&state.store, s))
        .collect();
    ok(&req.id, json!({ "students": students }))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };
    match state.store.student(&student_id) {
        Ok(s) => {
            let body = student_json(&state.store, s);
            ok(&req.id, json!({ "student": body }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (id, name, email, age) = match parse_create_person(req) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match state.store.add_student(&id, &name, &email, age) {
        // Ids are stored trimmed; echo back what the store kept.
        Ok(()) => ok(&req.id, json!({ "studentId": id.trim() })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing/invalid patch", None);
    };
    let patch = match parse_person_patch(patch) {
        Ok(p) => p,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match state.store.update_student(&student_id, patch) {
        Ok(s) => {
            let body = json!({ "id": s.id, "name": s.name, "email": s.email, "age": s.age });
            ok(&req.id, json!({ "student": body }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };
    match state.store.delete_student(&student_id) {
        Ok(()) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_list(state, req)),
        "students.get" => Some(handle_get(state, req)),
        "students.create" => Some(handle_create(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
