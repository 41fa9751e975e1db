use serde_json::json;

use super::students::{parse_create_person, parse_person_patch};
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::store::{Instructor, RecordStore};

pub(super) fn instructor_json(store: &RecordStore, i: &Instructor) -> serde_json::Value {
    let assigned: Vec<&str> = store
        .courses()
        .iter()
        .filter(|c| c.assigned_instructor_ids.iter().any(|iid| iid == &i.id))
        .map(|c| c.id.as_str())
        .collect();
    json!({
        "id": i.id,
        "name": i.name,
        "email": i.email,
        "age": i.age,
        "updatedAt": i.updated_at,
        "assignedCourseIds": assigned,
    })
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let instructors: Vec<_> = state
        .store
        .instructors()
        .iter()
        .map(|i| instructor_json(&state.store, i))
        .collect();
    ok(&req.id, json!({ "instructors": instructors }))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let instructor_id = match req.params.get("instructorId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instructorId", None),
    };
    match state.store.instructor(&instructor_id) {
        Ok(i) => {
            let body = instructor_json(&state.store, i);
            ok(&req.id, json!({ "instructor": body }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (id, name, email, age) = match parse_create_person(req) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match state.store.add_instructor(&id, &name, &email, age) {
        Ok(()) => ok(&req.id, json!({ "instructorId": id.trim() })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let instructor_id = match req.params.get("instructorId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instructorId", None),
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing/invalid patch", None);
    };
    let patch = match parse_person_patch(patch) {
        Ok(p) => p,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match state.store.update_instructor(&instructor_id, patch) {
        Ok(i) => {
            let body = json!({ "id": i.id, "name": i.name, "email": i.email, "age": i.age });
            ok(&req.id, json!({ "instructor": body }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let instructor_id = match req.params.get("instructorId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instructorId", None),
    };
    match state.store.delete_instructor(&instructor_id) {
        Ok(()) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "instructors.list" => Some(handle_list(state, req)),
        "instructors.get" => Some(handle_get(state, req)),
        "instructors.create" => Some(handle_create(state, req)),
        "instructors.update" => Some(handle_update(state, req)),
        "instructors.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
