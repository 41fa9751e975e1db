use serde_json::json;
use uuid::Uuid;

use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};
use crate::store::{Course, CoursePatch};

pub(super) fn course_json(c: &Course) -> serde_json::Value {
    json!({
        "id": c.id,
        "name": c.name,
        "assignedInstructorIds": c.assigned_instructor_ids,
        "enrolledStudentIds": c.enrolled_student_ids,
        "enrolledCount": c.enrolled_student_ids.len(),
    })
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let courses: Vec<_> = state.store.courses().iter().map(course_json).collect();
    ok(&req.id, json!({ "courses": courses }))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = match req.params.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing courseId", None),
    };
    match state.store.course(&course_id) {
        Ok(c) => ok(&req.id, json!({ "course": course_json(c) })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match req.params.get("id") {
        None | Some(serde_json::Value::Null) => Uuid::new_v4().to_string(),
        Some(v) => match v.as_str() {
            Some(s) => s.to_string(),
            None => return err(&req.id, "bad_params", "id must be a string", None),
        },
    };
    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    match state.store.add_course(&id, &name) {
        Ok(()) => ok(&req.id, json!({ "courseId": id.trim() })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = match req.params.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing courseId", None),
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing/invalid patch", None);
    };
    let mut out = CoursePatch::default();
    if let Some(v) = patch.get("name") {
        match v.as_str() {
            Some(s) => out.name = Some(s.to_string()),
            None => return err(&req.id, "bad_params", "patch.name must be a string", None),
        }
    }
    match state.store.update_course(&course_id, out) {
        Ok(c) => ok(&req.id, json!({ "course": course_json(c) })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let course_id = match req.params.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing courseId", None),
    };
    match state.store.delete_course(&course_id) {
        Ok(()) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_list(state, req)),
        "courses.get" => Some(handle_get(state, req)),
        "courses.create" => Some(handle_create(state, req)),
        "courses.update" => Some(handle_update(state, req)),
        "courses.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
