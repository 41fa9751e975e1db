use serde_json::json;

use super::courses::course_json;
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::types::{AppState, Request};

fn handle_enroll(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };
    let course_id = match req.params.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing courseId", None),
    };
    match state.store.enroll(&student_id, &course_id) {
        Ok(changed) => {
            let course = state.store.course(&course_id).map(course_json);
            match course {
                Ok(course) => ok(&req.id, json!({ "changed": changed, "course": course })),
                Err(e) => store_err(&req.id, &e),
            }
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_assign(state: &mut AppState, req: &Request) -> serde_json::Value {
    let instructor_id = match req.params.get("instructorId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instructorId", None),
    };
    let course_id = match req.params.get("courseId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing courseId", None),
    };
    match state.store.assign(&instructor_id, &course_id) {
        Ok(changed) => {
            let course = state.store.course(&course_id).map(course_json);
            match course {
                Ok(course) => ok(&req.id, json!({ "changed": changed, "course": course })),
                Err(e) => store_err(&req.id, &e),
            }
        }
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "registration.enroll" => Some(handle_enroll(state, req)),
        "registration.assign" => Some(handle_assign(state, req)),
        _ => None,
    }
}
