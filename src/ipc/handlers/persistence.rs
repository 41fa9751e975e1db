use std::path::PathBuf;

use serde_json::json;

use crate::db;
use crate::export;
use crate::ipc::error::{err, ok, persist_err};
use crate::ipc::types::{AppState, Request};
use crate::persist;

fn path_param(req: &Request) -> Result<PathBuf, serde_json::Value> {
    match req.params.get("path").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(PathBuf::from(v)),
        _ => Err(err(&req.id, "bad_params", "missing path", None)),
    }
}

fn counts_json(state: &AppState) -> serde_json::Value {
    json!({
        "students": state.store.students().len(),
        "instructors": state.store.instructors().len(),
        "courses": state.store.courses().len(),
    })
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match path_param(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match persist::save_snapshot(&state.store, &path) {
        Ok(()) => ok(
            &req.id,
            json!({ "path": path.to_string_lossy(), "counts": counts_json(state) }),
        ),
        Err(e) => persist_err(&req.id, &e),
    }
}

fn handle_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match path_param(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    // Swap the live store only after a fully valid snapshot came back; a
    // corrupt file leaves the previous in-memory state untouched.
    match persist::load_snapshot(&path) {
        Ok(store) => {
            state.store = store;
            ok(&req.id, json!({ "counts": counts_json(state) }))
        }
        Err(e) => persist_err(&req.id, &e),
    }
}

fn handle_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match path_param(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    match export::export_csv(&state.store, &path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "path": path.to_string_lossy(),
                "studentRows": summary.student_rows,
                "instructorRows": summary.instructor_rows,
                "courseRows": summary.course_rows,
            }),
        ),
        Err(e) => err(&req.id, "io_failed", e.to_string(), None),
    }
}

fn handle_save_db(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match path_param(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let conn = match db::open_db(&path) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:#}"), None),
    };
    match db::save_store(&conn, &state.store) {
        Ok(()) => ok(
            &req.id,
            json!({ "path": path.to_string_lossy(), "counts": counts_json(state) }),
        ),
        Err(e) => err(&req.id, "db_write_failed", format!("{e:#}"), None),
    }
}

fn handle_load_db(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match path_param(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    // open_db would create an empty database here; a missing file is a
    // caller mistake, not an empty school.
    if !path.is_file() {
        return err(
            &req.id,
            "io_failed",
            format!("database file not found: {}", path.to_string_lossy()),
            None,
        );
    }
    let conn = match db::open_db(&path) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:#}"), None),
    };
    match db::load_store(&conn) {
        Ok(store) => {
            state.store = store;
            ok(&req.id, json!({ "counts": counts_json(state) }))
        }
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "data.save" => Some(handle_save(state, req)),
        "data.load" => Some(handle_load(state, req)),
        "data.exportCsv" => Some(handle_export_csv(state, req)),
        "data.saveDb" => Some(handle_save_db(state, req)),
        "data.loadDb" => Some(handle_load_db(state, req)),
        _ => None,
    }
}
