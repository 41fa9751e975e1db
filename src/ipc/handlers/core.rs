use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "counts": {
                "students": state.store.students().len(),
                "instructors": state.store.instructors().len(),
                "courses": state.store.courses().len(),
            }
        }),
    )
}

fn handle_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query = match req.params.get("query").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing query", None),
    };
    let hits: Vec<_> = state
        .store
        .search(&query)
        .into_iter()
        .map(|h| {
            json!({
                "kind": h.kind.to_string(),
                "id": h.id,
                "name": h.name,
            })
        })
        .collect();
    ok(&req.id, json!({ "hits": hits }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "records.search" => Some(handle_search(state, req)),
        _ => None,
    }
}
