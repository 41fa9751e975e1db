use serde_json::json;

use crate::persist::PersistError;
use crate::store::StoreError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Maps a store failure onto its wire error code. The taxonomy is part of
/// the protocol contract; front-ends switch on `code`, not `message`.
pub fn store_err(id: &str, e: &StoreError) -> serde_json::Value {
    let code = match e {
        StoreError::DuplicateId { .. } => "duplicate_id",
        StoreError::NotFound { .. } => "not_found",
        StoreError::Invalid { .. } => "bad_params",
    };
    err(id, code, e.to_string(), None)
}

pub fn persist_err(id: &str, e: &PersistError) -> serde_json::Value {
    let code = match e {
        PersistError::Corrupt(_) => "corrupt_data",
        PersistError::Io(_) => "io_failed",
    };
    err(id, code, e.to_string(), None)
}
