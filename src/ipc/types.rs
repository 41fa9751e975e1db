use serde::Deserialize;

use crate::store::RecordStore;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Daemon-side state: the record store is the single owner of all records
/// and associations. Front-ends hold no copies beyond display caches they
/// refresh by re-listing after each mutation.
#[derive(Default)]
pub struct AppState {
    pub store: RecordStore,
}
