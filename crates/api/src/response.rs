//! Shared response envelope types for API handlers.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope, used for list endpoints.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `{ "ok": true }` acknowledgement for actions with nothing to return.
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn new() -> Self {
        Self { ok: true }
    }
}

impl Default for OkResponse {
    fn default() -> Self {
        Self::new()
    }
}
