//! Transport-agnostic request boundary.
//!
//! Every handler takes a JSON body and returns a status plus a JSON body, so
//! any HTTP framework (or the CLI) can mount them without further mapping.

pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::ClinicError;

/// Status code and JSON body produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::from_error(&ClinicError::ComputationFailure(e.to_string())),
        }
    }

    pub fn from_error(err: &ClinicError) -> Self {
        let status = err.status_code();
        warn!(kind = err.kind(), status, error = %err, "request failed");
        let body = serde_json::to_value(ErrorResponse {
            error: err.to_string(),
        })
        .unwrap_or(Value::Null);
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

impl<T: Serialize> From<crate::error::Result<T>> for ApiResponse {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(value) => Self::ok(&value),
            Err(e) => Self::from_error(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Task;
    use serde_json::json;

    #[test]
    fn error_body_carries_message_and_status() {
        let resp = ApiResponse::from_error(&ClinicError::ModelNotLoaded(Task::Outcome));
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, json!({"error": "Outcome model not loaded"}));
        assert!(!resp.is_success());
    }

    #[test]
    fn ok_serializes_value() {
        let resp = ApiResponse::ok(&vec![1, 2]);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!([1, 2]));
        assert!(resp.is_success());
    }
}
