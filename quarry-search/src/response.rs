//! Response validation.

use crate::{
    error::{DalError, Result},
    transport::RawResponse,
};
use quarry_log::debug;

/// Fail with [`DalError::QueryFailure`] unless the engine accepted the request.
pub fn check_response(response: &RawResponse) -> Result<()> {
    if response.is_ok() {
        return Ok(());
    }

    debug!(
        "Engine rejected request with status {}: {}",
        response.status,
        error_reason(response).unwrap_or("no reason given")
    );

    Err(DalError::QueryFailure {
        status: response.status,
    })
}

/// Reason reported in an engine error body, if any.
pub fn error_reason(response: &RawResponse) -> Option<&str> {
    let error = response.body.get("error")?;
    error
        .get("reason")
        .and_then(|r| r.as_str())
        .or_else(|| error.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_response_passes() {
        assert!(check_response(&RawResponse::ok(json!({}))).is_ok());
    }

    #[test]
    fn test_rejected_response_carries_status() {
        let response = RawResponse::new(
            401,
            json!({ "error": { "type": "security_exception", "reason": "missing credentials" } }),
        );
        let err = check_response(&response).unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "query failed (status: 401)");
        assert_eq!(error_reason(&response), Some("missing credentials"));
    }

    #[test]
    fn test_error_reason_variants() {
        let plain = RawResponse::new(400, json!({ "error": "bad request" }));
        assert_eq!(error_reason(&plain), Some("bad request"));

        let empty = RawResponse::new(502, serde_json::Value::Null);
        assert_eq!(error_reason(&empty), None);
        assert!(check_response(&empty).is_err());
    }
}
