//! Failure classification: provider signals in, tri-state out.
//!
//! The retry policy upstream is provider-agnostic, so this module is the
//! single place that knows which HTTP statuses mean "try again" and
//! which mean "give up".

use reqwest::StatusCode;
use slidecraft_core::error::CoreError;

/// Classify a non-success HTTP response into a transient or permanent
/// provider error.
///
/// - 408, 429, and all 5xx are transient (timeout, rate limit,
///   server-side trouble).
/// - Every other 4xx is permanent (invalid input, auth, content policy,
///   quota exhausted).
pub fn classify_status(status: StatusCode, body: &str) -> CoreError {
    let message = extract_message(body).unwrap_or_else(|| body.chars().take(200).collect());
    let detail = format!("provider returned {status}: {message}");

    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        CoreError::TransientProvider(detail)
    } else {
        CoreError::PermanentProvider(detail)
    }
}

/// Classify a reqwest transport error.
///
/// Timeouts and connection failures are transient; request-construction
/// errors are permanent (they will not succeed on retry).
pub fn classify_transport(err: &reqwest::Error) -> CoreError {
    if err.is_timeout() || err.is_connect() {
        CoreError::TransientProvider(format!("provider unreachable: {err}"))
    } else if err.is_builder() || err.is_request() {
        CoreError::PermanentProvider(format!("malformed provider request: {err}"))
    } else {
        CoreError::TransientProvider(format!("provider transport error: {err}"))
    }
}

/// Pull the human-readable message out of a provider error payload
/// (`{"error": {"message": "..."}}` or `{"error": "..."}`).
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match &value["error"] {
        serde_json::Value::String(s) => Some(s.clone()),
        obj => obj["message"].as_str().map(String::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn rate_limit_is_transient() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, "{}");
        assert_matches!(err, CoreError::TransientProvider(_));
    }

    #[test]
    fn server_errors_are_transient() {
        for code in [500u16, 502, 503, 504] {
            let status = StatusCode::from_u16(code).unwrap();
            assert_matches!(
                classify_status(status, ""),
                CoreError::TransientProvider(_)
            );
        }
    }

    #[test]
    fn request_timeout_is_transient() {
        assert_matches!(
            classify_status(StatusCode::REQUEST_TIMEOUT, ""),
            CoreError::TransientProvider(_)
        );
    }

    #[test]
    fn bad_request_is_permanent() {
        assert_matches!(
            classify_status(StatusCode::BAD_REQUEST, ""),
            CoreError::PermanentProvider(_)
        );
    }

    #[test]
    fn forbidden_is_permanent() {
        // Content-policy rejections surface as 403.
        assert_matches!(
            classify_status(StatusCode::FORBIDDEN, ""),
            CoreError::PermanentProvider(_)
        );
    }

    #[test]
    fn error_payload_message_is_extracted() {
        let body = r#"{"error": {"message": "prompt blocked by safety filter"}}"#;
        let err = classify_status(StatusCode::FORBIDDEN, body);
        assert!(err.to_string().contains("prompt blocked by safety filter"));
    }

    #[test]
    fn string_error_payload_is_extracted() {
        let body = r#"{"error": "quota exhausted"}"#;
        let err = classify_status(StatusCode::PAYMENT_REQUIRED, body);
        assert!(err.to_string().contains("quota exhausted"));
    }

    #[test]
    fn opaque_body_is_truncated_into_message() {
        let body = "x".repeat(1000);
        let err = classify_status(StatusCode::BAD_GATEWAY, &body);
        assert!(err.to_string().len() < 300);
    }
}
