//! Helpers shared by the Google REST adapters.

use serde::Deserialize;

/// Longest response excerpt written to logs.
const LOG_EXCERPT_CHARS: usize = 500;

/// Error envelope returned by Google APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Extract `error.message` from a Google API error body.
///
/// Falls back to the first characters of the raw body when it is not the
/// usual envelope (proxies and load balancers answer with HTML).
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body).map_or_else(
        |_| body.chars().take(200).collect(),
        |envelope| envelope.error.message,
    )
}

/// Truncate a response body for logging.
pub(crate) fn excerpt(body: &str) -> String {
    body.chars().take(LOG_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_EXISTS","errors":[]}}"#;
        assert_eq!(error_message(body), "EMAIL_EXISTS");
    }

    #[test]
    fn test_error_message_from_html() {
        let body = "<html>bad gateway</html>";
        assert_eq!(error_message(body), body);
    }

    #[test]
    fn test_excerpt_truncates() {
        let body = "x".repeat(2000);
        assert_eq!(excerpt(&body).len(), LOG_EXCERPT_CHARS);
    }
}
