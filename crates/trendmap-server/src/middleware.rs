use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id that is propagated as-is.
const MAX_REQUEST_ID_LEN: usize = 64;

/// Request id, stored as a request extension and echoed in error bodies.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

fn accepted_caller_id(raw: &str) -> Option<&str> {
    let ok = !raw.is_empty()
        && raw.len() <= MAX_REQUEST_ID_LEN
        && raw.bytes().all(|b| b.is_ascii_graphic());
    ok.then_some(raw)
}

/// Reuses a well-formed caller `x-request-id` or assigns a fresh UUID, runs
/// the request inside a span carrying it, and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(accepted_caller_id)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let span = tracing::info_span!("api_request", request_id = %id);
    let mut res = next.run(req).instrument(span).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_id_must_be_short_printable_ascii() {
        assert_eq!(accepted_caller_id("abc-123"), Some("abc-123"));
        assert_eq!(accepted_caller_id(""), None);
        assert_eq!(accepted_caller_id("has space"), None);
        assert_eq!(accepted_caller_id(&"x".repeat(MAX_REQUEST_ID_LEN + 1)), None);
        assert!(accepted_caller_id(&"x".repeat(MAX_REQUEST_ID_LEN)).is_some());
    }
}
