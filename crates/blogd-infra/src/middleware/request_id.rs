use axum::http::{HeaderMap, HeaderValue};
use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

/// Request-scoped id, echoed back in the `X-Request-ID` response header and
/// available to handlers through request extensions.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

const REQUEST_ID_HEADER: &str = "X-Request-ID";
const MAX_INHERITED_ID_LEN: usize = 64;

/// An incoming id is reused so traces join up across services, but only
/// when it is short and printable; anything else gets a fresh uuid so log
/// fields stay clean.
fn inherited_request_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
    if raw.is_empty() || raw.len() > MAX_INHERITED_ID_LEN {
        return None;
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return None;
    }
    Some(raw.to_string())
}

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id =
        inherited_request_id(request.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            REQUEST_ID_HEADER,
            HeaderValue::from_str(value).expect("valid header value"),
        );
        headers
    }

    #[test]
    fn clean_inherited_id_is_reused() {
        let headers = headers_with("req_1234-abcd");
        assert_eq!(
            inherited_request_id(&headers),
            Some("req_1234-abcd".to_string())
        );
    }

    #[test]
    fn oversized_or_odd_ids_are_replaced() {
        assert_eq!(inherited_request_id(&HeaderMap::new()), None);
        assert_eq!(inherited_request_id(&headers_with("")), None);
        assert_eq!(inherited_request_id(&headers_with(&"x".repeat(65))), None);
        assert_eq!(inherited_request_id(&headers_with("id with spaces")), None);
        assert_eq!(inherited_request_id(&headers_with("id;injection")), None);
    }
}
