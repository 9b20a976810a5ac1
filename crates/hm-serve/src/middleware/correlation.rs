use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use ulid::Ulid;

#[derive(Clone, Debug)]
pub struct CorrelationId(pub String);

pub const HEADER_NAME: &str = "x-correlation-id";

/// Longest client-supplied id that is echoed back and logged.
pub const MAX_CORRELATION_LEN: usize = 128;

/// Keeps a client id that is short and printable ASCII, else mints
/// `corr_<ULID>`.
pub fn resolve_correlation_id(header: Option<&HeaderValue>) -> String {
    header
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| {
            !value.is_empty()
                && value.len() <= MAX_CORRELATION_LEN
                && value.chars().all(|c| c.is_ascii_graphic())
        })
        .map_or_else(|| format!("corr_{}", Ulid::new()), str::to_string)
}

pub async fn correlation_middleware(mut request: Request<Body>, next: Next) -> Response {
    let header = HeaderName::from_static(HEADER_NAME);
    let id = resolve_correlation_id(request.headers().get(&header));

    request.extensions_mut().insert(CorrelationId(id.clone()));
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(header, value);
    }
    response
}
