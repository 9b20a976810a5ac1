use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use hm_core::types::UserId;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct Identity(pub UserId);

pub const HEADER_NAME: &str = "x-user-id";

/// Stand-in for authentication: trusts a well-formed `x-user-id` header and
/// falls back to the anonymous author otherwise.
pub async fn identity_middleware(mut request: Request<Body>, next: Next) -> Response {
    let user = request
        .headers()
        .get(HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| match value.parse::<UserId>() {
            Ok(user) => Some(user),
            Err(err) => {
                debug!(error = %err, "ignoring malformed x-user-id");
                None
            }
        })
        .unwrap_or_else(UserId::anonymous);

    request.extensions_mut().insert(Identity(user));
    next.run(request).await
}
