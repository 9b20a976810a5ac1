use crate::middleware::correlation::CorrelationId;
use crate::routes::error::error_response;
use crate::{AppState, build_hazardmap};
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use futures::stream;
use hm_core::HazardError;
use hm_core::types::MediaId;
use tracing::warn;

#[utoipa::path(
    get,
    path = "/api/events/media/{file_id}",
    params(("file_id" = String, Path, description = "Media ID")),
    responses(
        (status = 200, description = "Raw media bytes served with the stored content type"),
        (status = 404, description = "Unknown media")
    )
)]
pub(crate) async fn stream_media(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(file_id): Path<String>,
) -> Response {
    let media_id = match MediaId::new(file_id) {
        Ok(id) => id,
        Err(err) => {
            return error_response(&HazardError::invalid_input(err.to_string()), Some(correlation.0));
        }
    };
    let core = match build_hazardmap(&state) {
        Ok(core) => core,
        Err(err) => return error_response(&err, Some(correlation.0)),
    };
    let download = match core.media().open(&media_id) {
        Ok(download) => download,
        Err(err) => return error_response(&err, Some(correlation.0)),
    };

    let total = download.chunks;
    let content_type = download.file.content_type.clone();
    let length = download.file.length.to_string();
    let correlation_id = correlation.0;

    // Chunks are pulled one at a time as the client reads.
    let chunks = stream::unfold((core, 0_u32), move |(core, n)| {
        let media_id = media_id.clone();
        let correlation_id = correlation_id.clone();
        async move {
            if n >= total {
                return None;
            }
            let read = core.media().read_chunk(&media_id, n);
            match read {
                Ok(Some(bytes)) => Some((Ok(Bytes::from(bytes)), (core, n + 1))),
                Ok(None) => {
                    warn!(%correlation_id, %media_id, chunk = n, "media chunk missing");
                    let err = std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("chunk {n} of {media_id} is missing"),
                    );
                    Some((Err(err), (core, total)))
                }
                Err(err) => {
                    warn!(%correlation_id, %media_id, chunk = n, error = %err, "media read failed");
                    Some((Err(std::io::Error::other(err.to_string())), (core, total)))
                }
            }
        }
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, length),
        ],
        Body::from_stream(chunks),
    )
        .into_response()
}
