use crate::middleware::correlation::CorrelationId;
use crate::middleware::identity::Identity;
use crate::routes::error::error_response;
use crate::routes::media;
use crate::{AppState, build_hazardmap};
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use hm_core::geo::GeoPoint;
use hm_core::types::media::DEFAULT_CONTENT_TYPE;
use hm_core::types::{CreateEventInput, Event, EventId, MediaUpload, NearbyQuery};
use hm_core::{HazardError, RequestContext};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

/// Multipart part name carrying attachments.
pub const MEDIA_FIELD: &str = "media";

const UNNAMED_UPLOAD: &str = "upload";

/// Query parameters arrive as raw strings so bad values surface as
/// `invalid_input` envelopes instead of extractor rejections.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct NearbyParams {
    /// Latitude of the search center.
    pub lat: Option<String>,
    /// Longitude of the search center.
    pub lng: Option<String>,
    /// Search radius in meters, default 5000.
    pub radius: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub ok: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/media/{file_id}", get(media::stream_media))
        .route("/events/{id}", get(get_event).delete(delete_event))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/events",
    request_body(
        content = CreateEventInput,
        description = "JSON body, or multipart/form-data with the same fields plus up to five `media` file parts"
    ),
    responses(
        (status = 201, body = Event),
        (status = 400, description = "Missing or invalid fields")
    )
)]
pub(crate) async fn create_event(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    request: Request,
) -> Response {
    let ctx = RequestContext::new(identity.0, Some(correlation.0));
    let (input, uploads) = match read_submission(request).await {
        Ok(submission) => submission,
        Err(err) => return error_response(&err, ctx.correlation_id),
    };
    let core = match build_hazardmap(&state) {
        Ok(core) => core,
        Err(err) => return error_response(&err, ctx.correlation_id),
    };
    match core.events().create(&ctx, &input, uploads) {
        Ok(event) => (StatusCode::CREATED, Json(event)).into_response(),
        Err(err) => error_response(&err, ctx.correlation_id.clone()),
    }
}

#[utoipa::path(
    get,
    path = "/api/events",
    params(NearbyParams),
    responses(
        (status = 200, body = Vec<Event>),
        (status = 400, description = "Missing or invalid coordinates")
    )
)]
pub(crate) async fn list_events(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Query(params): Query<NearbyParams>,
) -> Response {
    let query = match nearby_query(&params) {
        Ok(query) => query,
        Err(err) => return error_response(&err, Some(correlation.0)),
    };
    let core = match build_hazardmap(&state) {
        Ok(core) => core,
        Err(err) => return error_response(&err, Some(correlation.0)),
    };
    match core.events().nearby(&query) {
        Ok(events) => Json(events).into_response(),
        Err(err) => error_response(&err, Some(correlation.0)),
    }
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(("id" = String, Path, description = "Event ID")),
    responses(
        (status = 200, body = Event),
        (status = 404, description = "Unknown or expired event")
    )
)]
pub(crate) async fn get_event(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_event_id(id) {
        Ok(id) => id,
        Err(err) => return error_response(&err, Some(correlation.0)),
    };
    let core = match build_hazardmap(&state) {
        Ok(core) => core,
        Err(err) => return error_response(&err, Some(correlation.0)),
    };
    match core.events().get(&id) {
        Ok(event) => Json(event).into_response(),
        Err(err) => error_response(&err, Some(correlation.0)),
    }
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    params(("id" = String, Path, description = "Event ID")),
    responses(
        (status = 200, body = DeleteResponse),
        (status = 404, description = "Unknown or expired event"),
        (status = 500, description = "Some attachments could not be released; the event is kept")
    )
)]
pub(crate) async fn delete_event(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Response {
    let ctx = RequestContext::new(identity.0, Some(correlation.0));
    let id = match parse_event_id(id) {
        Ok(id) => id,
        Err(err) => return error_response(&err, ctx.correlation_id),
    };
    let core = match build_hazardmap(&state) {
        Ok(core) => core,
        Err(err) => return error_response(&err, ctx.correlation_id),
    };
    match core.events().delete(&ctx, &id) {
        Ok(()) => Json(DeleteResponse { ok: true }).into_response(),
        Err(err) => error_response(&err, ctx.correlation_id.clone()),
    }
}

fn parse_event_id(raw: String) -> Result<EventId, HazardError> {
    EventId::new(raw).map_err(|err| HazardError::invalid_input(err.to_string()))
}

fn nearby_query(params: &NearbyParams) -> Result<NearbyQuery, HazardError> {
    let lat = optional_number("lat", params.lat.as_deref())?;
    let lng = optional_number("lng", params.lng.as_deref())?;
    let (Some(lat), Some(lng)) = (lat, lng) else {
        return Err(HazardError::invalid_input("lat and lng are required"));
    };
    let center =
        GeoPoint::new(lat, lng).map_err(|err| HazardError::invalid_input(err.to_string()))?;
    let radius = match params.radius.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
            HazardError::invalid_input(format!(
                "radius must be a non-negative integer, got {raw:?}"
            ))
        })?),
    };
    Ok(NearbyQuery::new(center, radius))
}

/// Blank values count as absent.
fn optional_number(field: &str, raw: Option<&str>) -> Result<Option<f64>, HazardError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| HazardError::invalid_input(format!("{field} must be a number, got {raw:?}")))
}

async fn read_submission(
    request: Request,
) -> Result<(CreateEventInput, Vec<MediaUpload>), HazardError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|rejection| HazardError::invalid_input(rejection.body_text()))?;
        read_multipart(multipart).await
    } else {
        let Json(body) = Json::<Value>::from_request(request, &())
            .await
            .map_err(|rejection| HazardError::invalid_input(rejection.body_text()))?;
        let Some(fields) = body.as_object() else {
            return Err(HazardError::invalid_input(
                "request body must be a JSON object",
            ));
        };
        Ok((input_from_json(fields)?, Vec::new()))
    }
}

fn multipart_error(err: MultipartError) -> HazardError {
    HazardError::invalid_input(err.body_text())
}

async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(CreateEventInput, Vec<MediaUpload>), HazardError> {
    let mut input = CreateEventInput::default();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == MEDIA_FIELD {
            let filename = field
                .file_name()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(UNNAMED_UPLOAD)
                .to_string();
            let content_type = upload_content_type(field.content_type(), &filename);
            let data = field.bytes().await.map_err(multipart_error)?;
            uploads.push(MediaUpload {
                filename,
                content_type,
                data: data.to_vec(),
            });
            continue;
        }

        let text = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "lat" => input.lat = optional_number("lat", Some(&text))?,
            "lng" => input.lng = optional_number("lng", Some(&text))?,
            "category" => input.category = Some(text),
            "description" => input.description = Some(text),
            _ => {}
        }
    }

    Ok((input, uploads))
}

/// Declared part type, else a guess from the file name, else octet-stream.
pub fn upload_content_type(declared: Option<&str>, filename: &str) -> String {
    declared
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| mime_guess::from_path(filename).first_raw().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

fn input_from_json(fields: &Map<String, Value>) -> Result<CreateEventInput, HazardError> {
    Ok(CreateEventInput {
        lat: json_number("lat", fields.get("lat"))?,
        lng: json_number("lng", fields.get("lng"))?,
        category: json_string("category", fields.get("category"))?,
        description: json_string("description", fields.get("description"))?,
    })
}

fn json_number(field: &str, value: Option<&Value>) -> Result<Option<f64>, HazardError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => Ok(number.as_f64()),
        Some(Value::String(raw)) => optional_number(field, Some(raw)),
        Some(_) => Err(HazardError::invalid_input(format!(
            "{field} must be a number"
        ))),
    }
}

fn json_string(field: &str, value: Option<&Value>) -> Result<Option<String>, HazardError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(HazardError::invalid_input(format!(
            "{field} must be a string"
        ))),
    }
}
