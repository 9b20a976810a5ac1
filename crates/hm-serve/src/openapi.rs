use utoipa::OpenApi;

use crate::routes::events::{DeleteResponse, NearbyParams};
use crate::routes::health::Health;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use hm_core::geo::GeoJsonPoint;
use hm_core::types::enums::Category;
use hm_core::types::ids::{EventId, MediaId, UserId};
use hm_core::types::{CreateEventInput, Event, MediaRef};

#[derive(OpenApi)]
#[openapi(
    info(title = "Hazardmap API", description = "Geo-tagged incident reports that expire after 24 hours."),
    paths(
        crate::routes::events::create_event,
        crate::routes::events::list_events,
        crate::routes::events::get_event,
        crate::routes::events::delete_event,
        crate::routes::media::stream_media,
        crate::routes::health::health
    ),
    components(schemas(
        Event,
        CreateEventInput,
        NearbyParams,
        DeleteResponse,
        MediaRef,
        GeoJsonPoint,
        Category,
        EventId,
        MediaId,
        UserId,
        Health
    ))
)]
struct ApiDoc;

pub fn generate_spec() -> String {
    ApiDoc::openapi()
        .to_pretty_json()
        .unwrap_or_else(|_| "{}".to_string())
}

pub fn router() -> Router {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(docs_page))
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

async fn docs_page() -> Html<&'static str> {
    Html(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>Hazardmap API Docs</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
      window.ui = SwaggerUIBundle({ url: '/api/openapi.json', dom_id: '#swagger-ui' });
    </script>
  </body>
</html>
"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let spec: serde_json::Value = serde_json::from_str(&generate_spec()).unwrap();
        let paths = spec["paths"].as_object().unwrap();
        for path in [
            "/api/events",
            "/api/events/{id}",
            "/api/events/media/{file_id}",
            "/api/health",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
        assert!(spec["components"]["schemas"]["Event"].is_object());
    }
}
