use super::handlers::{self, forced::ForcedResponse, health::Health, sync::SyncRequest, sync::SyncResponse};
use axum::response::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::handover::handover,
        handlers::outbound::outbound,
        handlers::forced::forced,
        handlers::sync::sync,
    ),
    components(schemas(Health, ForcedResponse, SyncRequest, SyncResponse)),
    tags(
        (name = "handover", description = "Cross-domain authentication handover"),
        (name = "sync", description = "Replica synchronization"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
