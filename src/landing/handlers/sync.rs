use super::task_failed;
use crate::landing::{client::ClientId, HandoverState};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SyncRequest {
    /// URL of the page the user is currently on
    pub url: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SyncResponse {
    /// Application whose record was copied to every replica, if any
    pub source: Option<String>,
}

#[utoipa::path(
    post,
    path= "/sync",
    request_body = SyncRequest,
    responses (
        (status = 200, description = "Replicas synchronized from the active application, or left alone", body = SyncResponse),
        (status = 400, description = "Missing payload or invalid URL", body = String),
    ),
    tag= "sync"
)]
// axum handler for opportunistic replica sync on page load
#[instrument(skip_all)]
pub async fn sync(
    headers: HeaderMap,
    state: Extension<Arc<HandoverState>>,
    payload: Option<Json<SyncRequest>>,
) -> Response {
    let request: SyncRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let Ok(url) = Url::parse(&request.url) else {
        return (StatusCode::BAD_REQUEST, "Invalid URL".to_string()).into_response();
    };

    let client = ClientId::from_headers(&headers);
    let store = state.store().scoped(&client.namespace());

    let response = match tokio::task::spawn_blocking(move || store.sync_os_auth(&url)).await {
        Ok(outcome) => {
            debug!("sync outcome: {:?}", outcome);

            Json(SyncResponse {
                source: outcome.source().map(str::to_string),
            })
            .into_response()
        }
        Err(err) => task_failed(&err),
    };

    client.attach(response)
}
