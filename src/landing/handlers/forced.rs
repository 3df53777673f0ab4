use super::found;
use crate::{
    landing::HandoverState,
    protocol::{handle_forced_redirect, Navigation, RecordingWindow},
};
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, instrument};
use url::Url;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ForcedParams {
    /// Absolute URL of the page asking for a fresh handover
    r: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForcedResponse {
    /// Page URL with the stage removed, for `history.replaceState`
    pub url: String,
}

#[utoipa::path(
    get,
    path= "/forced",
    params(ForcedParams),
    responses (
        (status = 302, description = "Forced handover started"),
        (status = 200, description = "Forced handover finished", body = ForcedResponse),
        (status = 400, description = "Invalid page URL", body = String),
    ),
    tag= "handover"
)]
// axum handler for the forced refresh round trip
#[instrument(skip_all)]
pub async fn forced(
    state: Extension<Arc<HandoverState>>,
    Query(params): Query<ForcedParams>,
) -> Response {
    let page = match Url::parse(&params.r) {
        Ok(page) => page,
        Err(err) => {
            error!("Invalid page URL: {}", err);

            return (StatusCode::BAD_REQUEST, format!("Invalid page URL: {err}")).into_response();
        }
    };

    let mut window = RecordingWindow::new(page);
    handle_forced_redirect(&mut window, state.handover_url());

    match window.last_navigation() {
        Some(Navigation::Replace(url)) => found(url),
        Some(Navigation::ReplaceState(url)) => (
            StatusCode::OK,
            Json(ForcedResponse {
                url: url.to_string(),
            }),
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
