use super::found;
use crate::{
    landing::HandoverState,
    protocol::{create_outbound_url, create_outbound_url_direct},
};
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OutboundParams {
    /// URL the user should land on once authenticated
    r: String,
    /// Skip the outbound hop and go straight to the cookie handover
    #[serde(default)]
    direct: bool,
}

#[utoipa::path(
    get,
    path= "/outbound",
    params(OutboundParams),
    responses (
        (status = 302, description = "First hop of a new handover"),
        (status = 400, description = "Missing target", body = String),
    ),
    tag= "handover"
)]
// axum handler that starts a handover towards `r`
#[instrument(skip_all)]
pub async fn outbound(
    state: Extension<Arc<HandoverState>>,
    Query(params): Query<OutboundParams>,
) -> Response {
    if params.r.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing target".to_string()).into_response();
    }

    let url = if params.direct {
        create_outbound_url_direct(
            &state.endpoints().cookie_handover_url,
            state.handover_url(),
            &params.r,
        )
    } else {
        create_outbound_url(state.handover_url(), &params.r)
    };

    debug!("starting handover, direct: {}", params.direct);

    found(&url)
}
