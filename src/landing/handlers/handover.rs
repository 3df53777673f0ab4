use super::{error_response, found, task_failed};
use crate::{
    landing::{client::ClientId, HandoverState},
    protocol::next_hop,
};
use axum::{
    extract::Extension,
    http::{HeaderMap, Uri},
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, instrument};

#[utoipa::path(
    get,
    path= "/handover",
    params(
        ("stage" = String, Query, description = "Current handover stage"),
        ("r" = Option<String>, Query, description = "URL to resume at once the handover is over"),
        ("cc" = Option<String>, Query, description = "Cookie string relayed by the cookie handover"),
        ("cms-modern-token" = Option<String>, Query, description = "Bearer token relayed by the token handover"),
    ),
    responses (
        (status = 302, description = "Next hop of the handover, or its final target"),
        (status = 400, description = "Unknown stage or missing parameter", body = String),
        (status = 500, description = "Auth storage unavailable", body = String),
    ),
    tag= "handover"
)]
// axum handler for the landing page every hop returns to
#[instrument(skip_all)]
pub async fn handover(
    uri: Uri,
    headers: HeaderMap,
    state: Extension<Arc<HandoverState>>,
) -> Response {
    let client = ClientId::from_headers(&headers);
    let current = state.landing_url(uri.query());
    let endpoints = state.endpoints().clone();
    let store = state.store().scoped(&client.namespace());

    let response =
        match tokio::task::spawn_blocking(move || next_hop(&current, &endpoints, &store)).await {
            Ok(Ok(transition)) => {
                debug!(
                    "handover hop resolved, complete: {}",
                    transition.is_complete()
                );

                found(transition.url())
            }
            Ok(Err(err)) => error_response(&err),
            Err(err) => task_failed(&err),
        };

    client.attach(response)
}
