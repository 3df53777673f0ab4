use crate::protocol::{AuthStore, HandoverEndpoints};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

pub mod client;
pub mod handlers;
mod openapi;

pub use openapi::ApiDoc;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Path of the landing page every hop of the handover comes back to.
pub const HANDOVER_PATH: &str = "handover";

/// Shared state of the landing service.
#[derive(Debug, Clone)]
pub struct HandoverState {
    handover_url: Url,
    endpoints: HandoverEndpoints,
    store: AuthStore,
}

impl HandoverState {
    /// `public_url` is where this service is reachable from the browser; the
    /// landing page is resolved relative to it.
    ///
    /// # Errors
    /// Returns an error if the landing URL cannot be derived from `public_url`.
    pub fn new(public_url: &Url, endpoints: HandoverEndpoints, store: AuthStore) -> Result<Self> {
        let handover_url = public_url
            .join(HANDOVER_PATH)
            .with_context(|| format!("Invalid public URL: {public_url}"))?;

        Ok(Self {
            handover_url,
            endpoints,
            store,
        })
    }

    #[must_use]
    pub fn handover_url(&self) -> &Url {
        &self.handover_url
    }

    #[must_use]
    pub fn endpoints(&self) -> &HandoverEndpoints {
        &self.endpoints
    }

    #[must_use]
    pub fn store(&self) -> &AuthStore {
        &self.store
    }

    /// The landing URL as the browser sees it, carrying the request's query.
    #[must_use]
    pub fn landing_url(&self, query: Option<&str>) -> Url {
        let mut url = self.handover_url.clone();
        url.set_query(query);
        url
    }
}

/// Build the router with every landing route registered.
pub fn router(state: Arc<HandoverState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(&format!("/{HANDOVER_PATH}"), get(handlers::handover))
        .route("/outbound", get(handlers::outbound))
        .route("/forced", get(handlers::forced))
        .route("/sync", post(handlers::sync))
        .route("/openapi.json", get(openapi::openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, state: HandoverState) -> Result<()> {
    info!(
        "Landing page at {}, {} replicas",
        state.handover_url(),
        state.store().replicas().len()
    );

    let app = router(Arc::new(state));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
