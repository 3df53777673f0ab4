pub mod forced;
pub use self::forced::forced;

pub mod handover;
pub use self::handover::handover;

pub mod health;
pub use self::health::health;

pub mod outbound;
pub use self::outbound::outbound;

pub mod sync;
pub use self::sync::sync;

// common functions for the handlers
use crate::protocol::Error;
use axum::{
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::task::JoinError;
use tracing::error;
use url::Url;

/// `302 Found` pointing at `url`.
pub fn found(url: &Url) -> Response {
    (StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response()
}

/// Protocol violations are the caller's fault; storage failures are ours.
pub fn error_response(err: &Error) -> Response {
    match err {
        Error::Storage(storage) => {
            error!("Storage failure: {}", storage);

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Auth storage unavailable".to_string(),
            )
                .into_response()
        }
        _ => {
            error!("Handover rejected: {}", err);

            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
    }
}

/// The blocking task running a store call did not finish.
pub fn task_failed(err: &JoinError) -> Response {
    error!("Storage task failed: {}", err);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Auth storage unavailable".to_string(),
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::protocol::StorageError;

    #[test]
    fn found_sets_location() {
        let url = Url::parse("https://apps.test/x?y=1").unwrap();
        let response = found(&url);

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("https://apps.test/x?y=1")
        );
    }

    #[test]
    fn error_response_maps_status() {
        let response = error_response(&Error::UnknownStage(String::new()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = error_response(&Error::Storage(StorageError::Poisoned));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
