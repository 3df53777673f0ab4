//! Per-browser identity for the landing service.
//!
//! Every browser gets its own namespace of auth replicas, named by a ULID held
//! in an `HttpOnly` cookie. A request without a valid cookie is given a new
//! identity, so it can never read or overwrite another browser's record.

use axum::{
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    response::Response,
};
use tracing::debug;
use ulid::Ulid;

pub const CLIENT_COOKIE: &str = "handover_client";

const MAX_AGE_SECONDS: u32 = 400 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientId {
    id: Ulid,
    issued: bool,
}

impl ClientId {
    /// The identity carried by the request cookies, or a freshly issued one.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let existing = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == CLIENT_COOKIE)
            .and_then(|(_, value)| Ulid::from_string(value).ok());

        match existing {
            Some(id) => Self { id, issued: false },
            None => {
                let id = Ulid::new();
                debug!("issued client id {}", id);
                Self { id, issued: true }
            }
        }
    }

    #[must_use]
    pub fn namespace(&self) -> String {
        self.id.to_string()
    }

    #[must_use]
    pub fn is_issued(&self) -> bool {
        self.issued
    }

    /// Hand a freshly issued identity to the browser.
    #[must_use]
    pub fn attach(&self, mut response: Response) -> Response {
        if self.issued {
            let cookie = format!(
                "{CLIENT_COOKIE}={}; Path=/; Max-Age={MAX_AGE_SECONDS}; HttpOnly; Secure; SameSite=Lax",
                self.id
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }
        response
    }
}
