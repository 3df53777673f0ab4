//! # Authentication handover
//!
//! Relays a session cookie string and a bearer token across domains that
//! share no storage, using nothing but redirects. The state of a handover
//! travels in the query string of each hop:
//!
//! ```text
//! os-outbound ─► os-cookie-return ─┬─► target                     (cache is current)
//!                                  └─► os-token-return ─► target  (record written)
//! os-forced-auth-return                                           (self round trip)
//! ```
//!
//! - **Cookie handover:** an endpoint on the domain that owns the session
//!   cookie reads it and appends it as `cc` to the nested `r` URL.
//! - **Token handover:** an endpoint that exchanges `cc` for a bearer token and
//!   appends it as `cms-modern-token`.
//! - **Replicas:** each consuming application reads its own storage keys, so
//!   the cached [`AuthRecord`] is written to every [`Replica`] at once.

mod cookies;
mod error;
mod machine;
mod outbound;
mod params;
mod stage;
mod storage;
mod store;
mod window;

pub use cookies::{are_all_cookie_strings_equal, normalize_cookie_string};
pub use error::{Error, StorageError};
pub use machine::{next_hop, HandoverEndpoints, Transition};
pub use outbound::{create_outbound_url, create_outbound_url_direct};
pub use params::{create_url_with_params, get_param, set_params, strip_params};
pub use stage::{Stage, COOKIES_PARAM, RETURN_PARAM, STAGE_PARAM, TOKEN_PARAM};
pub use storage::{FileStore, KeyValueStore, MemoryStore, ScopedStore};
pub use store::{
    valid_app_name, AuthRecord, AuthStore, Replica, ReplicaSet, SyncOutcome, DEFAULT_APPS,
};
pub use window::{
    handle_forced_redirect, handle_os_redirect, Navigation, RecordingWindow, Window,
};
