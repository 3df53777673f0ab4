//! # Handover
//!
//! Keeps several independently hosted applications on one authenticated
//! session. Each application caches the session cookie string and a derived
//! bearer token under its own storage keys; when a user moves between them,
//! a chain of redirects relays fresh credentials across domains that cannot
//! see each other's cookies or storage.
//!
//! - [`protocol`] holds the redirect state machine, the replicated auth
//!   store, and the entry points that start a handover.
//! - [`landing`] serves the landing page every hop returns to, plus the
//!   outbound, forced refresh and sync entry points, over HTTP.
//! - [`cli`] wires configuration and logging for the `handover` binary.

pub mod cli;
pub mod landing;
pub mod protocol;
