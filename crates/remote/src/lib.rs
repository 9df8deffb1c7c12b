//! REST client for the hosted leirad backend (PostgREST dialect).
//!
//! [`RestClient`] implements [`leirad_core::sync::RemoteClient`], so it can be
//! handed straight to the sync overlay.

mod client;
mod config;
mod error;

pub use client::RestClient;
pub use config::{RemoteConfig, API_KEY_ENV, API_URL_ENV, DEFAULT_TIMEOUT_SECS, TIMEOUT_ENV};
pub use error::{RemoteApiError, Result};
