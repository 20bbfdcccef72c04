//! Hosted store client.
//!
//! This crate is the single source of truth for the store wire contract:
//! PostgREST-style record queries under `/rest/v1`, remote procedures under
//! `/functions/v1`, and the locally saved credentials that authorize both.
//!
//! Blocking reqwest, no Tokio runtime. No retries.

mod auth;
mod client;
mod error;
mod query;
mod source;

pub use auth::{
    auth_file_path, delete_auth, load_auth, load_auth_from, save_auth, save_auth_to,
    AuthCredentials,
};
pub use client::StoreClient;
pub use error::StoreError;
pub use query::{Filter, Query};
