//! REST layer: an HTTP execution seam plus typed wrappers per endpoint group
//!
//! Responses stay untyped `serde_json::Value`; see `tavo_shared::types`
//! for the pagination and error wrappers when a caller wants structure.

mod client;
pub mod endpoints;
pub mod executor;
mod query;

pub use client::TavoClient;
pub use executor::{FilePart, HttpExecutor, Method, MultipartBody, ReqwestExecutor};
