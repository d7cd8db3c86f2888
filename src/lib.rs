//! HTTP front for a single object-storage bucket.
//!
//! `GET /` lists the bucket as JSON, `GET /{key}` and `HEAD /{key}` read one
//! object with range and conditional-request support. There is no write path.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod range;
pub mod responses;
pub mod server;
pub mod storage;
pub mod utils;

pub use server::{build_app, AppState};
