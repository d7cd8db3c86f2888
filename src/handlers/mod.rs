//! Request dispatch: one fallback handler maps every method and path onto a
//! single store call.

pub mod object;
pub mod root;

use crate::{
    error::{Error, Result},
    responses,
    server::AppState,
};
use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::Response,
};
use std::sync::Arc;
use tracing::info;

pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response> {
    let key = object_key(&uri);
    info!("{} object {}: {}", method, key, uri);

    match method {
        Method::GET | Method::HEAD if key.is_empty() => {
            // A listing has no HEAD representation.
            if method == Method::HEAD {
                return Ok(responses::empty(StatusCode::BAD_REQUEST));
            }
            root::list_objects(&state, &uri).await
        }
        Method::GET => object::get_object(&state, &key, headers).await,
        Method::HEAD => object::head_object(&state, &key).await,
        _ => Err(Error::UnsupportedMethod),
    }
}

/// The object key addressed by a request: its path without the leading slash,
/// exactly as it appears on the wire. Percent escapes are part of the key.
pub fn object_key(uri: &Uri) -> String {
    let path = uri.path();
    path.strip_prefix('/').unwrap_or(path).to_string()
}
