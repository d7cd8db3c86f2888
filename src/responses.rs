use crate::{error::Result, storage::Listing};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// 404 page for a key the bucket does not hold.
pub fn object_not_found(key: &str) -> Response {
    let body = format!(
        "<html><body>Object \"<b>{}</b>\" not found</body></html>",
        escape_html(key)
    );

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/html; charset=UTF-8")
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::NOT_FOUND.into_response())
}

pub fn listing_json(listing: &Listing) -> Result<Response> {
    let json = serde_json::to_vec(listing)?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json; charset=UTF-8")
        .body(Body::from(json))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}

/// Status-only response with an empty body.
pub fn empty(status: StatusCode) -> Response {
    status.into_response()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
