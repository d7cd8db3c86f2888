use crate::{
    error::{Error, Result},
    range::{parse_range, ByteRange},
    responses::object_not_found,
    server::AppState,
    storage::{GetOptions, ObjectHead},
};
use anyhow::anyhow;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Fetches an object, honouring `Range` and any conditional headers.
///
/// Responds 200 with the full body, 206 with a ranged body, 304 when the store
/// withheld the body because the conditions failed, or 404.
pub async fn get_object(state: &AppState, key: &str, headers: HeaderMap) -> Result<Response> {
    let range_header = match headers.get(header::RANGE) {
        Some(value) => Some(value.to_str().map_err(|_| {
            Error::RangeFormat(String::from_utf8_lossy(value.as_bytes()).into_owned())
        })?),
        None => None,
    };
    let range = parse_range(range_header)?;

    let options = GetOptions {
        range,
        only_if: headers,
    };
    let Some(object) = state.store.get(key, &options).await? else {
        return Ok(object_not_found(key));
    };

    let mut response_headers = object_headers(&object.head)?;
    if let Some(range) = range {
        response_headers.insert(
            header::CONTENT_RANGE,
            HeaderValue::from_str(&content_range(&range, object.head.size))
                .map_err(|err| anyhow!("invalid content-range: {}", err))?,
        );
    }

    let (status, body) = match object.body {
        Some(body) if range.is_some() => (StatusCode::PARTIAL_CONTENT, body),
        Some(body) => (StatusCode::OK, body),
        None => {
            debug!("Body withheld for {}, responding not modified", key);
            return Ok(build_response(StatusCode::NOT_MODIFIED, response_headers, Body::empty()));
        }
    };

    let body = Body::from_stream(ReaderStream::new(body));
    Ok(build_response(status, response_headers, body))
}

/// Metadata-only lookup. No range or conditional handling.
pub async fn head_object(state: &AppState, key: &str) -> Result<Response> {
    let Some(head) = state.store.head(key).await? else {
        return Ok(object_not_found(key));
    };

    let headers = object_headers(&head)?;
    Ok(build_response(StatusCode::OK, headers, Body::empty()))
}

fn object_headers(head: &ObjectHead) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    head.write_http_metadata(&mut headers);
    headers.insert(
        header::ETAG,
        HeaderValue::from_str(&head.http_etag)
            .map_err(|err| anyhow!("invalid etag {:?}: {}", head.http_etag, err))?,
    );
    Ok(headers)
}

// The upper bound echoes the start offset, not the last byte of the range.
fn content_range(range: &ByteRange, size: u64) -> String {
    format!("bytes {}-{}/{}", range.offset, range.offset, size)
}

fn build_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
