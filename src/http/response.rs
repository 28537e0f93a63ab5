use hyper::{
    header::{HeaderValue, CONTENT_TYPE},
    StatusCode,
};

use super::{Body, Response};


const TEXT_PLAIN: &str = "text/plain; charset=UTF-8";
const APPLICATION_JSON: &str = "application/json";

fn with_status(status: StatusCode, content_type: &'static str, body: impl Into<Body>) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

pub(crate) fn text(status: StatusCode, body: &'static str) -> Response {
    with_status(status, TEXT_PLAIN, body)
}

pub(crate) fn json(value: &serde_json::Value) -> Response {
    with_status(StatusCode::OK, APPLICATION_JSON, value.to_string())
}

pub(crate) fn not_found() -> Response {
    text(StatusCode::NOT_FOUND, "404 Not found")
}

pub(crate) fn method_not_allowed() -> Response {
    text(StatusCode::METHOD_NOT_ALLOWED, "405 Method not allowed")
}

pub(crate) fn internal_server_error() -> Response {
    text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}
