use hyper::{
    header::{HeaderName, HeaderValue},
    HeaderMap, Method, StatusCode,
};

use crate::{
    auth::{Caller, Credentials, HttpRequest, Principal},
    prelude::*,
};
use super::{log, response, Context, Request, Response};


/// Response header listing the resolved principals, for proxies that want to
/// forward them without parsing the body.
pub(super) const PRINCIPALS_HEADER: HeaderName = HeaderName::from_static("x-groupgate-principals");


/// This is the main HTTP entry point, called for each incoming request.
pub(super) async fn handle<B>(req: Request<B>, ctx: &Context) -> Response {
    log::req::log(&req);
    if ctx.config.log.log_http_headers {
        log::headers::log(&req, &ctx.config.container.key_header);
    }

    let method = req.method();
    let path = req.uri().path().trim_end_matches('/');

    match path {
        // We only support GET and HEAD requests.
        _ if method != Method::GET && method != Method::HEAD => response::method_not_allowed(),

        "/~principals" => handle_principals(req.headers(), ctx),
        "/~health" => response::text(StatusCode::OK, "ok"),

        _ => {
            debug!("Responding with 404 to {:?} '{}'", method, path);
            response::not_found()
        }
    }
}

/// Authenticates the caller and replies with the principals resolved from
/// the groups header. Ineligible requests simply get an empty list.
fn handle_principals(headers: &HeaderMap, ctx: &Context) -> Response {
    let caller = Caller::from_headers(headers, &ctx.config.container);
    let request = HttpRequest::new(headers, &caller);
    let principals = ctx.authorizer.resolve_principals(Credentials::Http(Some(&request)));
    debug!(
        caller = %caller.debug_log_name(),
        count = principals.len(),
        "Resolved principals for request",
    );

    let mut out = response::json(&serde_json::json!({ "principals": principals }));

    let joined = principals.iter()
        .map(Principal::name)
        .collect::<Vec<_>>()
        .join(ctx.authorizer.mapping().separator());
    match HeaderValue::from_bytes(joined.as_bytes()) {
        Ok(value) => {
            out.headers_mut().insert(PRINCIPALS_HEADER, value);
        }
        Err(e) => warn!("could not put principals into '{PRINCIPALS_HEADER}' header: {e}"),
    }

    out
}
