//! This module contains a bunch of small inline modules to make it possible to
//! easily filter out individual log messages with our filter system, e.g.
//! `filters."groupgate::http::log::headers" = "off"`.

use super::Request;
use crate::prelude::*;

pub(crate) mod req {
    use super::*;

    pub(crate) fn log<B>(req: &Request<B>) {
        trace!(
            method = ?req.method(),
            path = req.uri().path_and_query().map_or("", |pq| pq.as_str()),
            "Incoming HTTP request",
        );
    }
}

pub(crate) mod headers {
    use hyper::HeaderMap;

    use super::*;

    const REDACTED: &str = "<redacted>";

    /// Logs all request headers, except for the value of `secret_header`,
    /// which carries the service key.
    pub(crate) fn log<B>(req: &Request<B>, secret_header: &str) {
        if tracing::enabled!(tracing::Level::TRACE) {
            trace!("HTTP Headers: {}", format(req.headers(), secret_header));
        }
    }

    pub(super) fn format(headers: &HeaderMap, secret_header: &str) -> String {
        let mut out = String::new();
        for (name, value) in headers {
            use std::fmt::Write;
            let value = if name.as_str().eq_ignore_ascii_case(secret_header) {
                REDACTED.into()
            } else {
                String::from_utf8_lossy(value.as_bytes())
            };
            let _ = write!(out, "\n  {name}: {value}");
        }
        out
    }
}


#[cfg(test)]
mod tests {
    use hyper::{header::HeaderValue, HeaderMap};

    use super::headers;

    #[test]
    fn service_key_is_redacted() {
        let mut map = HeaderMap::new();
        map.insert("x-groupgate-service-key", HeaderValue::from_static("super-secret"));
        map.insert("on-behalf-of-django-groups", HeaderValue::from_static("staff"));

        let out = headers::format(&map, "X-GroupGate-Service-Key");
        assert!(!out.contains("super-secret"));
        assert!(out.contains("x-groupgate-service-key: <redacted>"));
        assert!(out.contains("on-behalf-of-django-groups: staff"));
    }
}
