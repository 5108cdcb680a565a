//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay upstream headers to the caller
//! - Strip framing headers invalidated by buffering and re-emission
//! - Decide whether an upstream body is HTML to be rewritten
//! - Relabel rewritten HTML as UTF-8
//!
//! # Design Decisions
//! - Bodies are fully buffered, so framing headers are recomputed by hyper
//! - Repeated header names collapse to the last value, except `set-cookie`
//! - HTML detection is a substring match on `content-type`

use axum::http::{header, HeaderMap, HeaderValue};

/// Upstream headers never relayed to the caller.
pub const EXCLUDED_HEADERS: [&str; 4] = [
    "connection",
    "content-encoding",
    "transfer-encoding",
    "content-length",
];

/// Returns true if `name` belongs to the relay exclusion set.
pub fn is_excluded(name: &str) -> bool {
    EXCLUDED_HEADERS
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(name))
}

/// Copy every upstream header except the exclusion set.
pub fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if is_excluded(name.as_str()) {
            continue;
        }
        if name == header::SET_COOKIE {
            relayed.append(name.clone(), value.clone());
        } else {
            relayed.insert(name.clone(), value.clone());
        }
    }
    relayed
}

/// Returns true if the `content-type` header mentions `text/html`.
///
/// The match is a case-sensitive substring test so parameters such as
/// `; charset=utf-8` do not prevent it.
pub fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false)
}

/// Set the `charset` parameter of `content-type` to `utf-8`, adding it when
/// absent. Other parameters are kept in order.
pub fn set_utf8_charset(headers: &mut HeaderMap) {
    let Some(current) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return;
    };

    let mut params: Vec<&str> = current
        .split(';')
        .map(str::trim)
        .filter(|param| !param.is_empty())
        .filter(|param| {
            param
                .split_once('=')
                .map(|(key, _)| !key.trim().eq_ignore_ascii_case("charset"))
                .unwrap_or(true)
        })
        .collect();
    params.push("charset=utf-8");

    if let Ok(value) = HeaderValue::from_str(&params.join("; ")) {
        headers.insert(header::CONTENT_TYPE, value);
    }
}
