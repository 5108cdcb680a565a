//! HTML reference rewriting.
//!
//! # Responsibilities
//! - Redirect navigable/loadable references through the proxy endpoint
//! - Drop `<base>` elements so relative resolution cannot bypass the rewrite
//! - Never fail the surrounding request; a bad reference is left as-is
//!
//! # Rewrite Target Table
//! ```text
//! a                        → href
//! form                     → action   (+ method="GET" if absent)
//! img                      → src
//! link[rel="stylesheet"]   → href, else src
//! script                   → href, else src
//! ```
//!
//! Proxied references look like `<proxy-path>?url=<percent-encoded absolute URL>`.
//! References that are already proxied are not recognized, so rewriting a
//! rewritten document encodes them a second time.

use std::cell::Cell;

use lol_html::errors::AttributeNameError;
use lol_html::html_content::Element;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use url::Url;

use crate::observability::metrics;

/// Characters left unescaped in the `url` query value: the URI-component
/// unreserved set (`A-Z a-z 0-9 - _ . ! ~ * ' ( )`).
const URL_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Values with this prefix carry no remote resource.
const DATA_URI_PREFIX: &str = "data:";

/// One row of the rewrite table.
#[derive(Debug, Clone, Copy)]
pub struct RewriteTarget {
    /// CSS selector matching the element.
    pub selector: &'static str,
    /// Candidate attributes in priority order; the first one present is rewritten.
    pub attributes: &'static [&'static str],
    /// `method` value written when the element has none and its reference was rewritten.
    pub default_method: Option<&'static str>,
}

impl RewriteTarget {
    /// The attribute to rewrite on `el`, if any candidate is present.
    fn pick_attribute(&self, el: &Element) -> Option<&'static str> {
        self.attributes.iter().copied().find(|name| el.has_attribute(name))
    }
}

pub const REWRITE_TARGETS: &[RewriteTarget] = &[
    RewriteTarget { selector: "a", attributes: &["href"], default_method: None },
    RewriteTarget { selector: "form", attributes: &["action"], default_method: Some("GET") },
    RewriteTarget { selector: "img", attributes: &["src"], default_method: None },
    RewriteTarget {
        selector: r#"link[rel="stylesheet"]"#,
        attributes: &["href", "src"],
        default_method: None,
    },
    RewriteTarget { selector: "script", attributes: &["href", "src"], default_method: None },
];

/// A reference that could not be turned into a proxied reference.
///
/// Always recovered inside this module; the element keeps its original value.
#[derive(Debug, Error)]
pub enum RewriteReferenceError {
    #[error("cannot resolve reference {value:?}: {source}")]
    Unresolvable {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Resolve `value` against `base` and wrap it as a proxied reference.
pub fn proxied_reference(
    value: &str,
    base: &Url,
    proxy_path: &str,
) -> Result<String, RewriteReferenceError> {
    let resolved = base
        .join(value)
        .map_err(|source| RewriteReferenceError::Unresolvable {
            value: value.to_string(),
            source,
        })?;

    Ok(format!(
        "{proxy_path}?url={}",
        utf8_percent_encode(resolved.as_str(), URL_COMPONENT)
    ))
}

enum Outcome {
    Rewritten,
    Untouched,
    Failed(RewriteReferenceError),
}

fn rewrite_element(
    el: &mut Element,
    target: &RewriteTarget,
    base: &Url,
    proxy_path: &str,
) -> Result<Outcome, AttributeNameError> {
    let Some(name) = target.pick_attribute(el) else {
        return Ok(Outcome::Untouched);
    };
    let Some(raw) = el.get_attribute(name) else {
        return Ok(Outcome::Untouched);
    };

    let value = html_escape::decode_html_entities(&raw);
    // The URL parser ignores surrounding whitespace, so the prefix test must too.
    if value.trim_matches(|c: char| c.is_ascii_whitespace()).starts_with(DATA_URI_PREFIX) {
        return Ok(Outcome::Untouched);
    }

    let proxied = match proxied_reference(&value, base, proxy_path) {
        Ok(proxied) => proxied,
        Err(err) => return Ok(Outcome::Failed(err)),
    };
    el.set_attribute(name, &proxied)?;

    if let Some(method) = target.default_method {
        if !el.has_attribute("method") {
            el.set_attribute("method", method)?;
        }
    }

    Ok(Outcome::Rewritten)
}

/// Rewrite every reference listed in [`REWRITE_TARGETS`] so it points back at
/// `proxy_path`, resolving relative values against `base`, and remove all
/// `<base>` elements.
///
/// Malformed markup is tolerated. If the document cannot be processed at all
/// the input is returned unchanged.
pub fn rewrite_html(html: &str, base: &Url, proxy_path: &str) -> String {
    let rewritten = &Cell::new(0usize);
    let failed = &Cell::new(0usize);

    let mut element_content_handlers: Vec<_> = REWRITE_TARGETS
        .iter()
        .map(|target| {
            element!(target.selector, move |el| {
                match rewrite_element(el, target, base, proxy_path)? {
                    Outcome::Rewritten => rewritten.set(rewritten.get() + 1),
                    Outcome::Untouched => {}
                    Outcome::Failed(err) => {
                        tracing::debug!(error = %err, "Leaving reference unchanged");
                        failed.set(failed.get() + 1);
                    }
                }
                Ok(())
            })
        })
        .collect();

    element_content_handlers.push(element!("base", |el| {
        el.remove();
        Ok(())
    }));

    let output = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers,
            ..RewriteStrSettings::new()
        },
    );

    match output {
        Ok(output) => {
            metrics::record_rewrite(rewritten.get(), failed.get());
            output
        }
        Err(err) => {
            tracing::warn!(base = %base, error = %err, "HTML rewrite failed, returning document unchanged");
            html.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::percent_decode_str;

    fn base() -> Url {
        Url::parse("http://example.com/page").unwrap()
    }

    fn rewrite(html: &str) -> String {
        rewrite_html(html, &base(), "/proxy")
    }

    #[test]
    fn test_anchor_rewritten() {
        let out = rewrite(r#"<html><body><a href="/about">About</a></body></html>"#);
        assert_eq!(
            out,
            r#"<html><body><a href="/proxy?url=http%3A%2F%2Fexample.com%2Fabout">About</a></body></html>"#
        );
    }

    #[test]
    fn test_every_target_kind() {
        let out = rewrite(concat!(
            r#"<img src="img/logo.png">"#,
            r#"<link rel="stylesheet" href="https://cdn.example.net/site.css">"#,
            r#"<script src="app.js"></script>"#,
            r#"<form action="/search" method="post"></form>"#,
        ));

        assert!(out.contains(r#"<img src="/proxy?url=http%3A%2F%2Fexample.com%2Fimg%2Flogo.png">"#));
        assert!(out.contains(r#"href="/proxy?url=https%3A%2F%2Fcdn.example.net%2Fsite.css""#));
        assert!(out.contains(r#"<script src="/proxy?url=http%3A%2F%2Fexample.com%2Fapp.js"></script>"#));
        assert!(out.contains(r#"action="/proxy?url=http%3A%2F%2Fexample.com%2Fsearch""#));
        assert!(out.contains(r#"method="post""#));
    }

    #[test]
    fn test_form_without_method_gets_get() {
        let out = rewrite(r#"<form action="/q"><input name="q"></form>"#);
        assert!(out.contains(r#"method="GET""#));
    }

    #[test]
    fn test_form_without_action_untouched() {
        let html = r#"<form><input name="q"></form>"#;
        assert_eq!(rewrite(html), html);
    }

    #[test]
    fn test_script_prefers_href_over_src() {
        let out = rewrite(r#"<script href="/a.js" src="/b.js"></script>"#);
        assert!(out.contains(r#"href="/proxy?url=http%3A%2F%2Fexample.com%2Fa.js""#));
        assert!(out.contains(r#"src="/b.js""#));
    }

    #[test]
    fn test_non_stylesheet_link_untouched() {
        let html = r#"<link rel="icon" href="/favicon.ico">"#;
        assert_eq!(rewrite(html), html);
    }

    #[test]
    fn test_data_uri_untouched() {
        let html = r#"<img src="data:image/png;base64,AAAA">"#;
        assert_eq!(rewrite(html), html);
    }

    #[test]
    fn test_data_uri_with_surrounding_whitespace_untouched() {
        for html in [
            r#"<a href=" data:text/html,hi">x</a>"#,
            "<img src=\"\n\tdata:image/png;base64,AAAA \">",
        ] {
            assert_eq!(rewrite(html), html);
        }
    }

    #[test]
    fn test_unresolvable_reference_left_alone() {
        let out = rewrite(r#"<a href="http://[::1">bad</a><a href="/ok">ok</a>"#);
        assert!(out.contains(r#"<a href="http://[::1">bad</a>"#));
        assert!(out.contains(r#"<a href="/proxy?url=http%3A%2F%2Fexample.com%2Fok">ok</a>"#));
    }

    #[test]
    fn test_base_elements_removed() {
        let out = rewrite(r#"<html><head><base href="http://evil.example/"><BASE target="_blank"></head><body></body></html>"#);
        assert!(!out.to_ascii_lowercase().contains("<base"));
        assert_eq!(out, "<html><head></head><body></body></html>");
    }

    #[test]
    fn test_entities_decoded_before_resolution() {
        let out = rewrite(r#"<a href="/search?a=1&amp;b=2">s</a>"#);
        let value = out
            .split("url=")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap();
        assert_eq!(
            percent_decode_str(value).decode_utf8().unwrap(),
            "http://example.com/search?a=1&b=2"
        );
    }

    #[test]
    fn test_decoded_value_matches_direct_resolution() {
        let base = Url::parse("https://news.example.org/a/b/index.html?x=1").unwrap();
        for reference in ["../c.html", "?page=2", "#top", "//other.example/x", "img (1).png", "日本語"] {
            let proxied = proxied_reference(reference, &base, "/proxy").unwrap();
            let encoded = proxied.strip_prefix("/proxy?url=").unwrap();
            let decoded = percent_decode_str(encoded).decode_utf8().unwrap();
            assert_eq!(decoded, base.join(reference).unwrap().as_str());
        }
    }

    #[test]
    fn test_custom_proxy_path() {
        let out = rewrite_html(r#"<a href="x">x</a>"#, &base(), "/fetch");
        assert!(out.contains(r#"href="/fetch?url=http%3A%2F%2Fexample.com%2Fx""#));
    }

    #[test]
    fn test_malformed_markup_tolerated() {
        let out = rewrite(r#"<div><a href="/x">unclosed <img src="/y.png"><p></div></span>"#);
        assert!(out.contains("url=http%3A%2F%2Fexample.com%2Fx"));
        assert!(out.contains("url=http%3A%2F%2Fexample.com%2Fy.png"));
    }

    #[test]
    fn test_second_pass_double_encodes() {
        let once = rewrite(r#"<a href="/about">About</a>"#);
        let twice = rewrite(&once);
        assert_ne!(once, twice);
        assert!(twice.contains("url=http%3A%2F%2Fexample.com%2Fproxy%3Furl%3Dhttp%253A%252F%252Fexample.com%252Fabout"));
    }
}
