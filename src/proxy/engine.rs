//! Upstream fetch and content-type dispatch.
//!
//! # Responsibilities
//! - Perform exactly one GET against the validated target
//! - Mirror the upstream status and (filtered) headers
//! - Rewrite HTML bodies (re-emitted as UTF-8), pass everything else through byte-for-byte
//!
//! # Design Decisions
//! - Single attempt, no retries; transport failures become `UpstreamUnreachable`
//! - Bounded connect and total timeouts on every fetch
//! - No connection reuse between requests
//! - Whole body is buffered before anything is sent back

use std::time::Duration;

use axum::body::Body;
use axum::response::Response;
use url::Url;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::response::{is_html, relay_headers, set_utf8_charset};
use crate::proxy::rewrite::rewrite_html;

/// How an upstream body was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Decoded as text and passed through the HTML rewriter.
    Html,
    /// Relayed unchanged.
    Passthrough,
}

impl Dispatch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dispatch::Html => "html",
            Dispatch::Passthrough => "passthrough",
        }
    }
}

/// Fetches targets and builds the response returned to the caller.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    proxy_path: String,
}

impl Fetcher {
    /// Build the upstream client from configuration.
    pub fn new(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if !config.proxy.system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .user_agent(config.proxy.user_agent.as_str())
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.upstream_secs))
            .redirect(reqwest::redirect::Policy::limited(config.proxy.max_redirects))
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            client,
            proxy_path: config.proxy.path.clone(),
        })
    }

    /// Fetch `target` and produce the caller-facing response.
    pub async fn fetch(&self, target: &Url) -> Result<(Response, Dispatch), ProxyError> {
        let upstream = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(|e| ProxyError::upstream(&e))?;

        let status = upstream.status();
        let mut headers = relay_headers(upstream.headers());
        let dispatch = if is_html(upstream.headers()) {
            Dispatch::Html
        } else {
            Dispatch::Passthrough
        };

        tracing::debug!(
            target = %target,
            status = %status,
            dispatch = dispatch.as_str(),
            "Upstream responded"
        );

        let body = match dispatch {
            Dispatch::Html => {
                let text = upstream.text().await.map_err(|e| ProxyError::upstream(&e))?;
                set_utf8_charset(&mut headers);
                Body::from(rewrite_html(&text, target, &self.proxy_path))
            }
            Dispatch::Passthrough => {
                let bytes = upstream.bytes().await.map_err(|e| ProxyError::upstream(&e))?;
                Body::from(bytes)
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok((response, dispatch))
    }
}
