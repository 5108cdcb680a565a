//! Self-looping HTTP(S) proxy library.
//!
//! Fetches a remote resource for the caller and, when it is HTML, rewrites
//! links, form targets, images, stylesheets and scripts so that further
//! navigation keeps flowing through the proxy.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
