//! Proxy core.
//!
//! # Data Flow
//! ```text
//! ?url=<target>
//!     → target.rs (presence, absolute URL, http/https only)
//!     → engine.rs (single GET, header relay, content-type dispatch)
//!         → rewrite.rs (text/html only: references → <proxy-path>?url=...)
//!     → response to caller
//! ```
//!
//! Every request is independent; nothing here holds state between requests.

pub mod engine;
pub mod rewrite;
pub mod target;

pub use engine::{Dispatch, Fetcher};
pub use rewrite::{proxied_reference, rewrite_html, REWRITE_TARGETS};
pub use target::validate_target;
