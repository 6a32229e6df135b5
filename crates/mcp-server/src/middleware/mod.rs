//! HTTP middleware shared by the tool server and the agent backend.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added in `main`)
//! 2. `TraceLayer` (`http_request` span with status and latency)
//! 3. Request ID (records `request_id` on the span)
//! 4. Security headers
//! 5. Token validation (tool routes only)

pub mod request_id;
pub mod security_headers;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
