//! HTTP middleware and request extractors.
//!
//! # Layer order (outermost first)
//!
//! 1. Sentry (`NewSentryLayer`, `SentryHttpLayer`), added by the binary
//! 2. `TraceLayer` with method, URI, request ID, status and latency on the span
//! 3. Request ID
//! 4. Security headers
//! 5. Session layer (tower-sessions, `PostgreSQL` store in production)
//!
//! Authentication is enforced per handler with the extractors in [`auth`].

pub mod auth;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalUser, RequireStaff, RequireUser, clear_current_user, ensure, set_current_user,
};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer, read_session, write_session};
