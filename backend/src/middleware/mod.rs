//! Request middleware.
//!
//! [`Trace`] tags every request with a trace id for logs and error payloads.
//! Bearer authentication is an extractor, see `inbound::http::auth`.

pub mod trace;

pub use trace::Trace;
