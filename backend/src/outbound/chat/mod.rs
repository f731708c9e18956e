//! Stream Chat adapter for the chat provider port.

mod dto;
mod stream_http_client;

pub use stream_http_client::{DEFAULT_STREAM_BASE_URL, StreamCredentials, StreamHttpClient};
