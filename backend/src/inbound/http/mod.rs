//! HTTP inbound adapter exposing REST endpoints.

pub mod accounts;
pub mod auth;
pub mod dashboard;
pub mod donations;
pub mod error;
pub mod health;
pub mod products;
pub mod state;
pub mod stream;
pub mod users;

use actix_web::web;

pub use error::ApiResult;

/// Register every `/api` resource together with the extractor configs that
/// render malformed input in the shared error envelope.
///
/// Health probes and the fallback route are mounted by the server.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use prakriti_backend::inbound::http;
///
/// let app = App::new().configure(http::configure);
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
        .app_data(web::PathConfig::default().error_handler(error::path_error_handler))
        .configure(accounts::configure)
        .configure(products::configure)
        .configure(donations::configure)
        .configure(users::configure)
        .configure(stream::configure)
        .configure(dashboard::configure);
}
