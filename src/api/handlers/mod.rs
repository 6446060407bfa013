//! HTTP request handlers for API endpoints.

pub mod expand;
pub mod health;
pub mod redirect;
pub mod shorten;

pub use expand::expand_handler;
pub use health::health_handler;
pub use redirect::redirect_handler;
pub use shorten::shorten_handler;
