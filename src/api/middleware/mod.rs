//! HTTP middleware: request ids, tracing and panic isolation.

pub mod panic;
pub mod request_id;
pub mod tracing;
