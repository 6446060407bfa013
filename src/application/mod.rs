//! Application layer: use cases on top of the storage contract.
//!
//! - [`services::link_service::LinkService`] - shortening and resolution

pub mod services;
