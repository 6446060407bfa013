//! Domain layer: the entity and the storage contract.
//!
//! Nothing here depends on Redis, PostgreSQL or HTTP. Backends in
//! [`crate::infrastructure`] implement [`storage::UrlStorage`]; the application
//! layer talks only to the trait.
//!
//! - [`entities`] - [`entities::ShortLink`]
//! - [`storage`] - [`storage::UrlStorage`] and [`storage::StorageError`]
//! - [`storage_type`] - backend selector parsed from configuration

pub mod entities;
pub mod storage;
pub mod storage_type;

pub use storage::{StorageError, StorageResult, UrlStorage};
pub use storage_type::StorageType;

#[cfg(test)]
pub use storage::MockUrlStorage;
