//! Infrastructure layer: concrete [`UrlStorage`](crate::domain::UrlStorage) backends.
//!
//! # Modules
//!
//! - [`memory`] - process-local maps
//! - [`cache`] - Redis with expiring forward keys
//! - [`persistence`] - PostgreSQL
//! - [`combined`] - Redis in front of PostgreSQL
//! - [`factory`] - builds the backend selected by configuration

pub mod cache;
pub mod combined;
pub mod factory;
pub mod memory;
pub mod persistence;

pub use combined::CombinedStorage;
pub use factory::connect_storage;
pub use memory::MemoryStorage;
