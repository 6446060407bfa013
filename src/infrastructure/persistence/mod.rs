//! PostgreSQL backend.
//!
//! Queries are built at runtime with SQLx; the schema lives in `migrations/`.

pub mod pg_storage;

pub use pg_storage::PgStorage;
