//! Core domain entities.
//!
//! The service has a single entity, [`ShortLink`], mapping a short identifier to
//! the original URL. Every storage backend keeps that mapping bidirectional: one
//! id per URL and one URL per id.

pub mod short_link;

pub use short_link::ShortLink;
