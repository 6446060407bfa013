//! Helpers with no storage or HTTP dependencies.
//!
//! - [`id_generator`] - Snowflake identifiers and base-62 short ids
//! - [`url_validator`] - validation of URLs submitted for shortening

pub mod id_generator;
pub mod url_validator;
