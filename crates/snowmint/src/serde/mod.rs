//! Serde adapters for [`SnowflakeId`](crate::SnowflakeId).
//!
//! [`SnowflakeId`](crate::SnowflakeId) serializes as its native `i64`. Use
//! [`as_string`] for consumers that can't hold 64-bit integers exactly, such
//! as JavaScript.

mod snowflake;

pub use snowflake::*;
