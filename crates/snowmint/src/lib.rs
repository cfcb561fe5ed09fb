//! Worker/datacenter Snowflake IDs.
//!
//! Every ID is a non-negative `i64` packing, from most to least significant,
//! a reserved zero bit, 41 bits of milliseconds since [`EPOCH`], a 5-bit
//! datacenter ID, a 5-bit worker ID and a 12-bit per-millisecond sequence.
//! Nodes never coordinate: uniqueness across a deployment comes from giving
//! each node its own `(worker_id, datacenter_id)` pair.
//!
//! ```
//! use snowmint::GeneratorConfig;
//!
//! let generator = GeneratorConfig::new(7, 2).build().unwrap();
//! let id = generator.next().unwrap();
//! assert_eq!(id.worker_id(), 7);
//! assert_eq!(id.datacenter_id(), 2);
//! ```
//!
//! ## Failure modes
//!
//! - Out-of-range IDs are rejected at construction with
//!   [`Error::InvalidConfiguration`].
//! - A clock that moves behind the last issued ID makes generation fail with
//!   [`Error::ClockRegression`] until it catches up. The generator never
//!   waits this out on its own.
//! - More than 4096 IDs in one millisecond is a capacity limit, not an error:
//!   callers back off until the next millisecond.
//!
//! ## Features
//!
//! - `parking-lot`: use `parking_lot::Mutex` (no lock poisoning).
//! - `cache-padded`: pad generator state to a cache line.
//! - `tracing`: trace spans on generation, warnings on clock regression.
//! - `serde`: serialize IDs and deserialize [`GeneratorConfig`].
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod error;
mod generator;
mod global;
mod id;
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
#[cfg(feature = "serde")]
pub mod serde;
mod time;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::global::*;
pub use crate::id::*;
pub use crate::time::*;
