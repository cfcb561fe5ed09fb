use std::sync::LazyLock;

use crate::{error::Result, generator::LockSnowflakeGenerator, id::SnowflakeId};

static DEFAULT_GENERATOR: LazyLock<LockSnowflakeGenerator> =
    LazyLock::new(LockSnowflakeGenerator::default);

/// The process-wide generator behind [`next_id`]: worker 0, datacenter 0, on
/// the system clock.
///
/// Suitable for single-node deployments. Multi-node deployments need their own
/// `(worker_id, datacenter_id)` per node.
pub fn default_generator() -> &'static LockSnowflakeGenerator {
    &DEFAULT_GENERATOR
}

/// Generates an ID from the [`default_generator`].
///
/// # Errors
///
/// Same as [`LockSnowflakeGenerator::try_poll_id`].
///
/// # Example
/// ```
/// let a = snowmint::next_id().unwrap();
/// let b = snowmint::next_id().unwrap();
/// assert!(a < b);
/// assert_eq!((a.worker_id(), a.datacenter_id()), (0, 0));
/// ```
pub fn next_id() -> Result<SnowflakeId> {
    DEFAULT_GENERATOR.next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_generator_is_shared_and_increasing() {
        let mut last = next_id().unwrap();
        for _ in 0..10_000 {
            let id = default_generator().next().unwrap();
            assert!(id > last);
            assert_eq!(id.worker_id(), 0);
            assert_eq!(id.datacenter_id(), 0);
            last = id;
        }
    }
}
