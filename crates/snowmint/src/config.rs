//! Generator identity configuration.
//!
//! A deployment assigns every node a `(worker_id, datacenter_id)` pair out of
//! band. [`GeneratorConfig`] carries that pair, checks it against the 5-bit
//! fields of the ID layout, and builds generators from it. With the `serde`
//! feature it can be embedded directly in an application's own config file:
//!
//! ```toml
//! [ids]
//! worker_id = 7
//! datacenter_id = 2
//! ```

use crate::{
    error::{Error, IdentityField, Result},
    generator::{AtomicSnowflakeGenerator, LockSnowflakeGenerator},
    id::SnowflakeId,
    time::{SystemClock, TimeSource},
};

/// The static identity of one generator.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GeneratorConfig {
    /// Worker index within the datacenter, `0..=31`.
    pub worker_id: u8,
    /// Datacenter index, `0..=31`.
    pub datacenter_id: u8,
}

impl GeneratorConfig {
    /// Largest accepted worker ID.
    #[allow(clippy::cast_possible_truncation)]
    pub const MAX_WORKER_ID: u8 = SnowflakeId::MAX_WORKER_ID as u8;

    /// Largest accepted datacenter ID.
    #[allow(clippy::cast_possible_truncation)]
    pub const MAX_DATACENTER_ID: u8 = SnowflakeId::MAX_DATACENTER_ID as u8;

    /// Creates a configuration without checking it; see [`Self::validate`].
    pub const fn new(worker_id: u8, datacenter_id: u8) -> Self {
        Self {
            worker_id,
            datacenter_id,
        }
    }

    /// Checks both IDs fit their 5-bit fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] naming the first field out of
    /// range, worker ID first.
    ///
    /// ```
    /// use snowmint::{Error, GeneratorConfig, IdentityField};
    ///
    /// assert!(GeneratorConfig::new(31, 31).validate().is_ok());
    /// assert_eq!(
    ///     GeneratorConfig::new(0, 40).validate(),
    ///     Err(Error::InvalidConfiguration {
    ///         field: IdentityField::DatacenterId,
    ///         value: 40,
    ///         max: 31,
    ///     })
    /// );
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.worker_id > Self::MAX_WORKER_ID {
            return Err(Self::rejected(
                IdentityField::WorkerId,
                self.worker_id,
                Self::MAX_WORKER_ID,
            ));
        }
        if self.datacenter_id > Self::MAX_DATACENTER_ID {
            return Err(Self::rejected(
                IdentityField::DatacenterId,
                self.datacenter_id,
                Self::MAX_DATACENTER_ID,
            ));
        }
        Ok(())
    }

    /// Builds a lock-based generator on the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the configuration is out of
    /// range.
    pub fn build(self) -> Result<LockSnowflakeGenerator<SystemClock>> {
        self.build_with_time(SystemClock)
    }

    /// Builds a lock-based generator on the given time source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the configuration is out of
    /// range.
    pub fn build_with_time<T: TimeSource>(self, time: T) -> Result<LockSnowflakeGenerator<T>> {
        LockSnowflakeGenerator::with_time(self.worker_id, self.datacenter_id, time)
    }

    /// Builds a lock-free generator on the given time source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the configuration is out of
    /// range.
    pub fn build_atomic<T: TimeSource>(self, time: T) -> Result<AtomicSnowflakeGenerator<T>> {
        AtomicSnowflakeGenerator::with_time(self.worker_id, self.datacenter_id, time)
    }

    #[cold]
    fn rejected(field: IdentityField, value: u8, max: u8) -> Error {
        #[cfg(feature = "tracing")]
        tracing::error!(%field, value, max, "rejected generator identity");
        Error::InvalidConfiguration { field, value, max }
    }
}
