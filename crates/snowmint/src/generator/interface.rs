use crate::{
    config::GeneratorConfig,
    error::Result,
    generator::Poll,
    id::SnowflakeId,
    time::TimeSource,
};

/// A minimal interface for generating worker/datacenter Snowflake IDs.
pub trait SnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new generator reading time from `time`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfiguration`] if either ID is greater
    /// than 31.
    fn with_time(worker_id: u8, datacenter_id: u8, time: T) -> Result<Self>
    where
        Self: Sized;

    /// Creates a new generator from a validated [`GeneratorConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfiguration`] if the configuration
    /// is out of range.
    fn from_config(config: GeneratorConfig, time: T) -> Result<Self>
    where
        Self: Sized,
    {
        Self::with_time(config.worker_id, config.datacenter_id, time)
    }

    /// The worker ID packed into every ID.
    fn worker_id(&self) -> u64;

    /// The datacenter ID packed into every ID.
    fn datacenter_id(&self) -> u64;

    /// Attempts to generate the next available ID without waiting.
    ///
    /// The returned [`Poll`] contains either:
    /// - the newly generated ID, or
    /// - a duration to yield/sleep if the sequence is exhausted.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::ClockRegression`] if the clock is behind the last
    ///   issued ID.
    /// - [`crate::Error::LockPoisoned`] if a std-mutex generator's lock is
    ///   poisoned.
    fn try_poll_id(&self) -> Result<Poll>;

    /// Generates the next ID, calling `f` with the backoff hint whenever the
    /// generator is pending.
    ///
    /// `f` runs without holding any generator lock, so other callers are not
    /// serialized behind the wait.
    ///
    /// # Errors
    ///
    /// Same as [`Self::try_poll_id`]. A clock regression is returned
    /// immediately, never waited out.
    fn try_next_id(&self, mut f: impl FnMut(u64)) -> Result<SnowflakeId> {
        loop {
            match self.try_poll_id()? {
                Poll::Ready { id } => break Ok(id),
                Poll::Pending { yield_for } => f(yield_for),
            }
        }
    }

    /// Generates the next ID, busy-polling the clock while the current
    /// millisecond is exhausted.
    ///
    /// # Errors
    ///
    /// Same as [`Self::try_poll_id`].
    fn next(&self) -> Result<SnowflakeId> {
        self.try_next_id(|_| core::hint::spin_loop())
    }
}
