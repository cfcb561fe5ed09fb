use core::cmp;

use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    config::GeneratorConfig,
    error::{Error, Result},
    generator::{Poll, SnowflakeGenerator},
    id::SnowflakeId,
    time::{EPOCH_MILLIS, SystemClock, TimeSource},
};

// Reserved bit, set in the state word until the first ID is issued.
const UNISSUED: u64 = 1 << 63;

/// A lock-free Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The last issued ID itself is the generator state: timestamp and sequence
/// are packed in one [`AtomicU64`] and advanced with a compare-and-swap. A
/// lost race surfaces as [`Poll::Pending`] with `yield_for == 0`, meaning
/// "retry immediately".
///
/// The state word is loaded before the clock is sampled, so a reading can
/// only fall behind it when the clock really moved backwards.
///
/// ## Features
/// - ✅ Thread-safe
/// - ❌ Fair access across threads
/// - ✅ Detects wall-clock regressions
///
/// ## Recommended When
/// - You're in a multi-threaded environment
/// - Fair access is sacrificed for higher throughput
///
/// ## See Also
/// - [`LockSnowflakeGenerator`]
///
/// [`LockSnowflakeGenerator`]: crate::LockSnowflakeGenerator
pub struct AtomicSnowflakeGenerator<T = SystemClock>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU64,
    time: T,
}

impl AtomicSnowflakeGenerator<SystemClock> {
    /// Creates a new generator on the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `worker_id` or
    /// `datacenter_id` is greater than 31.
    ///
    /// # Example
    /// ```
    /// use snowmint::{AtomicSnowflakeGenerator, Poll};
    ///
    /// let generator = AtomicSnowflakeGenerator::new(1, 2).unwrap();
    ///
    /// let id = loop {
    ///     match generator.try_poll_id() {
    ///         Ok(Poll::Ready { id }) => break id,
    ///         Ok(Poll::Pending { .. }) => core::hint::spin_loop(),
    ///         Err(e) => panic!("Generator error: {e}"),
    ///     }
    /// };
    /// assert_eq!((id.worker_id(), id.datacenter_id()), (1, 2));
    /// ```
    pub fn new(worker_id: u8, datacenter_id: u8) -> Result<Self> {
        Self::with_time(worker_id, datacenter_id, SystemClock)
    }
}

impl<T> AtomicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new generator reading time from `time`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if either ID is greater than
    /// 31.
    pub fn with_time(worker_id: u8, datacenter_id: u8, time: T) -> Result<Self> {
        GeneratorConfig::new(worker_id, datacenter_id).validate()?;
        Ok(Self::from_components(
            0,
            u64::from(datacenter_id),
            u64::from(worker_id),
            0,
            time,
        ))
    }

    /// Creates a generator from explicit component values.
    ///
    /// `last_timestamp` is in milliseconds since the Unix epoch. A value
    /// before [`crate::EPOCH`] means no ID has been issued yet, so the first
    /// reading at or after the epoch starts a fresh millisecond at sequence 0.
    ///
    /// # ⚠️ Note
    /// The IDs are masked to their 5-bit fields rather than validated. Prefer
    /// [`Self::with_time`] in typical use.
    pub fn from_components(
        last_timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
        time: T,
    ) -> Self {
        let initial = match last_timestamp.checked_sub(EPOCH_MILLIS) {
            Some(timestamp) => {
                SnowflakeId::from_components(timestamp, datacenter_id, worker_id, sequence)
                    .to_raw()
            }
            None => {
                SnowflakeId::from_components(0, datacenter_id, worker_id, 0).to_raw() | UNISSUED
            }
        };
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(AtomicU64::new(initial)),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU64::new(initial),
            time,
        }
    }

    /// Attempts to generate the next available ID.
    ///
    /// # Returns
    /// - `Ok(Poll::Ready { id })`: A new ID is available
    /// - `Ok(Poll::Pending { yield_for })`: Wait `yield_for` ms (`0` after a
    ///   lost CAS) and try again
    /// - `Err(Error::ClockRegression { .. })`: The clock is behind the last
    ///   issued ID
    ///
    /// # Errors
    /// - [`Error::ClockRegression`] as described above.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        let current_raw = self.state.load(Ordering::Acquire);
        let current_id = SnowflakeId::from_raw(current_raw);
        let current_ts = current_id.timestamp();
        let issued = current_id.is_valid();

        let now = self.time.current_millis();
        let Some(now) = now.checked_sub(EPOCH_MILLIS) else {
            let last_timestamp = if issued {
                current_ts + EPOCH_MILLIS
            } else {
                EPOCH_MILLIS
            };
            return Err(Self::cold_clock_behind(now, last_timestamp));
        };

        let next_id = match now.cmp(&current_ts) {
            _ if !issued => current_id.rollover_to_timestamp(now),
            cmp::Ordering::Equal => {
                if current_id.has_sequence_room() {
                    current_id.increment_sequence()
                } else {
                    return Ok(Poll::Pending { yield_for: 1 });
                }
            }
            cmp::Ordering::Greater => current_id.rollover_to_timestamp(now),
            cmp::Ordering::Less => {
                return Err(Self::cold_clock_behind(now, current_ts));
            }
        };

        if self
            .state
            .compare_exchange(
                current_raw,
                next_id.to_raw(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
        {
            Ok(Poll::Ready { id: next_id })
        } else {
            // Another thread won the race. Yield 0 to retry immediately.
            Ok(Poll::Pending { yield_for: 0 })
        }
    }

    /// Generates the next ID, calling `f` with the backoff hint (in ms) while
    /// the generator is pending.
    ///
    /// # Errors
    ///
    /// Same as [`Self::try_poll_id`].
    pub fn try_next_id(&self, f: impl FnMut(u64)) -> Result<SnowflakeId> {
        <Self as SnowflakeGenerator<T>>::try_next_id(self, f)
    }

    /// Generates the next ID, busy-polling while pending.
    ///
    /// # Errors
    ///
    /// Same as [`Self::try_poll_id`].
    pub fn next(&self) -> Result<SnowflakeId> {
        <Self as SnowflakeGenerator<T>>::next(self)
    }

    /// The worker ID packed into every ID.
    pub fn worker_id(&self) -> u64 {
        SnowflakeId::from_raw(self.state.load(Ordering::Relaxed)).worker_id()
    }

    /// The datacenter ID packed into every ID.
    pub fn datacenter_id(&self) -> u64 {
        SnowflakeId::from_raw(self.state.load(Ordering::Relaxed)).datacenter_id()
    }

    // Both arguments share a unit: either unix millis or epoch deltas.
    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: u64, last_timestamp: u64) -> Error {
        let behind_by = last_timestamp - now;
        #[cfg(feature = "tracing")]
        tracing::warn!(behind_by, "clock moved backwards");
        Error::ClockRegression { behind_by }
    }
}

impl<T> SnowflakeGenerator<T> for AtomicSnowflakeGenerator<T>
where
    T: TimeSource,
{
    fn with_time(worker_id: u8, datacenter_id: u8, time: T) -> Result<Self> {
        Self::with_time(worker_id, datacenter_id, time)
    }

    fn worker_id(&self) -> u64 {
        self.worker_id()
    }

    fn datacenter_id(&self) -> u64 {
        self.datacenter_id()
    }

    fn try_poll_id(&self) -> Result<Poll> {
        self.try_poll_id()
    }
}
