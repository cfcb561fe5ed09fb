use core::cmp::Ordering;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    config::GeneratorConfig,
    error::{Error, Result},
    generator::{Mutex, Poll, SnowflakeGenerator},
    id::SnowflakeId,
    time::{EPOCH_MILLIS, SystemClock, TimeSource},
};

/// Mutable state shared by every caller of one generator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct GeneratorState {
    /// Unix millis of the most recently issued ID.
    pub(crate) last_timestamp: u64,
    /// Sequence used within `last_timestamp`.
    pub(crate) sequence: u64,
}

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The last issued timestamp and the per-millisecond sequence live behind a
/// single mutex, so every ID is issued by exactly one caller at a time. The
/// clock is sampled *after* the lock is taken, which means a backward-looking
/// reading is always compared against the authoritative last timestamp and
/// never against a value another thread is about to overwrite.
///
/// When 4096 IDs have been issued within one millisecond the generator
/// returns [`Poll::Pending`] instead of spinning under the lock. The blocking
/// helpers on [`SnowflakeGenerator`] wait outside the lock and retry.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Fair access across threads
/// - ✅ Detects wall-clock regressions
///
/// ## See Also
/// - [`AtomicSnowflakeGenerator`]
///
/// [`AtomicSnowflakeGenerator`]: crate::AtomicSnowflakeGenerator
pub struct LockSnowflakeGenerator<T = SystemClock>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    pub(crate) state: crossbeam_utils::CachePadded<Mutex<GeneratorState>>,
    #[cfg(not(feature = "cache-padded"))]
    pub(crate) state: Mutex<GeneratorState>,
    worker_id: u64,
    datacenter_id: u64,
    time: T,
}

impl LockSnowflakeGenerator<SystemClock> {
    /// Creates a new generator on the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `worker_id` or
    /// `datacenter_id` is greater than 31. Nothing is constructed in that
    /// case.
    ///
    /// # Example
    /// ```
    /// use snowmint::LockSnowflakeGenerator;
    ///
    /// let generator = LockSnowflakeGenerator::new(3, 1).unwrap();
    /// let id = generator.next().unwrap();
    /// assert_eq!(id.worker_id(), 3);
    /// assert_eq!(id.datacenter_id(), 1);
    ///
    /// assert!(LockSnowflakeGenerator::new(32, 0).is_err());
    /// ```
    pub fn new(worker_id: u8, datacenter_id: u8) -> Result<Self> {
        Self::with_time(worker_id, datacenter_id, SystemClock)
    }
}

impl Default for LockSnowflakeGenerator<SystemClock> {
    /// Worker 0 in datacenter 0 on the system clock.
    fn default() -> Self {
        Self::from_components(0, 0, 0, 0, SystemClock)
    }
}

impl<T> LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new generator reading time from `time`.
    ///
    /// The initial timestamp and sequence are zero.
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
    /// This is primarily useful for tests or for seeding the generator with a
    /// high-water mark known to the running process. `last_timestamp` is in
    /// milliseconds since the Unix epoch.
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
        let state = GeneratorState {
            last_timestamp,
            sequence: sequence & SnowflakeId::SEQUENCE_MASK,
        };
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(Mutex::new(state)),
            #[cfg(not(feature = "cache-padded"))]
            state: Mutex::new(state),
            worker_id: worker_id & SnowflakeId::WORKER_ID_MASK,
            datacenter_id: datacenter_id & SnowflakeId::DATACENTER_ID_MASK,
            time,
        }
    }

    /// Attempts to generate the next available ID.
    ///
    /// # Returns
    /// - `Ok(Poll::Ready { id })`: A new ID is available
    /// - `Ok(Poll::Pending { yield_for })`: The sequence for the current
    ///   millisecond is exhausted; wait `yield_for` ms
    /// - `Err(Error::ClockRegression { .. })`: The clock is behind the last
    ///   issued ID. State is untouched.
    ///
    /// # Errors
    /// - [`Error::ClockRegression`] as described above.
    /// - [`Error::LockPoisoned`] if the lock has been poisoned (std mutex
    ///   only).
    ///
    /// # Example
    /// ```
    /// use snowmint::{LockSnowflakeGenerator, Poll};
    ///
    /// let generator = LockSnowflakeGenerator::new(0, 0).unwrap();
    ///
    /// let id = loop {
    ///     match generator.try_poll_id() {
    ///         Ok(Poll::Ready { id }) => break id,
    ///         Ok(Poll::Pending { yield_for }) => {
    ///             std::thread::sleep(core::time::Duration::from_millis(yield_for));
    ///         }
    ///         Err(e) => panic!("Generator error: {e}"),
    ///     }
    /// };
    /// assert!(id.to_i64() > 0);
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        let mut state = {
            #[cfg(feature = "parking-lot")]
            {
                self.state.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.state.lock()?
            }
        };

        let now = self.time.current_millis();
        if now < EPOCH_MILLIS {
            return Err(Self::cold_clock_behind(
                now,
                state.last_timestamp.max(EPOCH_MILLIS),
            ));
        }

        match now.cmp(&state.last_timestamp) {
            Ordering::Equal => {
                if state.sequence < SnowflakeId::MAX_SEQUENCE {
                    state.sequence = (state.sequence + 1) & SnowflakeId::SEQUENCE_MASK;
                    Ok(Poll::Ready {
                        id: self.compose(now, state.sequence),
                    })
                } else {
                    Ok(Poll::Pending { yield_for: 1 })
                }
            }
            Ordering::Greater => {
                state.last_timestamp = now;
                state.sequence = 0;
                Ok(Poll::Ready {
                    id: self.compose(now, 0),
                })
            }
            Ordering::Less => Err(Self::cold_clock_behind(now, state.last_timestamp)),
        }
    }

    /// Generates the next ID, calling `f` with the backoff hint (in ms) while
    /// the current millisecond is exhausted.
    ///
    /// # Errors
    ///
    /// Same as [`Self::try_poll_id`].
    pub fn try_next_id(&self, f: impl FnMut(u64)) -> Result<SnowflakeId> {
        <Self as SnowflakeGenerator<T>>::try_next_id(self, f)
    }

    /// Generates the next ID, busy-polling the clock while the current
    /// millisecond is exhausted.
    ///
    /// # Errors
    ///
    /// Same as [`Self::try_poll_id`].
    pub fn next(&self) -> Result<SnowflakeId> {
        <Self as SnowflakeGenerator<T>>::next(self)
    }

    /// The worker ID packed into every ID.
    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }

    /// The datacenter ID packed into every ID.
    pub const fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    fn compose(&self, unix_millis: u64, sequence: u64) -> SnowflakeId {
        SnowflakeId::from_components(
            unix_millis - EPOCH_MILLIS,
            self.datacenter_id,
            self.worker_id,
            sequence,
        )
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: u64, last_timestamp: u64) -> Error {
        let behind_by = last_timestamp - now;
        #[cfg(feature = "tracing")]
        tracing::warn!(behind_by, last_timestamp, now, "clock moved backwards");
        Error::ClockRegression { behind_by }
    }
}

impl<T> SnowflakeGenerator<T> for LockSnowflakeGenerator<T>
where
    T: TimeSource,
{
    fn with_time(worker_id: u8, datacenter_id: u8, time: T) -> Result<Self> {
        Self::with_time(worker_id, datacenter_id, time)
    }

    fn worker_id(&self) -> u64 {
        self.worker_id
    }

    fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    fn try_poll_id(&self) -> Result<Poll> {
        self.try_poll_id()
    }
}
