/// A result type defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `snowmint` can emit.
///
/// Generation only fails for two reasons: the clock moved backwards relative
/// to the last issued ID, or (with the std mutex) the generator lock was
/// poisoned. Configuration errors are reported once, at construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A worker or datacenter ID does not fit its 5-bit field.
    ///
    /// The generator is never constructed in this state.
    #[error("{field} can't be greater than {max}, got {value}")]
    InvalidConfiguration {
        /// Which identity field was rejected.
        field: IdentityField,
        /// The rejected value.
        value: u8,
        /// The largest accepted value.
        max: u8,
    },

    /// The clock reported a time earlier than the last issued ID.
    ///
    /// No ID was produced and the generator state is unchanged. Callers decide
    /// whether to retry after `behind_by` milliseconds or escalate.
    #[error("clock moved backwards, refusing to generate id for {behind_by} milliseconds")]
    ClockRegression {
        /// How far, in milliseconds, the clock is behind the last issued ID.
        behind_by: u64,
    },

    /// The operation failed because the lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

/// The identity field named by [`Error::InvalidConfiguration`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentityField {
    WorkerId,
    DatacenterId,
}

impl core::fmt::Display for IdentityField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WorkerId => f.write_str("worker id"),
            Self::DatacenterId => f.write_str("datacenter id"),
        }
    }
}

#[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
