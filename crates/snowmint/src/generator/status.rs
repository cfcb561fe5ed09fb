use crate::id::SnowflakeId;

/// The outcome of a single, non-blocking generation attempt.
///
/// - [`Poll::Ready`] carries a freshly issued ID.
/// - [`Poll::Pending`] means the current millisecond's 4096 sequence numbers
///   are used up (or, for the lock-free generator, another thread won the
///   race). Back off for `yield_for` milliseconds and try again.
///
/// This allows non-blocking generation loops and clean backoff strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated ID.
        id: SnowflakeId,
    },
    /// No ID could be generated right now.
    Pending {
        /// Milliseconds to wait before retrying. `0` means retry immediately.
        yield_for: u64,
    },
}
