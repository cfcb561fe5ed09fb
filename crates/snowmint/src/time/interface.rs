use std::sync::Arc;
use core::time::Duration;

/// Milliseconds between the Unix epoch and the ID epoch.
pub const EPOCH_MILLIS: u64 = 1_546_272_000_000;

/// ID epoch: Tuesday, January 1, 2019 00:00:00 UTC
///
/// The 41-bit timestamp field of every ID counts milliseconds from here.
pub const EPOCH: Duration = Duration::from_millis(EPOCH_MILLIS);

/// A trait for time sources that return a wall-clock or monotonic timestamp.
///
/// This abstraction allows you to plug in the system clock, a monotonic
/// ticker, or a mocked time source in tests.
///
/// The unit is **milliseconds since the Unix epoch**. Generators subtract
/// [`EPOCH`] themselves when packing an ID.
///
/// # Example
///
/// ```
/// use snowmint::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1_546_272_000_100
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1_546_272_000_100);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}
