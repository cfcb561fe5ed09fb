#[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
use std::time::{SystemTime, UNIX_EPOCH};
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
use web_time::{SystemTime, UNIX_EPOCH};

use crate::time::TimeSource;

/// The operating system's wall clock.
///
/// Every call samples `SystemTime::now()`, so NTP steps and manual
/// adjustments are visible. Generators detect a backwards step and refuse to
/// issue IDs until the clock catches up with the last issued timestamp.
///
/// A clock reading before 1970 is reported as `0`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    #[allow(clippy::cast_possible_truncation)]
    fn current_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}
