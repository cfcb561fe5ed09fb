use core::time::Duration;
use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use crate::time::{SystemClock, TimeSource};

/// Shared ticker thread that updates every millisecond.
#[derive(Debug)]
struct SharedTickerInner {
    current: AtomicU64,
    _handle: OnceLock<JoinHandle<()>>,
}

/// A monotonic time source anchored to the wall clock at construction.
///
/// The anchor is one `SystemTime::now()` sample. From then on the clock
/// advances by elapsed `Instant` time, so NTP steps and manual adjustments
/// are never observed and generators built on it never see a
/// [`ClockRegression`].
///
/// A background thread updates a shared atomic counter once per millisecond;
/// reads are a single atomic load. The thread exits once every clone has been
/// dropped. Clones share the same ticker.
///
/// [`ClockRegression`]: crate::Error::ClockRegression
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    inner: Arc<SharedTickerInner>,
    anchor: u64, // unix millis at construction
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Constructs a monotonic clock anchored to the current wall-clock time.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use snowmint::{MonotonicClock, TimeSource};
    ///
    /// let clock = MonotonicClock::new();
    /// let before = clock.current_millis();
    ///
    /// std::thread::sleep(Duration::from_millis(5));
    ///
    /// // Timer alignment means the reading may trail the sleep slightly, but
    /// // it never goes backward.
    /// assert!(clock.current_millis() >= before);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the ticker thread can't be spawned.
    pub fn new() -> Self {
        Self::with_anchor(SystemClock.current_millis())
    }

    /// Constructs a monotonic clock whose first reading is `anchor` (ms since
    /// the Unix epoch).
    pub fn with_anchor(anchor: u64) -> Self {
        let start = Instant::now();

        let inner = Arc::new(SharedTickerInner {
            current: AtomicU64::new(0),
            _handle: OnceLock::new(),
        });

        let weak_inner = Arc::downgrade(&inner);
        let handle = thread::Builder::new()
            .name("snowmint-ticker".into())
            .spawn(move || {
                let mut tick = 0;

                loop {
                    let Some(inner_ref) = weak_inner.upgrade() else {
                        break;
                    };

                    // Absolute target time of the next tick
                    let target = start + Duration::from_millis(tick);

                    let now = Instant::now();
                    if now < target {
                        thread::sleep(target - now);
                    }

                    #[allow(clippy::cast_possible_truncation)]
                    let now_ms = start.elapsed().as_millis() as u64;
                    inner_ref.current.store(now_ms, Ordering::Relaxed);

                    // Align to next tick after the current actual time
                    tick = now_ms + 1;
                }
            })
            .expect("failed to spawn ticker thread");

        let _ = inner._handle.set(handle);

        Self { inner, anchor }
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        self.anchor + self.inner.current.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_anchor_and_never_goes_back() {
        let clock = MonotonicClock::with_anchor(1_000);
        let mut last = clock.current_millis();
        assert!(last >= 1_000);
        for _ in 0..1_000 {
            let now = clock.current_millis();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn advances() {
        let clock = MonotonicClock::with_anchor(0);
        thread::sleep(Duration::from_millis(20));
        assert!(clock.current_millis() > 0);
    }
}
