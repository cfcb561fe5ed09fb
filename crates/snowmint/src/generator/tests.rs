use crate::{
    AtomicSnowflakeGenerator, EPOCH_MILLIS, Error, GeneratorConfig, IdentityField,
    LockSnowflakeGenerator, MonotonicClock, Poll, SnowflakeGenerator, SnowflakeId, TimeSource,
};
use super::GeneratorState;
use std::cell::Cell;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::thread::scope;

struct MockTime {
    millis: u64,
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

/// A clock tests can move in either direction.
struct SettableTime {
    millis: Cell<u64>,
}

impl SettableTime {
    fn at(offset: u64) -> Self {
        Self {
            millis: Cell::new(EPOCH_MILLIS + offset),
        }
    }

    fn set(&self, offset: u64) {
        self.millis.set(EPOCH_MILLIS + offset);
    }

    fn advance(&self) {
        self.millis.set(self.millis.get() + 1);
    }
}

impl TimeSource for SettableTime {
    fn current_millis(&self) -> u64 {
        self.millis.get()
    }
}

trait PollExt {
    fn unwrap_ready(self) -> SnowflakeId;
    fn unwrap_pending(self) -> u64;
}

impl PollExt for Poll {
    fn unwrap_ready(self) -> SnowflakeId {
        match self {
            Self::Ready { id } => id,
            Self::Pending { yield_for } => {
                panic!("unexpected pending (yield for: {yield_for})")
            }
        }
    }

    fn unwrap_pending(self) -> u64 {
        match self {
            Self::Ready { id } => panic!("unexpected ready ({id})"),
            Self::Pending { yield_for } => yield_for,
        }
    }
}

fn run_construction_bounds<G, T>(make_time: impl Fn() -> T)
where
    G: SnowflakeGenerator<T>,
    T: TimeSource,
{
    for worker_id in 0..=31 {
        for datacenter_id in 0..=31 {
            let generator = G::with_time(worker_id, datacenter_id, make_time()).unwrap();
            assert_eq!(generator.worker_id(), u64::from(worker_id));
            assert_eq!(generator.datacenter_id(), u64::from(datacenter_id));

            let config = GeneratorConfig::new(worker_id, datacenter_id);
            let generator = G::from_config(config, make_time()).unwrap();
            assert_eq!(generator.worker_id(), u64::from(worker_id));
            assert_eq!(generator.datacenter_id(), u64::from(datacenter_id));
        }
    }

    for bad in [32, 100, u8::MAX] {
        assert!(G::from_config(GeneratorConfig::new(bad, bad), make_time()).is_err());
        assert!(matches!(
            G::with_time(bad, 0, make_time()),
            Err(Error::InvalidConfiguration {
                field: IdentityField::WorkerId,
                ..
            })
        ));
        assert!(matches!(
            G::with_time(0, bad, make_time()),
            Err(Error::InvalidConfiguration {
                field: IdentityField::DatacenterId,
                ..
            })
        ));
    }
}

fn run_first_id_decodes_to_components<G>(generator: &G)
where
    G: SnowflakeGenerator<MockTime>,
{
    let id = generator.try_poll_id().unwrap().unwrap_ready();
    assert_eq!(id.timestamp(), 100);
    assert_eq!(id.worker_id(), 0);
    assert_eq!(id.datacenter_id(), 0);
    assert_eq!(id.sequence(), 0);
    assert_eq!(id.to_i64(), 100 << 22);
    assert_eq!(id.unix_millis(), 1_546_272_000_100);
}

fn run_id_sequence_increments_within_same_tick<G>(generator: &G)
where
    G: SnowflakeGenerator<MockTime>,
{
    let id1 = generator.try_poll_id().unwrap().unwrap_ready();
    let id2 = generator.try_poll_id().unwrap().unwrap_ready();
    let id3 = generator.try_poll_id().unwrap().unwrap_ready();

    assert_eq!(id1.timestamp(), 42);
    assert_eq!(id2.timestamp(), 42);
    assert_eq!(id3.timestamp(), 42);
    assert_eq!(id1.sequence(), 0);
    assert_eq!(id2.sequence(), 1);
    assert_eq!(id3.sequence(), 2);
    assert!(id1 < id2 && id2 < id3);
}

fn run_generator_returns_pending_when_sequence_exhausted<G>(generator: &G)
where
    G: SnowflakeGenerator<MockTime>,
{
    let yield_for = generator.try_poll_id().unwrap().unwrap_pending();
    assert_eq!(yield_for, 1);
    // Still pending: nothing was consumed.
    let yield_for = generator.try_poll_id().unwrap().unwrap_pending();
    assert_eq!(yield_for, 1);
}

fn run_generator_handles_rollover<'a, G>(generator: &G, clock: &'a SettableTime)
where
    G: SnowflakeGenerator<&'a SettableTime>,
{
    for i in 0..=SnowflakeId::MAX_SEQUENCE {
        let id = generator.try_poll_id().unwrap().unwrap_ready();
        assert_eq!(id.sequence(), i);
        assert_eq!(id.timestamp(), 42);
    }

    let yield_for = generator.try_poll_id().unwrap().unwrap_pending();
    assert_eq!(yield_for, 1);

    clock.set(43);

    let id = generator.try_poll_id().unwrap().unwrap_ready();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);
}

fn run_exhaustion_waits_for_next_millisecond<'a, G>(generator: &G, clock: &'a SettableTime)
where
    G: SnowflakeGenerator<&'a SettableTime>,
{
    let mut seen = HashSet::new();
    let mut backoffs = 0;
    let mut ids = Vec::with_capacity(4097);

    for _ in 0..4097 {
        let id = generator
            .try_next_id(|yield_for| {
                assert_eq!(yield_for, 1);
                backoffs += 1;
                clock.advance();
            })
            .unwrap();
        assert!(seen.insert((id.timestamp(), id.sequence())));
        ids.push(id);
    }

    assert_eq!(backoffs, 1);
    let first = ids[0].timestamp();
    assert!(ids[..4096].iter().all(|id| id.timestamp() == first));
    assert_eq!(ids[4096].timestamp(), first + 1);
    assert_eq!(ids[4096].sequence(), 0);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

fn run_clock_regression_is_reported_and_state_kept<'a, G>(generator: &G, clock: &'a SettableTime)
where
    G: SnowflakeGenerator<&'a SettableTime>,
{
    let first = generator.next().unwrap();
    assert_eq!((first.timestamp(), first.sequence()), (1_000, 0));

    clock.set(950);
    assert_eq!(
        generator.try_poll_id(),
        Err(Error::ClockRegression { behind_by: 50 })
    );
    assert_eq!(
        generator.next(),
        Err(Error::ClockRegression { behind_by: 50 })
    );

    // Once the clock catches up, the sequence carries on where it left off.
    clock.set(1_000);
    let second = generator.next().unwrap();
    assert_eq!((second.timestamp(), second.sequence()), (1_000, 1));
    assert!(second > first);
}

fn run_clock_behind_epoch_reports_full_distance<'a, G>(generator: &G, clock: &'a SettableTime)
where
    G: SnowflakeGenerator<&'a SettableTime>,
{
    let first = generator.next().unwrap();
    assert_eq!((first.timestamp(), first.sequence()), (1_000, 0));

    clock.millis.set(EPOCH_MILLIS - 10);
    assert_eq!(
        generator.try_poll_id(),
        Err(Error::ClockRegression { behind_by: 1_010 })
    );

    clock.set(1_000);
    let second = generator.next().unwrap();
    assert_eq!((second.timestamp(), second.sequence()), (1_000, 1));
}

fn run_first_id_at_epoch_starts_at_sequence_zero<G>(generator: &G)
where
    G: SnowflakeGenerator<MockTime>,
{
    let id = generator.try_poll_id().unwrap().unwrap_ready();
    assert_eq!((id.timestamp(), id.sequence()), (0, 0));
    assert!(id.is_valid());

    let id = generator.try_poll_id().unwrap().unwrap_ready();
    assert_eq!((id.timestamp(), id.sequence()), (0, 1));
}

fn run_clock_before_epoch_is_rejected<G>(generator: &G)
where
    G: SnowflakeGenerator<MockTime>,
{
    assert_eq!(
        generator.try_poll_id(),
        Err(Error::ClockRegression { behind_by: 10 })
    );
}

fn run_generator_monotonic<G, T>(generator: &G)
where
    G: SnowflakeGenerator<T>,
    T: TimeSource,
{
    let mut last: Option<SnowflakeId> = None;
    let mut sequence = 0;
    #[allow(clippy::items_after_statements)]
    const TOTAL_IDS: usize = 4096 * 64;

    for _ in 0..TOTAL_IDS {
        let id = generator.next().unwrap();
        if let Some(last) = last {
            assert!(id > last);
            if id.timestamp() > last.timestamp() {
                sequence = 0;
            }
        }
        assert_eq!(id.worker_id(), 1);
        assert_eq!(id.datacenter_id(), 2);
        assert_eq!(id.sequence(), sequence);

        last = Some(id);
        sequence += 1;
    }
}

fn run_generator_monotonic_threaded<G>(make_generator: impl Fn() -> G)
where
    G: SnowflakeGenerator<MonotonicClock> + Sync,
{
    const TOTAL_IDS: usize = 4096 * 256;
    let threads = num_cpus::get().clamp(2, 8);
    let ids_per_thread = TOTAL_IDS / threads;

    let generator = make_generator();
    let seen_ids = Mutex::new(Vec::with_capacity(TOTAL_IDS));

    scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                let mut local = Vec::with_capacity(ids_per_thread);
                for _ in 0..ids_per_thread {
                    local.push(generator.try_next_id(|_| std::thread::yield_now()).unwrap());
                }
                // Each caller observes the generator moving forward.
                assert!(local.windows(2).all(|w| w[0] < w[1]));
                seen_ids.lock().unwrap().extend(local);
            });
        }
    });

    let mut ids = seen_ids.into_inner().unwrap();
    let expected = ids_per_thread * threads;
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), expected, "Expected {expected} unique IDs");

    let mut buckets: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    for id in &ids {
        assert_eq!((id.worker_id(), id.datacenter_id()), (3, 4));
        buckets.entry(id.timestamp()).or_default().push(id.sequence());
    }
    // Every millisecond hands out a gap-free run of sequences starting at 0.
    for (timestamp, sequences) in &buckets {
        assert!(sequences.len() <= 4096);
        assert!(
            sequences.iter().copied().eq(0..sequences.len() as u64),
            "non-contiguous sequences in millisecond {timestamp}"
        );
    }
}

fn run_distinct_identities_never_collide<G>(make_generator: impl Fn(u8, u8) -> G)
where
    G: SnowflakeGenerator<MockTime>,
{
    let mut seen = HashSet::new();
    for worker_id in 0..=31 {
        for datacenter_id in 0..=31 {
            let id = make_generator(worker_id, datacenter_id)
                .try_poll_id()
                .unwrap()
                .unwrap_ready();
            assert_eq!(id.worker_id(), u64::from(worker_id));
            assert_eq!(id.datacenter_id(), u64::from(datacenter_id));
            assert_eq!((id.timestamp(), id.sequence()), (7, 0));
            assert!(seen.insert(id));
        }
    }
    assert_eq!(seen.len(), 32 * 32);
}

fn lock_state<T: TimeSource>(generator: &LockSnowflakeGenerator<T>) -> GeneratorState {
    #[cfg(feature = "parking-lot")]
    {
        *generator.state.lock()
    }
    #[cfg(not(feature = "parking-lot"))]
    {
        *generator.state.lock().unwrap()
    }
}

fn at(offset: u64) -> MockTime {
    MockTime {
        millis: EPOCH_MILLIS + offset,
    }
}

#[test]
fn lock_generator_construction_bounds() {
    run_construction_bounds::<LockSnowflakeGenerator<MockTime>, _>(|| at(0));
}

#[test]
fn atomic_generator_construction_bounds() {
    run_construction_bounds::<AtomicSnowflakeGenerator<MockTime>, _>(|| at(0));
}

#[test]
fn lock_generator_first_id_test() {
    let generator = LockSnowflakeGenerator::with_time(0, 0, at(100)).unwrap();
    run_first_id_decodes_to_components(&generator);
}

#[test]
fn atomic_generator_first_id_test() {
    let generator = AtomicSnowflakeGenerator::with_time(0, 0, at(100)).unwrap();
    run_first_id_decodes_to_components(&generator);
}

#[test]
fn lock_generator_sequence_test() {
    let generator = LockSnowflakeGenerator::with_time(0, 0, at(42)).unwrap();
    run_id_sequence_increments_within_same_tick(&generator);
}

#[test]
fn atomic_generator_sequence_test() {
    let generator = AtomicSnowflakeGenerator::with_time(0, 0, at(42)).unwrap();
    run_id_sequence_increments_within_same_tick(&generator);
}

#[test]
fn lock_generator_pending_test() {
    let generator = LockSnowflakeGenerator::from_components(
        EPOCH_MILLIS + 5,
        0,
        0,
        SnowflakeId::MAX_SEQUENCE,
        at(5),
    );
    run_generator_returns_pending_when_sequence_exhausted(&generator);
}

#[test]
fn atomic_generator_pending_test() {
    let generator = AtomicSnowflakeGenerator::from_components(
        EPOCH_MILLIS + 5,
        0,
        0,
        SnowflakeId::MAX_SEQUENCE,
        at(5),
    );
    run_generator_returns_pending_when_sequence_exhausted(&generator);
}

#[test]
fn lock_generator_rollover_test() {
    let clock = SettableTime::at(42);
    let generator = LockSnowflakeGenerator::with_time(1, 1, &clock).unwrap();
    run_generator_handles_rollover(&generator, &clock);
}

#[test]
fn atomic_generator_rollover_test() {
    let clock = SettableTime::at(42);
    let generator = AtomicSnowflakeGenerator::with_time(1, 1, &clock).unwrap();
    run_generator_handles_rollover(&generator, &clock);
}

#[test]
fn lock_generator_exhaustion_test() {
    let clock = SettableTime::at(500);
    let generator = LockSnowflakeGenerator::with_time(9, 9, &clock).unwrap();
    run_exhaustion_waits_for_next_millisecond(&generator, &clock);
}

#[test]
fn atomic_generator_exhaustion_test() {
    let clock = SettableTime::at(500);
    let generator = AtomicSnowflakeGenerator::with_time(9, 9, &clock).unwrap();
    run_exhaustion_waits_for_next_millisecond(&generator, &clock);
}

#[test]
fn lock_generator_clock_regression_test() {
    let clock = SettableTime::at(1_000);
    let generator = LockSnowflakeGenerator::with_time(0, 0, &clock).unwrap();
    run_clock_regression_is_reported_and_state_kept(&generator, &clock);

    let state = lock_state(&generator);
    assert_eq!(state.last_timestamp, EPOCH_MILLIS + 1_000);
    assert_eq!(state.sequence, 1);
}

#[test]
fn atomic_generator_clock_regression_test() {
    let clock = SettableTime::at(1_000);
    let generator = AtomicSnowflakeGenerator::with_time(0, 0, &clock).unwrap();
    run_clock_regression_is_reported_and_state_kept(&generator, &clock);
}

#[test]
fn lock_generator_before_epoch_test() {
    let generator = LockSnowflakeGenerator::with_time(
        0,
        0,
        MockTime {
            millis: EPOCH_MILLIS - 10,
        },
    )
    .unwrap();
    run_clock_before_epoch_is_rejected(&generator);
}

#[test]
fn atomic_generator_before_epoch_test() {
    let generator = AtomicSnowflakeGenerator::with_time(
        0,
        0,
        MockTime {
            millis: EPOCH_MILLIS - 10,
        },
    )
    .unwrap();
    run_clock_before_epoch_is_rejected(&generator);
}

#[test]
fn lock_generator_behind_epoch_after_issue_test() {
    let clock = SettableTime::at(1_000);
    let generator = LockSnowflakeGenerator::with_time(0, 0, &clock).unwrap();
    run_clock_behind_epoch_reports_full_distance(&generator, &clock);
}

#[test]
fn atomic_generator_behind_epoch_after_issue_test() {
    let clock = SettableTime::at(1_000);
    let generator = AtomicSnowflakeGenerator::with_time(0, 0, &clock).unwrap();
    run_clock_behind_epoch_reports_full_distance(&generator, &clock);
}

#[test]
fn lock_generator_first_id_at_epoch_test() {
    let generator = LockSnowflakeGenerator::with_time(0, 0, at(0)).unwrap();
    run_first_id_at_epoch_starts_at_sequence_zero(&generator);
}

#[test]
fn atomic_generator_first_id_at_epoch_test() {
    let generator = AtomicSnowflakeGenerator::with_time(0, 0, at(0)).unwrap();
    run_first_id_at_epoch_starts_at_sequence_zero(&generator);
}

#[test]
fn lock_generator_distinct_identities_test() {
    run_distinct_identities_never_collide(|w, d| {
        LockSnowflakeGenerator::with_time(w, d, at(7)).unwrap()
    });
}

#[test]
fn atomic_generator_distinct_identities_test() {
    run_distinct_identities_never_collide(|w, d| {
        AtomicSnowflakeGenerator::with_time(w, d, at(7)).unwrap()
    });
}

#[test]
fn lock_generator_monotonic_clock_sequence_increments() {
    let generator = LockSnowflakeGenerator::with_time(1, 2, MonotonicClock::new()).unwrap();
    run_generator_monotonic(&generator);
}

#[test]
fn atomic_generator_monotonic_clock_sequence_increments() {
    let generator = AtomicSnowflakeGenerator::with_time(1, 2, MonotonicClock::new()).unwrap();
    run_generator_monotonic(&generator);
}

#[test]
fn lock_generator_system_clock_sequence_increments() {
    let generator = GeneratorConfig::new(1, 2).build().unwrap();
    run_generator_monotonic(&generator);
}

#[test]
fn lock_generator_threaded_monotonic() {
    let clock = MonotonicClock::new();
    run_generator_monotonic_threaded(move || {
        LockSnowflakeGenerator::with_time(3, 4, clock.clone()).unwrap()
    });
}

#[test]
fn atomic_generator_threaded_monotonic() {
    let clock = MonotonicClock::new();
    run_generator_monotonic_threaded(move || {
        AtomicSnowflakeGenerator::with_time(3, 4, clock.clone()).unwrap()
    });
}

#[cfg(not(feature = "parking-lot"))]
#[test]
fn lock_generator_reports_poisoned_lock() {
    struct PanickingTime {
        armed: Cell<bool>,
    }

    impl TimeSource for PanickingTime {
        fn current_millis(&self) -> u64 {
            assert!(!self.armed.replace(false), "clock failure");
            EPOCH_MILLIS
        }
    }

    let generator = LockSnowflakeGenerator::with_time(
        0,
        0,
        PanickingTime {
            armed: Cell::new(true),
        },
    )
    .unwrap();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| generator.try_poll_id()));
    assert!(result.is_err());
    assert_eq!(generator.try_poll_id(), Err(Error::LockPoisoned));
}
