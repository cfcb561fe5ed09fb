use core::fmt;

use crate::{id::IdError, time::EPOCH_MILLIS};

/// A 64-bit Snowflake ID with separate worker and datacenter fields.
///
/// - 1 bit reserved (always zero, so the ID is a non-negative `i64`)
/// - 41 bits timestamp (ms since [`EPOCH`])
/// - 5 bits datacenter ID
/// - 5 bits worker ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21        17 16        12 11             0
///              +--------------+----------------+------------+------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | dc ID (5)  | worker (5) | sequence (12) |
///              +--------------+----------------+------------+------------+---------------+
///              |<----------------- MSB ------------ 64 bits ------------ LSB ----------->|
/// ```
///
/// IDs compare by their raw value, which orders them by timestamp first and
/// sequence last.
///
/// [`EPOCH`]: crate::EPOCH
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Width of the timestamp field.
    pub const TIMESTAMP_BITS: u64 = 41;

    /// Width of the datacenter ID field.
    pub const DATACENTER_ID_BITS: u64 = 5;

    /// Width of the worker ID field.
    pub const WORKER_ID_BITS: u64 = 5;

    /// Width of the sequence field.
    pub const SEQUENCE_BITS: u64 = 12;

    /// Bitmask for extracting the 41-bit timestamp field. Occupies bits 22
    /// through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << Self::TIMESTAMP_BITS) - 1;

    /// Bitmask for extracting the 5-bit datacenter ID field. Occupies bits 17
    /// through 21.
    pub const DATACENTER_ID_MASK: u64 = (1 << Self::DATACENTER_ID_BITS) - 1;

    /// Bitmask for extracting the 5-bit worker ID field. Occupies bits 12
    /// through 16.
    pub const WORKER_ID_MASK: u64 = (1 << Self::WORKER_ID_BITS) - 1;

    /// Bitmask for extracting the 12-bit sequence field. Occupies bits 0
    /// through 11.
    pub const SEQUENCE_MASK: u64 = (1 << Self::SEQUENCE_BITS) - 1;

    /// Number of bits to shift the timestamp to its correct position (bit 22).
    pub const TIMESTAMP_SHIFT: u64 =
        Self::DATACENTER_ID_SHIFT + Self::DATACENTER_ID_BITS;

    /// Number of bits to shift the datacenter ID to its correct position (bit
    /// 17).
    pub const DATACENTER_ID_SHIFT: u64 = Self::WORKER_ID_SHIFT + Self::WORKER_ID_BITS;

    /// Number of bits to shift the worker ID to its correct position (bit 12).
    pub const WORKER_ID_SHIFT: u64 = Self::SEQUENCE_BITS;

    /// Largest accepted worker ID.
    pub const MAX_WORKER_ID: u64 = Self::WORKER_ID_MASK;

    /// Largest accepted datacenter ID.
    pub const MAX_DATACENTER_ID: u64 = Self::DATACENTER_ID_MASK;

    /// Largest sequence value within a single millisecond.
    pub const MAX_SEQUENCE: u64 = Self::SEQUENCE_MASK;

    /// Largest timestamp delta the layout can hold.
    pub const MAX_TIMESTAMP: u64 = Self::TIMESTAMP_MASK;

    /// Packs the four fields into an ID.
    ///
    /// Each field is masked to its width, so out-of-range inputs never bleed
    /// into neighbouring fields or the reserved bit.
    ///
    /// ```
    /// use snowmint::SnowflakeId;
    ///
    /// let id = SnowflakeId::from_components(100, 3, 7, 42);
    /// assert_eq!(id.timestamp(), 100);
    /// assert_eq!(id.datacenter_id(), 3);
    /// assert_eq!(id.worker_id(), 7);
    /// assert_eq!(id.sequence(), 42);
    /// ```
    pub const fn from_components(
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let datacenter_id =
            (datacenter_id & Self::DATACENTER_ID_MASK) << Self::DATACENTER_ID_SHIFT;
        let worker_id = (worker_id & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = sequence & Self::SEQUENCE_MASK;
        Self {
            id: timestamp | datacenter_id | worker_id | sequence,
        }
    }

    /// Extracts the timestamp delta (ms since [`crate::EPOCH`]).
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the datacenter ID.
    pub const fn datacenter_id(&self) -> u64 {
        (self.id >> Self::DATACENTER_ID_SHIFT) & Self::DATACENTER_ID_MASK
    }

    /// Extracts the worker ID.
    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK
    }

    /// Extracts the sequence number.
    pub const fn sequence(&self) -> u64 {
        self.id & Self::SEQUENCE_MASK
    }

    /// Milliseconds since the Unix epoch at which this ID was issued.
    pub const fn unix_millis(&self) -> u64 {
        self.timestamp() + EPOCH_MILLIS
    }

    /// Returns the packed value.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Wraps a packed value without validation.
    ///
    /// Use [`TryFrom<i64>`] or [`Self::is_valid`] for untrusted input.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns the ID as the signed integer handed out to consumers.
    ///
    /// Always non-negative because the reserved bit is never set by
    /// [`Self::from_components`].
    #[allow(clippy::cast_possible_wrap)]
    pub const fn to_i64(&self) -> i64 {
        self.id as i64
    }

    /// Returns `true` if the reserved bit is clear.
    pub const fn is_valid(&self) -> bool {
        self.id >> 63 == 0
    }

    /// Returns true if the current sequence value can be incremented.
    pub const fn has_sequence_room(&self) -> bool {
        self.sequence() < Self::MAX_SEQUENCE
    }

    /// Returns a new ID with the sequence incremented.
    pub const fn increment_sequence(&self) -> Self {
        Self::from_components(
            self.timestamp(),
            self.datacenter_id(),
            self.worker_id(),
            self.sequence() + 1,
        )
    }

    /// Returns a new ID for a newer timestamp with sequence reset to zero.
    pub const fn rollover_to_timestamp(&self, timestamp: u64) -> Self {
        Self::from_components(timestamp, self.datacenter_id(), self.worker_id(), 0)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp())
            .field("datacenter_id", &self.datacenter_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl From<SnowflakeId> for i64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_i64()
    }
}

impl TryFrom<i64> for SnowflakeId {
    type Error = IdError;

    #[allow(clippy::cast_sign_loss)]
    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        let id = Self::from_raw(raw as u64);
        if id.is_valid() {
            Ok(id)
        } else {
            Err(IdError::ReservedBitSet { raw: raw as u64 })
        }
    }
}
