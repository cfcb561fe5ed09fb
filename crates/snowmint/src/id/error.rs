/// Errors that can occur while turning a raw integer back into a
/// [`crate::SnowflakeId`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum IdError {
    /// The reserved sign bit was set, so the value can't be a generated ID.
    #[error("reserved bit set in {raw:#x}")]
    ReservedBitSet {
        /// The rejected raw value.
        raw: u64,
    },
}
