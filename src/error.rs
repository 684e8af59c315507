//! Centralized error handling for tripack.
//!
//! The protocol rejects most misuse at compile time: a type without a
//! [`Sizable`](crate::Sizable), [`Packable`](crate::Packable) or
//! [`Unpackable`](crate::Unpackable) impl simply cannot be handed to the
//! corresponding archive. What remains are runtime failures, and every one of
//! them is reported through [`TripackError`] instead of a panic.
//!
//! ## Error Categories
//!
//! - **Cursor errors** ([`TripackError::Overrun`], [`TripackError::InsufficientCapacity`]):
//!   a packing or unpacking pass tried to move past the end of its buffer.
//! - **Pass agreement errors** ([`TripackError::SizeMismatch`], [`TripackError::TrailingBytes`]):
//!   the sizing, packing and unpacking passes did not visit the same values.
//! - **Data errors** ([`TripackError::InvalidData`], [`TripackError::Serialization`]):
//!   bytes that do not form a valid value of the requested type.
//! - **Resource errors** ([`TripackError::Allocation`], [`TripackError::LimitExceeded`],
//!   [`TripackError::Io`]).
//!
//! ## Ordering mismatches
//!
//! Sizing, packing and unpacking must visit values in the same order and the
//! same count. The wire format carries no type tags, so a reordered unpack
//! usually succeeds and yields nonsense. Only the cases that move a cursor
//! out of bounds, or leave a buffer partially filled, are caught here.
//!
//! ```rust
//! use tripack::TripackError;
//!
//! let buffer = tripack::serialize(&7u32)?;
//! match tripack::deserialize::<u64, _>(&buffer) {
//!     Err(TripackError::Overrun { requested, capacity, .. }) => {
//!         assert_eq!((requested, capacity), (8, 4));
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! # Ok::<(), TripackError>(())
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::archive::ArchiveKind;

/// A specialized `Result` type for tripack operations.
pub type Result<T> = std::result::Result<T, TripackError>;

/// The master error enum covering every runtime failure of a pass.
///
/// This type is `Clone`; I/O errors are wrapped in an `Arc` so that a failed
/// pass can be reported to several owners.
#[derive(Debug, Clone)]
pub enum TripackError {
    /// A packing or unpacking cursor would have advanced past the end of its buffer.
    ///
    /// The pass that produced this error must be abandoned: the archive's
    /// cursor is left where the failing request started.
    Overrun {
        /// The archive that detected the overrun.
        phase: ArchiveKind,
        /// Cursor offset at the time of the request.
        offset: usize,
        /// Number of bytes the request needed.
        requested: usize,
        /// Total capacity of the underlying buffer.
        capacity: usize,
    },

    /// A caller-supplied destination is smaller than the size computed by a sizing pass.
    InsufficientCapacity {
        /// Bytes required by the sizing pass.
        required: usize,
        /// Bytes available in the destination.
        available: usize,
    },

    /// A packing pass finished without filling the buffer sized for it.
    ///
    /// This means the packing pass visited fewer (or smaller) values than the
    /// sizing pass it was created from.
    SizeMismatch {
        /// Bytes accounted for by the sizing pass.
        sized: usize,
        /// Bytes actually written by the packing pass.
        packed: usize,
    },

    /// An unpacking pass finished with unread bytes left in the buffer.
    TrailingBytes {
        /// Number of bytes that were not consumed.
        remaining: usize,
    },

    /// A serialization exceeded the configured `max_buffer_size`.
    LimitExceeded {
        /// Size computed by the sizing pass.
        size: usize,
        /// The configured limit.
        limit: usize,
    },

    /// The bytes under the cursor are not a valid value of the requested type
    /// (invalid UTF-8, a `bool` that is neither 0 nor 1, an unknown enum variant, ...).
    InvalidData(String),

    /// An allocation policy failed to provide storage.
    Allocation(String),

    /// A `serde` value could not be encoded or decoded by the bincode bridge.
    Serialization(String),

    /// Low-level I/O failure while mapping a buffer from a file.
    Io(Arc<io::Error>),
}

impl TripackError {
    /// Shorthand for an [`TripackError::InvalidData`] with a formatted message.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Returns true for errors raised by a cursor leaving its buffer.
    pub fn is_overrun(&self) -> bool {
        matches!(
            self,
            Self::Overrun { .. } | Self::InsufficientCapacity { .. }
        )
    }
}

impl fmt::Display for TripackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overrun {
                phase,
                offset,
                requested,
                capacity,
            } => write!(
                f,
                "{phase} archive overrun: {requested} bytes requested at offset {offset}, capacity is {capacity}"
            ),
            Self::InsufficientCapacity {
                required,
                available,
            } => write!(
                f,
                "destination too small: {required} bytes required, {available} available"
            ),
            Self::SizeMismatch { sized, packed } => write!(
                f,
                "size mismatch: sizing pass counted {sized} bytes, packing pass wrote {packed}"
            ),
            Self::TrailingBytes { remaining } => {
                write!(f, "{remaining} unread bytes left after unpacking")
            }
            Self::LimitExceeded { size, limit } => {
                write!(f, "buffer of {size} bytes exceeds the configured limit of {limit}")
            }
            Self::InvalidData(s) => write!(f, "Invalid Data: {s}"),
            Self::Allocation(s) => write!(f, "Allocation Error: {s}"),
            Self::Serialization(s) => write!(f, "Serialization Error: {s}"),
            Self::Io(e) => write!(f, "I/O Error: {e}"),
        }
    }
}

impl std::error::Error for TripackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TripackError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<std::collections::TryReserveError> for TripackError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::Allocation(err.to_string())
    }
}
