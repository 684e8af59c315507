//! The three archive variants a value graph is serialized through.
//!
//! A serialization is three passes over the same sequence of values:
//!
//! ```text
//! values ──► SizingArchive ──(size)──► PackingArchive ──► Buffer ──► transport
//!                                                                        │
//! values ◄──────────────── UnpackingArchive ◄── Buffer (owned or borrowed)
//! ```
//!
//! Archives are short-lived: each is created for exactly one pass, then
//! dropped or converted (a sizing archive is consumed to produce a packing
//! archive). The archive itself is the only mutable state threaded through a
//! pass, which is why every chaining method hands back `&mut Self`.
//!
//! All three archives are `Send` but are meant to be confined to one thread
//! for the duration of a pass; hand a completed archive or its buffer to
//! another thread by moving it.
//!
//! # Plugging in storage
//!
//! The archive types are concrete and the cursor logic is shared. What
//! varies between implementations is where the bytes live, and each archive
//! takes that as a parameter:
//!
//! | Archive | Parameter | Supplies |
//! |---|---|---|
//! | [`SizingArchive`] | none | a running byte count only |
//! | [`PackingArchive`] | [`PackTarget`] | the writable destination |
//! | [`UnpackingArchive`] | any [`SerializationBuffer`](crate::SerializationBuffer) and an [`AllocationPolicy`](crate::AllocationPolicy) | the source bytes and reconstruction storage |
//!
//! A transport with its own message type implements the two traits and runs
//! the passes over it directly:
//!
//! ```rust
//! use tripack::{GlobalAllocator, PackTarget, PackingArchive, SerializationBuffer};
//! use tripack::{SizingArchive, UnpackingArchive};
//!
//! /// A frame with a fixed header the archives never see.
//! struct Frame {
//!     bytes: Vec<u8>,
//! }
//!
//! const HEADER: usize = 4;
//!
//! impl PackTarget for Frame {
//!     fn target_bytes(&mut self) -> &mut [u8] {
//!         &mut self.bytes[HEADER..]
//!     }
//! }
//!
//! impl SerializationBuffer for Frame {
//!     fn data(&self) -> &[u8] {
//!         &self.bytes[HEADER..]
//!     }
//! }
//!
//! let (id, name) = (7u64, "sensor");
//! let mut sizing = SizingArchive::new();
//! sizing.add(&id).add(name);
//!
//! let frame = Frame { bytes: vec![0xAB; HEADER + sizing.size()] };
//! let mut packing = PackingArchive::new(frame);
//! packing.pack(&id)?.pack(name)?;
//! let (frame, written) = packing.into_parts();
//! assert_eq!(written, frame.capacity());
//! assert_eq!(&frame.bytes[..HEADER], &[0xAB; HEADER]);
//!
//! let mut ar = UnpackingArchive::from_buffer(&frame, GlobalAllocator);
//! let (mut id2, mut name2) = (0u64, String::new());
//! ar.unpack_into(&mut id2)?.unpack_into(&mut name2)?;
//! ar.expect_exhausted()?;
//! assert_eq!((id2, name2.as_str()), (7, "sensor"));
//! # Ok::<(), tripack::TripackError>(())
//! ```

mod packing;
mod sizing;
mod unpacking;

use std::fmt;

pub use packing::{PackTarget, PackingArchive};
pub use sizing::SizingArchive;
pub use unpacking::{Slot, UnpackingArchive};

/// The phase an archive implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// Dry run that only counts bytes.
    Sizing,
    /// Writes byte representations into a pre-sized destination.
    Packing,
    /// Reconstructs values from a source buffer.
    Unpacking,
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sizing => "sizing",
            Self::Packing => "packing",
            Self::Unpacking => "unpacking",
        })
    }
}

/// Tags an archive type with the phase it implements.
///
/// Leaf serializers never need this: the dispatch traits already select the
/// right operation from the archive type. It exists for generic code that
/// wants to branch on, or log, the phase of an archive it was handed.
pub trait Archive {
    /// The phase implemented by this archive type.
    const KIND: ArchiveKind;

    /// Returns the phase implemented by this archive.
    fn kind(&self) -> ArchiveKind {
        Self::KIND
    }

    /// True for [`SizingArchive`].
    fn is_sizing(&self) -> bool {
        Self::KIND == ArchiveKind::Sizing
    }

    /// True for [`PackingArchive`].
    fn is_packing(&self) -> bool {
        Self::KIND == ArchiveKind::Packing
    }

    /// True for [`UnpackingArchive`].
    fn is_unpacking(&self) -> bool {
        Self::KIND == ArchiveKind::Unpacking
    }
}
