//! # Tripack
//!
//! A three-phase binary serialization protocol for moving in-process values
//! between cooperating endpoints (threads, processes, machines built from the
//! same code) with as little ceremony and copying as possible.
//!
//! ## Overview
//!
//! Every serialization is three passes over the same sequence of values:
//!
//! 1. **Sizing:** a [`SizingArchive`] walks the values and adds up how many
//!    bytes they will occupy. Nothing is written.
//! 2. **Packing:** a [`PackingArchive`] over a destination of exactly that
//!    size writes each value's bytes in order.
//! 3. **Unpacking:** on the receiving side an [`UnpackingArchive`] over the
//!    bytes (owned, borrowed from a transport, or memory-mapped) reconstructs
//!    the values in the same order.
//!
//! The encoding of a value is its in-memory byte representation. There is no
//! schema, no type tags, no versioning and no endianness normalization; both
//! endpoints must agree on layout. Variable-length types (strings, vectors,
//! maps) write their own length prefix and recurse into their elements.
//!
//! ### Key Features
//!
//! *   **Static Dispatch:** How to measure, pack and unpack a `T` is chosen at
//!     compile time from three capability traits ([`Sizable`], [`Packable`],
//!     [`Unpackable`]). Any type participates by implementing them; there is
//!     no registry.
//! *   **Flat Fast Path:** Trivially copyable types ([`Flat`]) are a single
//!     unaligned `memcpy` in each direction, proven sound by `zerocopy`.
//! *   **Zero-Copy Receive:** Unpack directly out of a transport's receive
//!     region with [`BorrowedBuffer`], or out of the page cache with [`MappedBuffer`].
//! *   **Allocator Binding:** Buffers and unpacking archives carry an
//!     [`AllocationPolicy`]; [`PooledAllocator`] recycles buffer storage.
//! *   **Swappable Handlers:** Code written against [`SerializationHandler`]
//!     runs with any handler; [`SimpleHandler`] is the one that ships.
//! *   **Derive Support:** `#[derive(Serializable)]` for structs and enums.
//!
//! ## Usage Patterns
//!
//! ### One value
//!
//! ```rust
//! let scores = vec![(String::from("ada"), 97u32), (String::from("lin"), 88)];
//!
//! let buffer = tripack::serialize(&scores)?;
//! let decoded: Vec<(String, u32)> = tripack::deserialize(&buffer)?;
//! assert_eq!(decoded, scores);
//! # Ok::<(), tripack::TripackError>(())
//! ```
//!
//! ### Several values in sequence
//!
//! ```rust
//! let (i, val, text) = (42i32, 3.14f64, String::from("hello world"));
//! let buffer = tripack::serialize_values!(i, val, text)?;
//! assert_eq!(buffer.capacity(), 4 + 8 + (size_of::<usize>() + 11));
//!
//! let (mut i2, mut val2, mut text2) = (0i32, 0.0f64, String::new());
//! tripack::unpack_values!(buffer => i2, val2, text2)?;
//! assert_eq!((i2, val2, text2.as_str()), (42, 3.14, "hello world"));
//! # Ok::<(), tripack::TripackError>(())
//! ```
//!
//! ### Derived types
//!
//! ```rust
//! # #[cfg(feature = "derive")] {
//! use tripack::Serializable;
//!
//! #[derive(Serializable, Debug, PartialEq)]
//! enum Command {
//!     Move { x: i32, y: i32 },
//!     Say(String),
//!     Quit,
//! }
//!
//! let sent = vec![Command::Move { x: 1, y: -1 }, Command::Say("hi".into()), Command::Quit];
//! let received: Vec<Command> = tripack::deserialize(&tripack::serialize(&sent)?)?;
//! assert_eq!(received, sent);
//! # }
//! # Ok::<(), tripack::TripackError>(())
//! ```
//!
//! ## Ordering Contract
//!
//! Sizing, packing and unpacking must visit the same values in the same
//! order. The format is not self-describing, so a reordered unpack is not
//! detected in general; see [`error`] for the cases that are.
//!
//! ### Safety and Error Handling
//!
//! * **Bounds-Checked Cursors:** every advance of a packing or unpacking
//!   cursor is checked against the buffer and fails with
//!   [`TripackError::Overrun`] instead of touching foreign memory.
//! * **Encapsulated Unsafe:** `unsafe` is denied crate-wide and allowed only
//!   where a memory map is created and where a borrowed buffer is built from
//!   a raw `(address, length)` pair.
//! * **No Panics:** No `unwrap()` or `panic!()` calls in the library (enforced by clippy lints).
//! * **Comprehensive Errors:** All failures correspond to a [`TripackError`] type.
//!
//! ## Concurrency
//!
//! Every pass is synchronous and runs to completion on the calling thread.
//! Archives and buffers are not meant to be shared between threads while a
//! pass is running; move a finished [`Buffer`] to hand it elsewhere.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod alloc;
pub mod archive;
pub mod buffer;
pub mod dispatch;
pub mod error;
pub mod handler;

// Private modules
mod serializers;

// --- MACRO SUPPORT MODULES ---

/// Runtime utilities used by the derived code.
#[doc(hidden)]
pub mod rt;

/// Internal re-exports for downstream macros.
#[doc(hidden)]
pub mod internal {
    #[cfg(feature = "serde")]
    pub use bincode;
    #[cfg(feature = "serde")]
    pub use serde;
    pub use zerocopy;
}

// --- RE-EXPORTS ---

pub use alloc::{AllocationPolicy, GlobalAllocator, PooledAllocator};
pub use archive::{
    Archive, ArchiveKind, PackTarget, PackingArchive, SizingArchive, Slot, UnpackingArchive,
};
pub use buffer::{BorrowedBuffer, Buffer, MappedBuffer, SerializationBuffer};
pub use dispatch::{Flat, Packable, Sizable, Unpackable, packed_size_of};
pub use error::{Result, TripackError};
pub use handler::{HandlerBuilder, HandlerOptions, SerializationHandler, SimpleHandler};

#[cfg(feature = "serde")]
pub use serializers::Bincoded;

// The trait and the derive macro share a name, like `serde::Serialize`.
pub use dispatch::Serializable;
#[cfg(feature = "derive")]
pub use tripack_derive::Serializable;

/// Serializes one value into a new buffer on the global heap.
pub fn serialize<T: Sizable + Packable + ?Sized>(value: &T) -> Result<Buffer> {
    SimpleHandler::new().serialize(value)
}

/// Deserializes one value that must span the whole buffer.
pub fn deserialize<T: Unpackable, B: SerializationBuffer + ?Sized>(buffer: &B) -> Result<T> {
    SimpleHandler::new().deserialize(buffer)
}

/// Sizes and packs several values, in order, into one buffer.
///
/// Expands to an expression of type `Result<H::Buffer>`. Each argument is
/// borrowed once by the sizing pass and once by the packing pass, so pass
/// places (variables, fields) rather than expressions with side effects. Any
/// [`SerializationHandler`] other than the default is selected with a
/// `with handler;` prefix:
///
/// ```rust
/// let handler = tripack::SimpleHandler::builder().max_buffer_size(64).build();
/// let buffer = tripack::serialize_values!(with handler; 1u8, 2u16)?;
/// assert_eq!(buffer.capacity(), 3);
/// # Ok::<(), tripack::TripackError>(())
/// ```
#[macro_export]
macro_rules! serialize_values {
    (with $handler:expr; $($value:expr),+ $(,)?) => {{
        #[allow(unused_imports)]
        use $crate::SerializationHandler as _;
        let handler = &$handler;
        let mut sizing = handler.make_sizing_archive();
        $( sizing.add(&$value); )+
        (|| -> $crate::Result<_> {
            let mut packing = handler.make_packing_archive(sizing)?;
            $( packing.pack(&$value)?; )+
            handler.extract_buffer(packing)
        })()
    }};
    ($($value:expr),+ $(,)?) => {
        $crate::serialize_values!(with $crate::SimpleHandler::new(); $($value),+)
    };
}

/// Unpacks several values, in order, into existing places.
///
/// Expands to an expression of type `Result<()>`. Each destination must be a
/// mutable place holding a live value, which is replaced. The handler's
/// end-of-pass checks apply after the last value.
#[macro_export]
macro_rules! unpack_values {
    (with $handler:expr; $buffer:expr => $($dest:expr),+ $(,)?) => {{
        #[allow(unused_imports)]
        use $crate::SerializationHandler as _;
        let handler = &$handler;
        let mut ar = handler.make_unpacking_archive(&$buffer);
        (|| -> $crate::Result<()> {
            $( ar.unpack_into(&mut $dest)?; )+
            handler.finish_unpacking(&ar)
        })()
    }};
    ($buffer:expr => $($dest:expr),+ $(,)?) => {
        $crate::unpack_values!(with $crate::SimpleHandler::new(); $buffer => $($dest),+)
    };
}

/// Constants used throughout the library.
pub mod constants {
    /// Size in bytes of every length and element-count prefix.
    pub const LEN_PREFIX_SIZE: usize = size_of::<usize>();

    /// Size in bytes of a derived enum's variant tag.
    pub const VARIANT_TAG_SIZE: usize = size_of::<u32>();

    /// Default cap on the element count of a sequence whose elements encode to zero bytes.
    pub const DEFAULT_MAX_ELEMENT_COUNT: usize = 1 << 20;
}
