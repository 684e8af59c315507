//! Leaf serializers for standard library types.
//!
//! Nothing in here is special: every impl is written against the public
//! dispatch traits exactly as a downstream crate would write one for its own
//! types.
//!
//! ## Wire formats
//!
//! | Type | Encoding |
//! |---|---|
//! | integers, floats, `usize`, `isize` | in-memory bytes (native endianness) |
//! | `bool` | one byte, `0` or `1` |
//! | `char` | `u32` scalar value |
//! | `()`, `PhantomData<T>` | nothing |
//! | `str`, `String` | `usize` byte length, then UTF-8 bytes |
//! | `[T]`, `Vec<T>`, `VecDeque<T>` | `usize` element count, then each element |
//! | `[T; N]`, tuples | each element, no prefix |
//! | `Option<T>` | `u8` tag (`0` = `None`, `1` = `Some`), then the payload |
//! | `Box<T>`, `&T` | the pointee |
//! | maps and sets | `usize` entry count, then each key (and value) |
//! | [`Bincoded<T>`] | `usize` byte length, then the `bincode` payload |
//!
//! Unordered containers are packed in iteration order; two equal hash maps
//! may therefore produce different bytes, but always decode to equal maps.

mod maps;
mod primitives;
mod sequences;
mod string;

#[cfg(feature = "serde")]
mod bincoded;

#[cfg(feature = "serde")]
pub use bincoded::Bincoded;

use crate::alloc::AllocationPolicy;
use crate::archive::{PackTarget, PackingArchive, SizingArchive, UnpackingArchive};
use crate::error::Result;

/// Accounts for a `usize` length or count prefix.
#[inline]
pub(crate) fn size_len(ar: &mut SizingArchive) {
    ar.add_flat::<usize>();
}

#[inline]
pub(crate) fn pack_len<D: PackTarget>(ar: &mut PackingArchive<D>, len: usize) -> Result<()> {
    ar.pack_item(&len)
}

#[inline]
pub(crate) fn unpack_len<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<usize> {
    ar.unpack_next_item_as::<usize>()
}
