//! The dispatch protocol: how a type declares that it can be measured, packed and unpacked.
//!
//! Each archive kind has one capability trait:
//!
//! | Archive | Capability | Operation |
//! |---|---|---|
//! | [`SizingArchive`] | [`Sizable`] | `compute_size(&self, ar)` |
//! | [`PackingArchive`] | [`Packable`] | `pack(&self, ar)` |
//! | [`UnpackingArchive`] | [`Unpackable`] | `unpack(ar)` / `unpack_into(slot, ar)` |
//!
//! The operation is resolved statically from the value's type. A type
//! participates by implementing the traits; there is no registry to update
//! and no shared base type. Composite types implement them by recursing into
//! their members, so containers of containers compose without special cases.
//!
//! # Flat types
//!
//! Trivially copyable types (integers, floats, arrays of them, `#[repr(C)]`
//! plain-old-data structs) are serialized as their in-memory bytes. Such a
//! type implements [`Flat`], whose supertraits come from `zerocopy` and
//! prove at compile time that every byte pattern round-trips, then gets the
//! three capabilities from [`impl_flat!`](crate::impl_flat):
//!
//! ```rust
//! use zerocopy::{FromBytes, Immutable, IntoBytes};
//!
//! #[derive(Clone, Copy, Debug, PartialEq, FromBytes, IntoBytes, Immutable)]
//! #[repr(C)]
//! struct Point {
//!     x: f32,
//!     y: f32,
//! }
//!
//! tripack::impl_flat!(Point);
//! tripack::assert_serializable!(Point);
//!
//! let buffer = tripack::serialize(&Point { x: 1.0, y: -2.5 })?;
//! assert_eq!(buffer.capacity(), 8);
//! # Ok::<(), tripack::TripackError>(())
//! ```

use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::alloc::AllocationPolicy;
use crate::archive::{PackTarget, PackingArchive, SizingArchive, Slot, UnpackingArchive};
use crate::error::{Result, TripackError};

/// Contributes a value's encoded length to a sizing pass.
pub trait Sizable {
    /// Adds the number of bytes [`Packable::pack`] will write for `self`.
    fn compute_size(&self, ar: &mut SizingArchive);

    /// Adds the bytes of a contiguous run of values, without any prefix.
    ///
    /// Sequence serializers call this instead of looping themselves, so
    /// [`impl_flat!`](crate::impl_flat) can account for the whole run at once.
    fn size_slice(items: &[Self], ar: &mut SizingArchive)
    where
        Self: Sized,
    {
        for item in items {
            item.compute_size(ar);
        }
    }
}

/// Writes a value's encoded bytes during a packing pass.
pub trait Packable {
    /// Writes `self` at the archive's cursor.
    ///
    /// Must write exactly as many bytes as [`Sizable::compute_size`] accounted for.
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()>;

    /// Writes a contiguous run of values, without any prefix.
    ///
    /// Flat types override this with a single bulk copy.
    fn pack_slice<D: PackTarget>(items: &[Self], ar: &mut PackingArchive<D>) -> Result<()>
    where
        Self: Sized,
    {
        for item in items {
            item.pack(ar)?;
        }
        Ok(())
    }
}

/// Reconstructs a value during an unpacking pass.
pub trait Unpackable: Sized {
    /// Constructs a new value from the bytes at the archive's cursor.
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self>;

    /// Reconstructs a value into a slot that already holds a live `Self`.
    ///
    /// The default constructs a fresh value and then replaces the occupant,
    /// so the slot is untouched if unpacking fails. Types owning heap storage
    /// override this to reuse the occupant's allocation.
    fn unpack_into<A: AllocationPolicy>(
        slot: Slot<'_, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<()> {
        let value = Self::unpack(ar)?;
        slot.fill(value);
        Ok(())
    }

    /// Appends `count` values read at the cursor to `dest`.
    ///
    /// `count` usually comes from the source, so the default reserves no more
    /// than the bytes left can justify and bounds runs of zero-byte elements.
    fn unpack_to_vec<A: AllocationPolicy>(
        dest: &mut Vec<Self>,
        count: usize,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<()> {
        dest.try_reserve(ar.capacity_hint(count))?;
        ar.for_each_element(count, |ar| {
            dest.push(Self::unpack(ar)?);
            Ok(())
        })
    }

    /// Reads exactly `N` values at the cursor.
    fn unpack_array<A: AllocationPolicy, const N: usize>(
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<[Self; N]> {
        let mut items = Vec::new();
        items.try_reserve_exact(N)?;
        for _ in 0..N {
            items.push(Self::unpack(ar)?);
        }
        items.try_into().map_err(|rejected: Vec<Self>| {
            TripackError::invalid_data(format!(
                "expected {N} array elements, decoded {}",
                rejected.len()
            ))
        })
    }
}

/// A type supporting all three phases.
pub trait Serializable: Sizable + Packable + Unpackable {}

impl<T: Sizable + Packable + Unpackable> Serializable for T {}

/// Marks a trivially copyable type whose in-memory bytes are its encoding.
///
/// The supertraits guarantee the type has no padding and no invalid bit
/// patterns, so packing is a `memcpy` out of the value and unpacking a
/// `memcpy` back in. `bool` and `char` are deliberately not `Flat`.
pub trait Flat: IntoBytes + FromBytes + Immutable + Copy + 'static {}

impl<T: Flat, const N: usize> Flat for [T; N] {}

/// Implements [`Flat`], [`Sizable`], [`Packable`] and [`Unpackable`] for trivially copyable types.
///
/// Each value contributes exactly `size_of::<T>()` bytes, and runs of values
/// inside slices, vectors and arrays move as one bulk copy.
#[macro_export]
macro_rules! impl_flat {
    ($($t:ty),+ $(,)?) => {
        $(
            impl $crate::Flat for $t {}

            impl $crate::Sizable for $t {
                #[inline]
                fn compute_size(&self, ar: &mut $crate::SizingArchive) {
                    ar.add_flat::<$t>();
                }

                #[inline]
                fn size_slice(items: &[Self], ar: &mut $crate::SizingArchive) {
                    ar.add_flat_slice::<$t>(items.len());
                }
            }

            impl $crate::Packable for $t {
                #[inline]
                fn pack<D: $crate::PackTarget>(
                    &self,
                    ar: &mut $crate::PackingArchive<D>,
                ) -> $crate::Result<()> {
                    ar.pack_item(self)
                }

                #[inline]
                fn pack_slice<D: $crate::PackTarget>(
                    items: &[Self],
                    ar: &mut $crate::PackingArchive<D>,
                ) -> $crate::Result<()> {
                    ar.pack_data_raw(items)
                }
            }

            impl $crate::Unpackable for $t {
                #[inline]
                fn unpack<A: $crate::AllocationPolicy>(
                    ar: &mut $crate::UnpackingArchive<'_, A>,
                ) -> $crate::Result<Self> {
                    ar.unpack_next_item_as::<$t>()
                }

                #[inline]
                fn unpack_to_vec<A: $crate::AllocationPolicy>(
                    dest: &mut ::std::vec::Vec<Self>,
                    count: usize,
                    ar: &mut $crate::UnpackingArchive<'_, A>,
                ) -> $crate::Result<()> {
                    ar.unpack_data_raw_to_vec(dest, count)
                }

                #[inline]
                fn unpack_array<A: $crate::AllocationPolicy, const N: usize>(
                    ar: &mut $crate::UnpackingArchive<'_, A>,
                ) -> $crate::Result<[Self; N]> {
                    ar.unpack_next_item_as::<[$t; N]>()
                }
            }
        )+
    };
}

// --- Capability detection ---

/// Compile-time assertion that the listed types implement [`Sizable`].
#[macro_export]
macro_rules! assert_sizable {
    ($($t:ty),+ $(,)?) => {
        const _: () = {
            const fn check<T: $crate::Sizable + ?Sized>() {}
            $( check::<$t>(); )+
        };
    };
}

/// Compile-time assertion that the listed types implement [`Packable`].
#[macro_export]
macro_rules! assert_packable {
    ($($t:ty),+ $(,)?) => {
        const _: () = {
            const fn check<T: $crate::Packable + ?Sized>() {}
            $( check::<$t>(); )+
        };
    };
}

/// Compile-time assertion that the listed types implement [`Unpackable`].
#[macro_export]
macro_rules! assert_unpackable {
    ($($t:ty),+ $(,)?) => {
        const _: () = {
            const fn check<T: $crate::Unpackable>() {}
            $( check::<$t>(); )+
        };
    };
}

/// Compile-time assertion that the listed types support all three phases.
#[macro_export]
macro_rules! assert_serializable {
    ($($t:ty),+ $(,)?) => {
        const _: () = {
            const fn check<T: $crate::Serializable>() {}
            $( check::<$t>(); )+
        };
    };
}

/// Number of bytes `value` will occupy once packed.
///
/// Equivalent to running a one-value sizing pass.
pub fn packed_size_of<T: Sizable + ?Sized>(value: &T) -> usize {
    let mut ar = SizingArchive::new();
    ar.add(value);
    ar.size()
}
