use zerocopy::IntoBytes;

use super::{Archive, ArchiveKind};
use crate::alloc::AllocationPolicy;
use crate::buffer::Buffer;
use crate::dispatch::{Flat, Packable};
use crate::error::{Result, TripackError};

/// A writable destination for a packing pass.
///
/// Implemented for an owned [`Buffer`] (the façade's default), a plain
/// `Vec<u8>` and a caller's `&mut [u8]`, so a pass can pack directly into a
/// transport's pre-existing transmit region.
pub trait PackTarget {
    /// The full writable region; its length is the pass capacity.
    fn target_bytes(&mut self) -> &mut [u8];
}

impl<A: AllocationPolicy> PackTarget for Buffer<A> {
    fn target_bytes(&mut self) -> &mut [u8] {
        self.data_mut()
    }
}

impl PackTarget for &mut [u8] {
    fn target_bytes(&mut self) -> &mut [u8] {
        &mut **self
    }
}

impl PackTarget for Vec<u8> {
    fn target_bytes(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

/// Writes the byte representation of a value sequence into a pre-sized destination.
///
/// Every cursor advance is bounds-checked: writing past the destination fails
/// with [`TripackError::Overrun`] and leaves the cursor where the failing
/// request started.
#[derive(Debug)]
pub struct PackingArchive<D: PackTarget> {
    dest: D,
    spot: usize,
    capacity: usize,
}

impl<D: PackTarget> PackingArchive<D> {
    /// Creates an archive whose cursor starts at the beginning of `dest`.
    pub fn new(mut dest: D) -> Self {
        let capacity = dest.target_bytes().len();
        Self {
            dest,
            spot: 0,
            capacity,
        }
    }

    /// Bytes written so far.
    #[inline]
    pub fn offset(&self) -> usize {
        self.spot
    }

    /// Total bytes the destination can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes left between the cursor and the end of the destination.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.spot
    }

    /// Claims the next `len` bytes of the destination and advances the cursor past them.
    ///
    /// The returned region holds whatever was there before; the caller is
    /// expected to overwrite all of it.
    pub fn reserve_bytes(&mut self, len: usize) -> Result<&mut [u8]> {
        let start = self.spot;
        let capacity = self.capacity;
        let end = match start.checked_add(len) {
            Some(end) if end <= capacity => end,
            _ => {
                tracing::warn!(offset = start, requested = len, capacity, "packing overrun");
                return Err(TripackError::Overrun {
                    phase: ArchiveKind::Packing,
                    offset: start,
                    requested: len,
                    capacity,
                });
            }
        };
        self.spot = end;
        Ok(&mut self.dest.target_bytes()[start..end])
    }

    /// Copies `bytes` verbatim at the cursor.
    #[inline]
    pub fn pack_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve_bytes(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Copies the underlying bytes of `items` verbatim at the cursor.
    ///
    /// This is a byte-level copy, not an element-wise assignment.
    #[inline]
    pub fn pack_data_raw<T: Flat>(&mut self, items: &[T]) -> Result<()> {
        self.pack_bytes(items.as_bytes())
    }

    /// Copies one flat value at the cursor and advances by `size_of::<T>()`.
    #[inline]
    pub fn pack_item<T: Flat>(&mut self, value: &T) -> Result<()> {
        self.pack_bytes(value.as_bytes())
    }

    /// Dispatches `value` against this archive and returns the archive for chaining.
    ///
    /// ```rust
    /// let mut sizing = tripack::SizingArchive::new();
    /// sizing.add(&1u8).add("hi");
    ///
    /// let mut region = vec![0u8; sizing.size()];
    /// let mut ar = tripack::PackingArchive::new(region.as_mut_slice());
    /// ar.pack(&1u8)?.pack("hi")?;
    /// assert_eq!(ar.remaining(), 0);
    /// # Ok::<(), tripack::TripackError>(())
    /// ```
    #[inline]
    pub fn pack<T: Packable + ?Sized>(&mut self, value: &T) -> Result<&mut Self> {
        value.pack(self)?;
        Ok(self)
    }

    /// Ends the pass, returning the destination and the number of bytes written.
    pub fn into_parts(self) -> (D, usize) {
        (self.dest, self.spot)
    }
}

impl<D: PackTarget> Archive for PackingArchive<D> {
    const KIND: ArchiveKind = ArchiveKind::Packing;
}
