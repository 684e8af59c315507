use super::{Archive, ArchiveKind};
use crate::dispatch::{Flat, Sizable};

/// Accumulates the number of bytes a sequence of values will occupy once packed.
///
/// The sizing pass must visit values in exactly the order, and the exact
/// count, that the packing pass will later visit them.
///
/// ```rust
/// use tripack::SizingArchive;
///
/// let mut ar = SizingArchive::new();
/// ar.add(&42i32).add(&3.14f64);
/// assert_eq!(ar.size(), 12);
/// ```
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SizingArchive {
    size: usize,
}

impl SizingArchive {
    /// Creates an archive with a running total of zero.
    pub fn new() -> Self {
        Self { size: 0 }
    }

    /// Adds `size` raw bytes to the running total.
    ///
    /// Used by leaf serializers that account for variable-length payloads
    /// directly. Saturates instead of wrapping; an absurd total is rejected
    /// later when the destination buffer is allocated.
    #[inline]
    pub fn add_to_size_raw(&mut self, size: usize) {
        self.size = self.size.saturating_add(size);
    }

    /// Adds the in-memory size of one flat value.
    #[inline]
    pub fn add_flat<T: Flat>(&mut self) {
        self.add_to_size_raw(size_of::<T>());
    }

    /// Adds the in-memory size of `count` contiguous flat values.
    #[inline]
    pub fn add_flat_slice<T: Flat>(&mut self, count: usize) {
        self.add_to_size_raw(size_of::<T>().saturating_mul(count));
    }

    /// Dispatches `value` against this archive and returns the archive for chaining.
    #[inline]
    pub fn add<T: Sizable + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.compute_size(self);
        self
    }

    /// Returns the bytes accumulated so far.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Archive for SizingArchive {
    const KIND: ArchiveKind = ArchiveKind::Sizing;
}
