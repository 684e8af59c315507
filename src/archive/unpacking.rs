use std::mem::MaybeUninit;

use zerocopy::{FromBytes, FromZeros, IntoBytes};

use super::{Archive, ArchiveKind};
use crate::constants::DEFAULT_MAX_ELEMENT_COUNT;
use crate::alloc::{AllocationPolicy, GlobalAllocator};
use crate::buffer::SerializationBuffer;
use crate::dispatch::{Flat, Unpackable};
use crate::error::{Result, TripackError};

/// Reconstructs values by reading byte representations from a source buffer.
///
/// The archive borrows its source, so unpacking straight out of a
/// transport's receive region (a [`BorrowedBuffer`](crate::BorrowedBuffer) or
/// a [`MappedBuffer`](crate::MappedBuffer)) involves no intermediate copy.
/// It also carries the allocation policy that leaf serializers use for
/// variable-length storage.
#[derive(Debug)]
pub struct UnpackingArchive<'a, A: AllocationPolicy = GlobalAllocator> {
    src: &'a [u8],
    spot: usize,
    alloc: A,
    max_elements: usize,
}

impl<'a, A: AllocationPolicy> UnpackingArchive<'a, A> {
    /// Creates an archive reading `src` from its first byte.
    pub fn new(src: &'a [u8], alloc: A) -> Self {
        Self {
            src,
            spot: 0,
            alloc,
            max_elements: DEFAULT_MAX_ELEMENT_COUNT,
        }
    }

    /// Sets the largest element count accepted for elements that encode to zero bytes.
    ///
    /// Elements that occupy bytes are bounded by the source itself; zero-byte
    /// elements (`()`, unit structs, `PhantomData`) are not, so a count read
    /// from a hostile buffer would otherwise drive an unbounded loop.
    pub fn with_element_limit(mut self, limit: usize) -> Self {
        self.max_elements = limit;
        self
    }

    /// The zero-byte element limit of this pass.
    #[inline]
    pub fn element_limit(&self) -> usize {
        self.max_elements
    }

    /// Creates an archive over any owned or borrowed serialization buffer.
    pub fn from_buffer<B: SerializationBuffer + ?Sized>(buffer: &'a B, alloc: A) -> Self {
        Self::new(buffer.data(), alloc)
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn offset(&self) -> usize {
        self.spot
    }

    /// Total size of the source.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.src.len()
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.src.len() - self.spot
    }

    /// Fails with [`TripackError::TrailingBytes`] unless every byte was consumed.
    pub fn expect_exhausted(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(TripackError::TrailingBytes { remaining }),
        }
    }

    /// Returns a zero-copy view of the next `len` bytes and advances past them.
    pub fn unpack_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let start = self.spot;
        let capacity = self.src.len();
        match start.checked_add(len) {
            Some(end) if end <= capacity => {
                self.spot = end;
                Ok(&self.src[start..end])
            }
            _ => {
                tracing::warn!(offset = start, requested = len, capacity, "unpacking overrun");
                Err(TripackError::Overrun {
                    phase: ArchiveKind::Unpacking,
                    offset: start,
                    requested: len,
                    capacity,
                })
            }
        }
    }

    /// Copies `dest.len()` flat values out of the source into caller storage.
    pub fn unpack_data_raw<T: Flat>(&mut self, dest: &mut [T]) -> Result<()> {
        let len = size_of::<T>().checked_mul(dest.len()).ok_or_else(|| {
            TripackError::invalid_data(format!("{} elements overflow usize", dest.len()))
        })?;
        let bytes = self.unpack_bytes(len)?;
        dest.as_mut_bytes().copy_from_slice(bytes);
        Ok(())
    }

    /// Appends `count` flat values copied out of the source in one bulk copy.
    ///
    /// The source range is bounds-checked before `dest` grows, so a hostile
    /// count fails on the cursor without allocating.
    pub fn unpack_data_raw_to_vec<T: Flat>(
        &mut self,
        dest: &mut Vec<T>,
        count: usize,
    ) -> Result<()> {
        if size_of::<T>() == 0 {
            self.check_element_count(count)?;
        }
        // Saturation turns an overflowing length into an ordinary overrun.
        let bytes = self.unpack_bytes(size_of::<T>().saturating_mul(count))?;
        let start = dest.len();
        dest.try_reserve(count)?;
        dest.resize(start + count, T::new_zeroed());
        dest[start..].as_mut_bytes().copy_from_slice(bytes);
        Ok(())
    }

    /// Reads one flat value at the cursor and advances by `size_of::<T>()`.
    ///
    /// The source does not need to be aligned for `T`.
    pub fn unpack_next_item_as<T: Flat>(&mut self) -> Result<T> {
        let bytes = self.unpack_bytes(size_of::<T>())?;
        T::read_from_bytes(bytes).map_err(|_| {
            TripackError::invalid_data(format!(
                "cannot read {} from {} bytes",
                std::any::type_name::<T>(),
                bytes.len()
            ))
        })
    }

    /// Reads one flat value at the cursor directly into uninitialized caller storage.
    ///
    /// On success the storage is initialized and a reference to it is returned;
    /// on failure it is left untouched.
    pub fn unpack_next_item_at<'d, T: Flat>(
        &mut self,
        dest: &'d mut MaybeUninit<T>,
    ) -> Result<&'d mut T> {
        let value = self.unpack_next_item_as::<T>()?;
        Ok(dest.write(value))
    }

    /// Dispatches an unpack of a fresh `T`.
    #[inline]
    pub fn unpack<T: Unpackable>(&mut self) -> Result<T> {
        T::unpack(self)
    }

    /// Unpacks into an existing value, replacing (and dropping) its previous contents.
    ///
    /// Returns the archive for chaining:
    ///
    /// ```rust
    /// use tripack::SerializationHandler;
    ///
    /// let buffer = tripack::serialize(&(42i32, String::from("hello")))?;
    ///
    /// let (mut i, mut s) = (0i32, String::new());
    /// tripack::SimpleHandler::new()
    ///     .make_unpacking_archive(&buffer)
    ///     .unpack_into(&mut i)?
    ///     .unpack_into(&mut s)?;
    /// assert_eq!((i, s.as_str()), (42, "hello"));
    /// # Ok::<(), tripack::TripackError>(())
    /// ```
    #[inline]
    pub fn unpack_into<T: Unpackable>(&mut self, dest: &mut T) -> Result<&mut Self> {
        T::unpack_into(Slot::new(dest), self)?;
        Ok(self)
    }

    /// Caps a pre-allocation request by the bytes actually left in the source.
    ///
    /// A corrupt or hostile element count must not be able to trigger a huge
    /// allocation before the cursor has a chance to fail.
    #[inline]
    pub fn capacity_hint(&self, count: usize) -> usize {
        count.min(self.remaining())
    }

    /// Fails with [`TripackError::InvalidData`] if `count` exceeds the zero-byte element limit.
    pub fn check_element_count(&self, count: usize) -> Result<()> {
        if count > self.max_elements {
            tracing::warn!(count, limit = self.max_elements, "element count exceeds limit");
            return Err(TripackError::invalid_data(format!(
                "{count} zero-byte elements exceed the limit of {}",
                self.max_elements
            )));
        }
        Ok(())
    }

    /// Runs `each` once per element of a count-prefixed sequence.
    ///
    /// Every run that leaves the cursor where it was is checked against the
    /// element limit, so the total number of runs is bounded by the bytes in
    /// the source plus the limit.
    pub fn for_each_element<F>(&mut self, count: usize, mut each: F) -> Result<()>
    where
        F: FnMut(&mut Self) -> Result<()>,
    {
        for _ in 0..count {
            let before = self.spot;
            each(self)?;
            if self.spot == before {
                self.check_element_count(count)?;
            }
        }
        Ok(())
    }

    /// The allocation policy bound to this pass.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Converts a copy of the bound allocation policy into the shape a leaf serializer needs.
    pub fn allocator_as<B: From<A>>(&self) -> B {
        B::from(self.alloc.clone())
    }
}

impl<A: AllocationPolicy> Archive for UnpackingArchive<'_, A> {
    const KIND: ArchiveKind = ArchiveKind::Unpacking;
}

/// A destination slot that already holds a live value of type `T`.
///
/// Unpacking into a slot overwrites existing storage rather than allocating
/// fresh storage. [`Slot::fill`] installs the new value and drops the previous
/// occupant; [`Slot::get_mut`] lets a leaf serializer reuse the occupant's
/// heap allocation before filling it.
#[derive(Debug)]
pub struct Slot<'s, T> {
    dest: &'s mut T,
}

impl<'s, T> Slot<'s, T> {
    /// Wraps a live destination.
    pub fn new(dest: &'s mut T) -> Self {
        Self { dest }
    }

    /// The current occupant.
    pub fn get_mut(&mut self) -> &mut T {
        &mut *self.dest
    }

    /// Replaces the occupant with `value`, dropping the previous one.
    pub fn fill(self, value: T) -> &'s mut T {
        let Self { dest } = self;
        let previous = std::mem::replace(dest, value);
        drop(previous);
        dest
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reads_flat_values_from_unaligned_offsets() {
        let mut src = vec![0xAAu8];
        src.extend_from_slice(&7u64.to_ne_bytes());
        let mut ar = UnpackingArchive::new(&src, GlobalAllocator);
        ar.unpack_bytes(1).unwrap();
        assert_eq!(ar.unpack_next_item_as::<u64>().unwrap(), 7);
        assert!(ar.expect_exhausted().is_ok());
    }

    #[test]
    fn placement_into_uninit_storage() {
        let src = 0x1234u16.to_ne_bytes();
        let mut ar = UnpackingArchive::new(&src, GlobalAllocator);
        let mut storage = MaybeUninit::<u16>::uninit();
        let value = ar.unpack_next_item_at(&mut storage).unwrap();
        assert_eq!(*value, 0x1234);
    }

    #[test]
    fn raw_bulk_copy_and_overrun() {
        let src = [1u8, 2, 3, 4, 5];
        let mut ar = UnpackingArchive::new(&src, GlobalAllocator);
        let mut out = [0u8; 4];
        ar.unpack_data_raw(&mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
        assert_eq!(ar.capacity_hint(100), 1);
        let err = ar.unpack_next_item_as::<u32>().unwrap_err();
        assert!(err.is_overrun());
        assert_eq!(ar.offset(), 4);
        assert!(matches!(
            ar.expect_exhausted(),
            Err(TripackError::TrailingBytes { remaining: 1 })
        ));
    }

    #[test]
    fn bulk_copy_into_vec_appends() {
        let mut src = Vec::new();
        for v in [3u32, 4, 5] {
            src.extend_from_slice(&v.to_ne_bytes());
        }
        let mut ar = UnpackingArchive::new(&src[1..], GlobalAllocator);
        let mut out = vec![9u16];
        ar.unpack_data_raw_to_vec::<u16>(&mut out, 2).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(ar.offset(), 4);

        let mut ar = UnpackingArchive::new(&src, GlobalAllocator);
        let mut out = Vec::new();
        ar.unpack_data_raw_to_vec::<u32>(&mut out, 3).unwrap();
        assert_eq!(out, [3, 4, 5]);

        let mut ar = UnpackingArchive::new(&src, GlobalAllocator);
        let err = ar.unpack_data_raw_to_vec::<u32>(&mut out, usize::MAX).unwrap_err();
        assert!(err.is_overrun());
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn zero_byte_elements_are_bounded() {
        let mut ar = UnpackingArchive::new(&[0u8; 0][..], GlobalAllocator).with_element_limit(8);
        let mut runs = 0;
        ar.for_each_element(8, |_| {
            runs += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(runs, 8);

        let err = ar
            .for_each_element(usize::MAX, |_| {
                runs += 1;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, TripackError::InvalidData(_)));
        assert_eq!(runs, 9);

        let mut zsts: Vec<[u8; 0]> = Vec::new();
        let err = ar.unpack_data_raw_to_vec(&mut zsts, 9).unwrap_err();
        assert!(matches!(err, TripackError::InvalidData(_)));
    }

    #[test]
    fn allocator_converts_to_requested_shape() {
        use crate::alloc::PooledAllocator;

        let pool = PooledAllocator::new();
        let ar = UnpackingArchive::new(&[0u8; 0][..], pool.clone());
        let global: GlobalAllocator = ar.allocator_as();
        assert_eq!(global, GlobalAllocator);
        let same: PooledAllocator = ar.allocator_as();
        same.release_bytes(vec![0; 8]);
        assert_eq!(pool.pooled(), 1);
    }

    #[test]
    fn slot_fill_drops_previous_occupant() {
        use std::rc::Rc;
        let tracker = Rc::new(());
        let mut occupant = Some(Rc::clone(&tracker));
        assert_eq!(Rc::strong_count(&tracker), 2);
        Slot::new(&mut occupant).fill(None);
        assert_eq!(Rc::strong_count(&tracker), 1);
        assert!(occupant.is_none());
    }
}
