//! Handlers sequence the three passes.
//!
//! A [`SerializationHandler`] creates the archives for each pass and checks
//! that the passes agreed. Its provided methods build the one-call façade on
//! top: [`serialize`](SerializationHandler::serialize) runs a sizing pass,
//! packs into a buffer of exactly that size and hands the buffer back;
//! [`deserialize`](SerializationHandler::deserialize) wraps any buffer in an
//! unpacking archive and reconstructs one value. Code written against the
//! trait works with any handler, so the allocation strategy or the buffer
//! type can be swapped without touching it.
//!
//! [`SimpleHandler`] is the handler shipped with the crate. The handler
//! knows nothing about specific types; it only creates archives.

use crate::alloc::{AllocationPolicy, GlobalAllocator};
use crate::archive::{PackTarget, PackingArchive, SizingArchive, UnpackingArchive};
use crate::buffer::{Buffer, SerializationBuffer};
use crate::constants::DEFAULT_MAX_ELEMENT_COUNT;
use crate::dispatch::{Packable, Sizable, Unpackable};
use crate::error::{Result, TripackError};

/// Creates the archives of a serialization and owns the buffers it produces.
///
/// Implementors supply the pass constructors; the rest is provided.
///
/// ```rust
/// use tripack::{SerializationHandler, SimpleHandler};
///
/// fn round_trip<H: SerializationHandler>(handler: &H, text: &str) -> tripack::Result<String> {
///     let buffer = handler.serialize(text)?;
///     handler.deserialize(&buffer)
/// }
///
/// assert_eq!(round_trip(&SimpleHandler::new(), "hello")?, "hello");
/// # Ok::<(), tripack::TripackError>(())
/// ```
pub trait SerializationHandler {
    /// Policy bound to every unpacking archive this handler creates.
    type Allocator: AllocationPolicy;

    /// The owned buffer a packing pass fills.
    type Buffer: SerializationBuffer + PackTarget;

    /// Starts a sizing pass.
    fn make_sizing_archive(&self) -> SizingArchive {
        SizingArchive::new()
    }

    /// Consumes a finished sizing pass and allocates a buffer of exactly that size.
    fn make_packing_archive(&self, sizing: SizingArchive) -> Result<PackingArchive<Self::Buffer>>;

    /// Starts an unpacking pass over any owned or borrowed buffer.
    fn make_unpacking_archive<'b, B: SerializationBuffer + ?Sized>(
        &self,
        buffer: &'b B,
    ) -> UnpackingArchive<'b, Self::Allocator>;

    /// Applies the end-of-pass checks of this handler.
    ///
    /// The default requires every byte of the source to have been consumed.
    fn finish_unpacking(&self, ar: &UnpackingArchive<'_, Self::Allocator>) -> Result<()> {
        ar.expect_exhausted()
    }

    /// Runs a one-value sizing pass.
    fn get_size<T: Sizable + ?Sized>(&self, value: &T) -> usize {
        let mut sizing = self.make_sizing_archive();
        sizing.add(value);
        sizing.size()
    }

    /// Ends a packing pass and returns its destination.
    ///
    /// Fails with [`TripackError::SizeMismatch`] if the pass did not fill the
    /// destination exactly, i.e. the packing pass visited different values
    /// than the sizing pass it was created from.
    fn extract_buffer<D: PackTarget>(&self, packing: PackingArchive<D>) -> Result<D> {
        let sized = packing.capacity();
        let (dest, packed) = packing.into_parts();
        if packed != sized {
            tracing::warn!(sized, packed, "packing pass did not fill its buffer");
            return Err(TripackError::SizeMismatch { sized, packed });
        }
        Ok(dest)
    }

    /// Sizes `value`, packs it into a freshly allocated buffer and returns the buffer.
    fn serialize<T: Sizable + Packable + ?Sized>(&self, value: &T) -> Result<Self::Buffer> {
        // 1. Sizing pass
        let mut sizing = self.make_sizing_archive();
        sizing.add(value);
        tracing::debug!(size = sizing.size(), "sized value");

        // 2. Packing pass into an exact-size buffer
        let mut packing = self.make_packing_archive(sizing)?;
        packing.pack(value)?;

        // 3. Extraction
        let buffer = self.extract_buffer(packing)?;
        tracing::debug!(size = buffer.capacity(), "packed value");
        Ok(buffer)
    }

    /// Reconstructs a `T` from the start of `buffer`, then applies the end-of-pass checks.
    fn deserialize<T: Unpackable, B: SerializationBuffer + ?Sized>(&self, buffer: &B) -> Result<T> {
        let mut ar = self.make_unpacking_archive(buffer);
        let value = ar.unpack::<T>()?;
        self.finish_unpacking(&ar)?;
        Ok(value)
    }

    /// Reconstructs a `T` from `buffer` into `dest`, replacing its previous contents.
    fn deserialize_into<T: Unpackable, B: SerializationBuffer + ?Sized>(
        &self,
        buffer: &B,
        dest: &mut T,
    ) -> Result<()> {
        let mut ar = self.make_unpacking_archive(buffer);
        ar.unpack_into(dest)?;
        self.finish_unpacking(&ar)
    }
}

/// Runtime knobs of a [`SimpleHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerOptions {
    /// Upper bound on the size of a packed buffer. `None` means unbounded.
    pub max_buffer_size: Option<usize>,
    /// Whether unpacking rejects buffers with unread bytes.
    pub require_exhausted: bool,
    /// Largest count accepted for a sequence whose elements encode to zero bytes.
    pub max_element_count: usize,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            max_buffer_size: None,
            require_exhausted: true,
            max_element_count: DEFAULT_MAX_ELEMENT_COUNT,
        }
    }
}

/// Sequences sizing, packing and unpacking passes with one allocation policy.
///
/// # Example
///
/// ```rust
/// use tripack::{SerializationHandler, SimpleHandler};
///
/// let handler = SimpleHandler::new();
///
/// // Interleave several values through one pair of passes.
/// let (i, val, text) = (42i32, 3.14f64, String::from("hello world"));
/// let mut sizing = handler.make_sizing_archive();
/// sizing.add(&i).add(&val).add(&text);
/// let mut packing = handler.make_packing_archive(sizing)?;
/// packing.pack(&i)?.pack(&val)?.pack(&text)?;
/// let buffer = handler.extract_buffer(packing)?;
///
/// let (mut i2, mut val2, mut text2) = (0i32, 0f64, String::new());
/// handler
///     .make_unpacking_archive(&buffer)
///     .unpack_into(&mut i2)?
///     .unpack_into(&mut val2)?
///     .unpack_into(&mut text2)?;
/// assert_eq!((i2, val2, text2.as_str()), (42, 3.14, "hello world"));
/// # Ok::<(), tripack::TripackError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimpleHandler<A: AllocationPolicy = GlobalAllocator> {
    alloc: A,
    options: HandlerOptions,
}

impl SimpleHandler<GlobalAllocator> {
    /// A handler on the global heap with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts configuring a handler.
    pub fn builder() -> HandlerBuilder<GlobalAllocator> {
        HandlerBuilder::default()
    }
}

impl<A: AllocationPolicy> SimpleHandler<A> {
    /// A handler drawing buffer storage from `alloc`, with default options.
    pub fn with_allocator(alloc: A) -> Self {
        Self {
            alloc,
            options: HandlerOptions::default(),
        }
    }

    /// The options this handler was built with.
    pub fn options(&self) -> &HandlerOptions {
        &self.options
    }

    /// The allocation policy bound to this handler.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Consumes a finished sizing pass and packs into the front of a caller-owned region.
    ///
    /// The archive covers exactly the sized prefix of `dest`; bytes past it
    /// are left untouched.
    pub fn make_packing_archive_into<'d>(
        &self,
        sizing: SizingArchive,
        dest: &'d mut [u8],
    ) -> Result<PackingArchive<&'d mut [u8]>> {
        let size = self.check_limit(sizing.size())?;
        let available = dest.len();
        let region = dest
            .get_mut(..size)
            .ok_or(TripackError::InsufficientCapacity {
                required: size,
                available,
            })?;
        Ok(PackingArchive::new(region))
    }

    /// Sizes `value` and packs it into the front of `dest`, returning the bytes written.
    pub fn serialize_into<T: Sizable + Packable + ?Sized>(
        &self,
        value: &T,
        dest: &mut [u8],
    ) -> Result<usize> {
        let mut sizing = self.make_sizing_archive();
        sizing.add(value);
        let mut packing = self.make_packing_archive_into(sizing, dest)?;
        packing.pack(value)?;
        let written = self.extract_buffer(packing)?.len();
        tracing::debug!(size = written, "packed value into caller region");
        Ok(written)
    }

    fn check_limit(&self, size: usize) -> Result<usize> {
        match self.options.max_buffer_size {
            Some(limit) if size > limit => {
                tracing::warn!(size, limit, "serialization exceeds buffer limit");
                Err(TripackError::LimitExceeded { size, limit })
            }
            _ => Ok(size),
        }
    }
}

impl<A: AllocationPolicy> SerializationHandler for SimpleHandler<A> {
    type Allocator = A;
    type Buffer = Buffer<A>;

    fn make_packing_archive(&self, sizing: SizingArchive) -> Result<PackingArchive<Buffer<A>>> {
        let size = self.check_limit(sizing.size())?;
        let buffer = Buffer::with_capacity_in(size, self.alloc.clone())?;
        Ok(PackingArchive::new(buffer))
    }

    fn make_unpacking_archive<'b, B: SerializationBuffer + ?Sized>(
        &self,
        buffer: &'b B,
    ) -> UnpackingArchive<'b, A> {
        UnpackingArchive::from_buffer(buffer, self.alloc.clone())
            .with_element_limit(self.options.max_element_count)
    }

    // With `require_exhausted` off, unread bytes are left for the caller.
    fn finish_unpacking(&self, ar: &UnpackingArchive<'_, A>) -> Result<()> {
        tracing::debug!(consumed = ar.offset(), capacity = ar.capacity(), "unpacked value");
        if self.options.require_exhausted {
            ar.expect_exhausted()?;
        }
        Ok(())
    }
}

/// Fluent construction of a [`SimpleHandler`].
///
/// ```rust
/// use tripack::{PooledAllocator, SimpleHandler};
///
/// let handler = SimpleHandler::builder()
///     .allocator(PooledAllocator::new())
///     .max_buffer_size(1 << 20)
///     .require_exhausted(false)
///     .build();
/// assert_eq!(handler.options().max_buffer_size, Some(1 << 20));
/// ```
#[derive(Debug, Clone, Default)]
pub struct HandlerBuilder<A: AllocationPolicy = GlobalAllocator> {
    alloc: A,
    options: HandlerOptions,
}

impl<A: AllocationPolicy> HandlerBuilder<A> {
    /// Switches the allocation policy.
    pub fn allocator<B: AllocationPolicy>(self, alloc: B) -> HandlerBuilder<B> {
        HandlerBuilder {
            alloc,
            options: self.options,
        }
    }

    /// Rejects serializations larger than `limit` bytes.
    pub fn max_buffer_size(mut self, limit: usize) -> Self {
        self.options.max_buffer_size = Some(limit);
        self
    }

    /// Whether `deserialize` rejects buffers with unread bytes.
    pub fn require_exhausted(mut self, require: bool) -> Self {
        self.options.require_exhausted = require;
        self
    }

    /// Caps the count of sequences whose elements encode to zero bytes.
    pub fn max_element_count(mut self, limit: usize) -> Self {
        self.options.max_element_count = limit;
        self
    }

    /// Replaces all options at once.
    pub fn options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }

    /// Finishes the handler.
    pub fn build(self) -> SimpleHandler<A> {
        SimpleHandler {
            alloc: self.alloc,
            options: self.options,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::alloc::PooledAllocator;

    #[test]
    fn limit_is_enforced_before_allocation() {
        let handler = SimpleHandler::builder().max_buffer_size(4).build();
        assert!(handler.serialize(&1u32).is_ok());
        let err = handler.serialize(&1u64).unwrap_err();
        assert!(matches!(err, TripackError::LimitExceeded { size: 8, limit: 4 }));
    }

    #[test]
    fn packing_into_a_larger_region() {
        let handler = SimpleHandler::new();
        let mut region = [0xEEu8; 8];
        let written = handler.serialize_into(&0x0101u16, &mut region).unwrap();
        assert_eq!(written, 2);
        assert_eq!(&region[..2], &0x0101u16.to_ne_bytes());
        assert_eq!(region[2], 0xEE);
    }

    #[test]
    fn packing_into_a_smaller_region() {
        let handler = SimpleHandler::new();
        let mut region = [0u8; 2];
        let err = handler.serialize_into(&0u32, &mut region).unwrap_err();
        assert!(matches!(
            err,
            TripackError::InsufficientCapacity {
                required: 4,
                available: 2
            }
        ));
    }

    #[test]
    fn partial_packing_is_a_size_mismatch() {
        let handler = SimpleHandler::new();
        let mut sizing = handler.make_sizing_archive();
        sizing.add(&1u32).add(&2u32);
        let mut packing = handler.make_packing_archive(sizing).unwrap();
        packing.pack(&1u32).unwrap();
        let err = handler.extract_buffer(packing).unwrap_err();
        assert!(matches!(err, TripackError::SizeMismatch { sized: 8, packed: 4 }));
    }

    #[test]
    fn trailing_bytes_are_optional() {
        let buffer = SimpleHandler::new().serialize(&(1u8, 2u8)).unwrap();
        let strict = SimpleHandler::new();
        assert!(matches!(
            strict.deserialize::<u8, _>(&buffer),
            Err(TripackError::TrailingBytes { remaining: 1 })
        ));
        let lenient = SimpleHandler::builder().require_exhausted(false).build();
        assert_eq!(lenient.deserialize::<u8, _>(&buffer).unwrap(), 1);
    }

    #[test]
    fn element_limit_reaches_the_archive() {
        use crate::constants::DEFAULT_MAX_ELEMENT_COUNT;

        let default = SimpleHandler::new();
        assert_eq!(default.options().max_element_count, DEFAULT_MAX_ELEMENT_COUNT);
        let raw = [0u8; 8];
        assert_eq!(
            default.make_unpacking_archive(&raw[..]).element_limit(),
            DEFAULT_MAX_ELEMENT_COUNT
        );

        let tight = SimpleHandler::builder().max_element_count(2).build();
        assert_eq!(tight.make_unpacking_archive(&raw[..]).element_limit(), 2);
        let three = tight.serialize(&vec![(); 3]).unwrap();
        assert!(matches!(
            tight.deserialize::<Vec<()>, _>(&three),
            Err(TripackError::InvalidData(_))
        ));
        // Elements that occupy bytes are bounded by the source instead.
        let bytes = tight.serialize(&vec![1u8; 3]).unwrap();
        assert_eq!(tight.deserialize::<Vec<u8>, _>(&bytes).unwrap(), [1, 1, 1]);
    }

    #[test]
    fn pooled_handler_recycles_buffers() {
        let pool = PooledAllocator::new();
        let handler = SimpleHandler::with_allocator(pool.clone());
        drop(handler.serialize(&[0u64; 16]).unwrap());
        let again = handler.serialize(&[1u64; 16]).unwrap();
        assert_eq!(pool.hits(), 1);
        assert_eq!(handler.deserialize::<[u64; 16], _>(&again).unwrap(), [1; 16]);
    }
}
