//! Contiguous byte regions exchanged with a transport.
//!
//! A serialization buffer is either *owning* ([`Buffer`], storage obtained
//! from an [`AllocationPolicy`] and given back on drop) or *non-owning*
//! ([`BorrowedBuffer`], [`MappedBuffer`]), referring to storage someone else
//! manages: a socket's receive region, a message from an IPC channel, a
//! memory-mapped file. Every kind implements [`SerializationBuffer`], so an
//! unpacking pass does not care which one it reads from.
//!
//! Buffers move; they never copy implicitly. [`Buffer`] is deliberately not
//! `Clone`: a copy would either alias the storage or silently duplicate it.

use std::fmt;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::alloc::{AllocationPolicy, GlobalAllocator};
use crate::error::Result;

/// Read access shared by every buffer kind.
pub trait SerializationBuffer {
    /// The bytes held by the buffer.
    fn data(&self) -> &[u8];

    /// Length of the buffer in bytes.
    fn capacity(&self) -> usize {
        self.data().len()
    }

    /// Start address of the buffer, for transports that speak `(address, length)`.
    fn as_ptr(&self) -> *const u8 {
        self.data().as_ptr()
    }
}

impl<B: SerializationBuffer + ?Sized> SerializationBuffer for &B {
    fn data(&self) -> &[u8] {
        (**self).data()
    }
}

impl SerializationBuffer for [u8] {
    fn data(&self) -> &[u8] {
        self
    }
}

impl SerializationBuffer for Vec<u8> {
    fn data(&self) -> &[u8] {
        self.as_slice()
    }
}

// --- Owning buffer ---

/// A buffer that owns its storage.
///
/// The storage comes from the buffer's [`AllocationPolicy`] and is returned to
/// it when the buffer is dropped.
pub struct Buffer<A: AllocationPolicy = GlobalAllocator> {
    bytes: Vec<u8>,
    alloc: A,
}

impl Buffer<GlobalAllocator> {
    /// Allocates a zero-filled buffer of `len` bytes from the global heap.
    pub fn new(len: usize) -> Result<Self> {
        Self::with_capacity_in(len, GlobalAllocator)
    }

    /// Takes ownership of bytes received from a transport.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            alloc: GlobalAllocator,
        }
    }
}

impl<A: AllocationPolicy> Buffer<A> {
    /// Allocates a zero-filled buffer of `len` bytes from `alloc`.
    pub fn with_capacity_in(len: usize, alloc: A) -> Result<Self> {
        let bytes = alloc.allocate_bytes(len)?;
        Ok(Self { bytes, alloc })
    }

    /// Allocates a buffer from `alloc` holding an owned copy of `data`.
    pub fn copy_from_in(data: &[u8], alloc: A) -> Result<Self> {
        let mut buffer = Self::with_capacity_in(data.len(), alloc)?;
        buffer.bytes.copy_from_slice(data);
        Ok(buffer)
    }

    /// Length of the buffer in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// The bytes held by the buffer.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable access to the bytes held by the buffer.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// The policy this buffer's storage came from.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// A non-owning view of this buffer.
    pub fn borrow(&self) -> BorrowedBuffer<'_> {
        BorrowedBuffer::new(&self.bytes)
    }

    /// Transfers the storage out of the buffer, e.g. to hand it to a transport.
    ///
    /// The storage is not returned to the allocation policy.
    pub fn into_vec(mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}

impl<A: AllocationPolicy> SerializationBuffer for Buffer<A> {
    fn data(&self) -> &[u8] {
        &self.bytes
    }
}

impl<A: AllocationPolicy> Drop for Buffer<A> {
    fn drop(&mut self) {
        let bytes = std::mem::take(&mut self.bytes);
        if bytes.capacity() > 0 {
            self.alloc.release_bytes(bytes);
        }
    }
}

impl<A: AllocationPolicy> fmt::Debug for Buffer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("capacity", &self.bytes.len())
            .field("data", &self.bytes.as_ptr())
            .field("alloc", &self.alloc)
            .finish()
    }
}

// --- Borrowed buffer ---

/// A buffer that refers to storage owned elsewhere.
///
/// It performs no allocation or deallocation; it exists so a receiver can
/// unpack directly out of a transport's receive region without copying.
#[derive(Debug, Clone)]
pub struct BorrowedBuffer<'a> {
    bytes: &'a [u8],
}

impl<'a> BorrowedBuffer<'a> {
    /// Wraps caller-owned bytes.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Wraps a raw `(address, length)` region handed over by a foreign transport.
    ///
    /// # Safety
    ///
    /// `data` must be non-null, valid for reads of `len` bytes, properly
    /// initialized, and must not be mutated for the whole lifetime `'a`.
    #[allow(unsafe_code)]
    pub unsafe fn from_raw_parts(data: *const u8, len: usize) -> Self {
        // SAFETY: upheld by the caller per the contract above.
        let bytes = unsafe { std::slice::from_raw_parts(data, len) };
        Self { bytes }
    }

    /// Length of the region in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// The referenced bytes.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.bytes
    }

    /// Allocates an owning copy of the referenced bytes.
    pub fn to_owned_in<A: AllocationPolicy>(&self, alloc: A) -> Result<Buffer<A>> {
        Buffer::copy_from_in(self.bytes, alloc)
    }
}

impl SerializationBuffer for BorrowedBuffer<'_> {
    fn data(&self) -> &[u8] {
        self.bytes
    }
}

impl<'a> From<&'a [u8]> for BorrowedBuffer<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

// --- Memory-mapped buffer ---

/// A read-only memory map of a file, used as a zero-copy receive buffer.
///
/// Useful when the sending process hands messages over through a file or a
/// shared-memory mount: the receiver maps the file and unpacks straight out
/// of the page cache.
#[derive(Debug)]
pub struct MappedBuffer {
    // `None` for empty files, which cannot be mapped on every platform.
    mmap: Option<Mmap>,
}

impl MappedBuffer {
    /// Maps the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_file(&file)
    }

    /// Maps an already opened file.
    pub fn from_file(file: &File) -> Result<Self> {
        if file.metadata()?.len() == 0 {
            return Ok(Self { mmap: None });
        }

        // Safety: Mmap is fundamentally unsafe as external processes could modify the file.
        // Callers mapping a message file must not rewrite it while the map is alive.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(file)? };

        tracing::debug!(len = mmap.len(), "mapped receive buffer");
        Ok(Self { mmap: Some(mmap) })
    }

    /// Length of the mapping in bytes.
    pub fn capacity(&self) -> usize {
        self.data().len()
    }

    /// The mapped bytes.
    pub fn data(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or_default()
    }
}

impl SerializationBuffer for MappedBuffer {
    fn data(&self) -> &[u8] {
        MappedBuffer::data(self)
    }
}
