use std::str::Utf8Error;

use super::{pack_len, size_len, unpack_len};
use crate::alloc::AllocationPolicy;
use crate::archive::{PackTarget, PackingArchive, SizingArchive, Slot, UnpackingArchive};
use crate::dispatch::{Packable, Sizable, Unpackable};
use crate::error::{Result, TripackError};

impl Sizable for str {
    fn compute_size(&self, ar: &mut SizingArchive) {
        size_len(ar);
        ar.add_to_size_raw(self.len());
    }
}

impl Packable for str {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        pack_len(ar, self.len())?;
        ar.pack_bytes(self.as_bytes())
    }
}

impl Sizable for String {
    fn compute_size(&self, ar: &mut SizingArchive) {
        self.as_str().compute_size(ar);
    }
}

impl Packable for String {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        self.as_str().pack(ar)
    }
}

fn not_utf8(e: Utf8Error) -> TripackError {
    TripackError::invalid_data(format!("string payload is not UTF-8: {e}"))
}

/// Reads a length-prefixed UTF-8 payload as a view into the source.
fn unpack_str<'a, A: AllocationPolicy>(ar: &mut UnpackingArchive<'a, A>) -> Result<&'a str> {
    let len = unpack_len(ar)?;
    let bytes = ar.unpack_bytes(len)?;
    std::str::from_utf8(bytes).map_err(not_utf8)
}

impl Unpackable for String {
    // The raw payload goes into policy storage first and is validated once,
    // by the conversion.
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        let len = unpack_len(ar)?;
        let bytes = ar.unpack_bytes(len)?;
        let mut storage = ar.allocator().allocate::<u8>(len)?;
        storage.extend_from_slice(bytes);
        String::from_utf8(storage).map_err(|e| not_utf8(e.utf8_error()))
    }

    // Reuses the occupant's heap storage when it is large enough.
    fn unpack_into<A: AllocationPolicy>(
        mut slot: Slot<'_, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<()> {
        let text = unpack_str(ar)?;
        let dest = slot.get_mut();
        dest.clear();
        dest.try_reserve(text.len())?;
        dest.push_str(text);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::{
        AllocationPolicy, GlobalAllocator, SerializationHandler, SimpleHandler, TripackError,
        deserialize, serialize,
    };

    #[test]
    fn string_encoding_is_length_then_bytes() {
        let buffer = serialize("hello world").unwrap();
        assert_eq!(buffer.capacity(), size_of::<usize>() + 11);
        assert_eq!(&buffer.data()[size_of::<usize>()..], b"hello world");
        assert_eq!(deserialize::<String, _>(&buffer).unwrap(), "hello world");
    }

    #[test]
    fn unpack_into_reuses_capacity() {
        let buffer = serialize("abc").unwrap();
        let mut dest = String::with_capacity(64);
        dest.push_str("previous contents");
        let ptr = dest.as_ptr();

        SimpleHandler::new()
            .make_unpacking_archive(&buffer)
            .unpack_into(&mut dest)
            .unwrap();
        assert_eq!(dest, "abc");
        assert_eq!(dest.as_ptr(), ptr);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut raw = 2usize.to_ne_bytes().to_vec();
        raw.extend_from_slice(&[0xC3, 0x28]);
        let err = deserialize::<String, _>(&raw).unwrap_err();
        assert!(matches!(&err, TripackError::InvalidData(msg) if msg.contains("not UTF-8")));

        let mut dest = String::from("kept");
        let err = SimpleHandler::new()
            .make_unpacking_archive(&raw)
            .unpack_into(&mut dest)
            .unwrap_err();
        assert!(matches!(err, TripackError::InvalidData(_)));
        assert_eq!(dest, "kept");
    }

    #[derive(Debug, Clone, Default)]
    struct CountingPolicy(Rc<Cell<usize>>);

    impl AllocationPolicy for CountingPolicy {
        fn allocate_bytes(&self, len: usize) -> crate::Result<Vec<u8>> {
            GlobalAllocator.allocate_bytes(len)
        }

        fn allocate<T>(&self, capacity: usize) -> crate::Result<Vec<T>> {
            self.0.set(self.0.get() + 1);
            GlobalAllocator.allocate(capacity)
        }
    }

    #[test]
    fn fresh_strings_use_policy_storage() {
        let policy = CountingPolicy::default();
        let handler = SimpleHandler::with_allocator(policy.clone());
        let buffer = serialize("policy text").unwrap();

        let s: String = handler.deserialize(&buffer).unwrap();
        assert_eq!(s, "policy text");
        assert_eq!(policy.0.get(), 1);
    }

    #[test]
    fn hostile_length_fails_without_allocating() {
        let raw = usize::MAX.to_ne_bytes();
        let err = deserialize::<String, _>(&raw[..]).unwrap_err();
        assert!(err.is_overrun());
    }
}
