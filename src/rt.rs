//! Runtime utilities for generated code (Macros).
//! Do not use directly.
//!
//! Derived enums encode their variant as a `u32` index in declaration order,
//! followed by the variant's fields.

use crate::alloc::AllocationPolicy;
use crate::archive::{PackTarget, PackingArchive, SizingArchive, UnpackingArchive};
use crate::error::{Result, TripackError};

/// Accounts for a variant tag.
#[inline]
pub fn size_variant(ar: &mut SizingArchive) {
    ar.add_flat::<u32>();
}

/// Writes a variant tag.
#[inline]
pub fn pack_variant<D: PackTarget>(ar: &mut PackingArchive<D>, index: u32) -> Result<()> {
    ar.pack_item(&index)
}

/// Reads a variant tag.
#[inline]
pub fn unpack_variant<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<u32> {
    ar.unpack_next_item_as::<u32>()
}

/// The error for a tag that names no variant of `type_name`.
#[cold]
pub fn unknown_variant(type_name: &str, index: u32) -> TripackError {
    TripackError::invalid_data(format!("unknown variant index {index} for enum {type_name}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::alloc::GlobalAllocator;

    #[test]
    fn tags_are_four_bytes() {
        let mut sizing = SizingArchive::new();
        size_variant(&mut sizing);
        assert_eq!(sizing.size(), 4);

        let mut region = [0u8; 4];
        let mut ar = PackingArchive::new(&mut region[..]);
        pack_variant(&mut ar, 3).unwrap();

        let mut ar = UnpackingArchive::new(&region, GlobalAllocator);
        assert_eq!(unpack_variant(&mut ar).unwrap(), 3);
        assert_eq!(
            unknown_variant("Color", 3).to_string(),
            "Invalid Data: unknown variant index 3 for enum Color"
        );
    }
}
