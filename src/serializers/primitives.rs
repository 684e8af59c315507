use std::marker::PhantomData;

use crate::alloc::AllocationPolicy;
use crate::archive::{PackTarget, PackingArchive, SizingArchive, UnpackingArchive};
use crate::dispatch::{Packable, Sizable, Unpackable};
use crate::error::{Result, TripackError};

crate::impl_flat!(u8, u16, u32, u64, u128, usize);
crate::impl_flat!(i8, i16, i32, i64, i128, isize);
crate::impl_flat!(f32, f64);

// --- Validated scalars ---

impl Sizable for bool {
    fn compute_size(&self, ar: &mut SizingArchive) {
        ar.add_flat::<u8>();
    }
}

impl Packable for bool {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        ar.pack_item(&u8::from(*self))
    }
}

impl Unpackable for bool {
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        match ar.unpack_next_item_as::<u8>()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(TripackError::invalid_data(format!(
                "invalid bool byte {other:#04x}"
            ))),
        }
    }
}

impl Sizable for char {
    fn compute_size(&self, ar: &mut SizingArchive) {
        ar.add_flat::<u32>();
    }
}

impl Packable for char {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        ar.pack_item(&u32::from(*self))
    }
}

impl Unpackable for char {
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        let scalar = ar.unpack_next_item_as::<u32>()?;
        char::from_u32(scalar).ok_or_else(|| {
            TripackError::invalid_data(format!("{scalar:#x} is not a unicode scalar value"))
        })
    }
}

// --- Zero-sized ---

impl Sizable for () {
    fn compute_size(&self, _ar: &mut SizingArchive) {}
}

impl Packable for () {
    fn pack<D: PackTarget>(&self, _ar: &mut PackingArchive<D>) -> Result<()> {
        Ok(())
    }
}

impl Unpackable for () {
    fn unpack<A: AllocationPolicy>(_ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        Ok(())
    }
}

impl<T: ?Sized> Sizable for PhantomData<T> {
    fn compute_size(&self, _ar: &mut SizingArchive) {}
}

impl<T: ?Sized> Packable for PhantomData<T> {
    fn pack<D: PackTarget>(&self, _ar: &mut PackingArchive<D>) -> Result<()> {
        Ok(())
    }
}

impl<T: ?Sized> Unpackable for PhantomData<T> {
    fn unpack<A: AllocationPolicy>(_ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        Ok(PhantomData)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::{TripackError, deserialize, serialize};

    #[test]
    fn scalars_round_trip() {
        for value in [i64::MIN, -1, 0, 1, i64::MAX] {
            assert_eq!(deserialize::<i64, _>(&serialize(&value).unwrap()).unwrap(), value);
        }
        let nan = deserialize::<f64, _>(&serialize(&f64::NAN).unwrap()).unwrap();
        assert!(nan.is_nan());
        assert_eq!(deserialize::<char, _>(&serialize(&'ß').unwrap()).unwrap(), 'ß');
        assert!(deserialize::<bool, _>(&serialize(&true).unwrap()).unwrap());
    }

    #[test]
    fn out_of_range_bytes_are_rejected() {
        let err = deserialize::<bool, _>(&[2u8][..]).unwrap_err();
        assert!(matches!(err, TripackError::InvalidData(_)));

        let surrogate = 0xD800u32.to_ne_bytes();
        let err = deserialize::<char, _>(&surrogate[..]).unwrap_err();
        assert!(matches!(err, TripackError::InvalidData(_)));
    }

    #[test]
    fn unit_encodes_to_nothing() {
        assert_eq!(serialize(&()).unwrap().capacity(), 0);
        deserialize::<(), _>(&[0u8; 0][..]).unwrap();
    }
}
