use std::collections::VecDeque;

use super::{pack_len, size_len, unpack_len};
use crate::alloc::AllocationPolicy;
use crate::archive::{PackTarget, PackingArchive, SizingArchive, Slot, UnpackingArchive};
use crate::dispatch::{Packable, Sizable, Unpackable};
use crate::error::{Result, TripackError};

// --- Slices and vectors ---

// Runs of elements go through the slice hooks of the dispatch traits, which
// flat element types turn into a single bulk copy.

impl<T: Sizable> Sizable for [T] {
    fn compute_size(&self, ar: &mut SizingArchive) {
        size_len(ar);
        T::size_slice(self, ar);
    }
}

impl<T: Packable> Packable for [T] {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        pack_len(ar, self.len())?;
        T::pack_slice(self, ar)
    }
}

impl<T: Sizable> Sizable for Vec<T> {
    fn compute_size(&self, ar: &mut SizingArchive) {
        self.as_slice().compute_size(ar);
    }
}

impl<T: Packable> Packable for Vec<T> {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        self.as_slice().pack(ar)
    }
}

impl<T: Unpackable> Unpackable for Vec<T> {
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        let count = unpack_len(ar)?;
        let mut items = ar.allocator().allocate::<T>(ar.capacity_hint(count))?;
        T::unpack_to_vec(&mut items, count, ar)?;
        Ok(items)
    }

    // Keeps the occupant's allocation; on failure the vector holds the
    // elements decoded so far.
    fn unpack_into<A: AllocationPolicy>(
        mut slot: Slot<'_, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<()> {
        let count = unpack_len(ar)?;
        let dest = slot.get_mut();
        dest.clear();
        T::unpack_to_vec(dest, count, ar)
    }
}

impl<T: Sizable> Sizable for VecDeque<T> {
    fn compute_size(&self, ar: &mut SizingArchive) {
        size_len(ar);
        let (front, back) = self.as_slices();
        T::size_slice(front, ar);
        T::size_slice(back, ar);
    }
}

impl<T: Packable> Packable for VecDeque<T> {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        pack_len(ar, self.len())?;
        let (front, back) = self.as_slices();
        T::pack_slice(front, ar)?;
        T::pack_slice(back, ar)
    }
}

impl<T: Unpackable> Unpackable for VecDeque<T> {
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        Vec::<T>::unpack(ar).map(VecDeque::from)
    }
}

// --- Fixed-size arrays ---

impl<T: Sizable, const N: usize> Sizable for [T; N] {
    fn compute_size(&self, ar: &mut SizingArchive) {
        T::size_slice(self, ar);
    }
}

impl<T: Packable, const N: usize> Packable for [T; N] {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        T::pack_slice(self, ar)
    }
}

impl<T: Unpackable, const N: usize> Unpackable for [T; N] {
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        T::unpack_array::<A, N>(ar)
    }
}

// --- Indirection ---

impl<T: Sizable + ?Sized> Sizable for Box<T> {
    fn compute_size(&self, ar: &mut SizingArchive) {
        (**self).compute_size(ar);
    }
}

impl<T: Packable + ?Sized> Packable for Box<T> {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        (**self).pack(ar)
    }
}

impl<T: Unpackable> Unpackable for Box<T> {
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        ar.unpack::<T>().map(Box::new)
    }

    fn unpack_into<A: AllocationPolicy>(
        mut slot: Slot<'_, Self>,
        ar: &mut UnpackingArchive<'_, A>,
    ) -> Result<()> {
        T::unpack_into(Slot::new(&mut **slot.get_mut()), ar)
    }
}

impl<T: Sizable + ?Sized> Sizable for &T {
    fn compute_size(&self, ar: &mut SizingArchive) {
        (**self).compute_size(ar);
    }
}

impl<T: Packable + ?Sized> Packable for &T {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        (**self).pack(ar)
    }
}

// --- Option ---

const NONE_TAG: u8 = 0;
const SOME_TAG: u8 = 1;

impl<T: Sizable> Sizable for Option<T> {
    fn compute_size(&self, ar: &mut SizingArchive) {
        ar.add_flat::<u8>();
        if let Some(value) = self {
            value.compute_size(ar);
        }
    }
}

impl<T: Packable> Packable for Option<T> {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        match self {
            None => ar.pack_item(&NONE_TAG),
            Some(value) => {
                ar.pack_item(&SOME_TAG)?;
                value.pack(ar)
            }
        }
    }
}

impl<T: Unpackable> Unpackable for Option<T> {
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        match ar.unpack_next_item_as::<u8>()? {
            NONE_TAG => Ok(None),
            SOME_TAG => ar.unpack::<T>().map(Some),
            tag => Err(TripackError::invalid_data(format!("invalid Option tag {tag}"))),
        }
    }
}

// --- Tuples ---

macro_rules! impl_tuple {
    ($($name:ident)+) => {
        impl<$($name: Sizable),+> Sizable for ($($name,)+) {
            #[allow(non_snake_case)]
            fn compute_size(&self, ar: &mut SizingArchive) {
                let ($($name,)+) = self;
                $( $name.compute_size(ar); )+
            }
        }

        impl<$($name: Packable),+> Packable for ($($name,)+) {
            #[allow(non_snake_case)]
            fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
                let ($($name,)+) = self;
                $( $name.pack(ar)?; )+
                Ok(())
            }
        }

        impl<$($name: Unpackable),+> Unpackable for ($($name,)+) {
            fn unpack<Al: AllocationPolicy>(ar: &mut UnpackingArchive<'_, Al>) -> Result<Self> {
                Ok(($(ar.unpack::<$name>()?,)+))
            }
        }
    };
}

impl_tuple!(T0);
impl_tuple!(T0 T1);
impl_tuple!(T0 T1 T2);
impl_tuple!(T0 T1 T2 T3);
impl_tuple!(T0 T1 T2 T3 T4);
impl_tuple!(T0 T1 T2 T3 T4 T5);
impl_tuple!(T0 T1 T2 T3 T4 T5 T6);
impl_tuple!(T0 T1 T2 T3 T4 T5 T6 T7);
