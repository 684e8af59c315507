use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};

use super::{pack_len, size_len, unpack_len};
use crate::alloc::AllocationPolicy;
use crate::archive::{PackTarget, PackingArchive, SizingArchive, UnpackingArchive};
use crate::dispatch::{Packable, Sizable, Unpackable};
use crate::error::Result;

// Entries are dispatched key first, then value, so maps of maps recurse
// through the same protocol as any other element.

impl<K: Sizable, V: Sizable, S> Sizable for HashMap<K, V, S> {
    fn compute_size(&self, ar: &mut SizingArchive) {
        size_len(ar);
        for (key, value) in self {
            key.compute_size(ar);
            value.compute_size(ar);
        }
    }
}

impl<K: Packable, V: Packable, S> Packable for HashMap<K, V, S> {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        pack_len(ar, self.len())?;
        for (key, value) in self {
            key.pack(ar)?;
            value.pack(ar)?;
        }
        Ok(())
    }
}

impl<K, V, S> Unpackable for HashMap<K, V, S>
where
    K: Unpackable + Eq + Hash,
    V: Unpackable,
    S: BuildHasher + Default,
{
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        let count = unpack_len(ar)?;
        let mut map = HashMap::with_hasher(S::default());
        map.try_reserve(ar.capacity_hint(count))?;
        ar.for_each_element(count, |ar| {
            let key = ar.unpack::<K>()?;
            let value = ar.unpack::<V>()?;
            map.insert(key, value);
            Ok(())
        })?;
        Ok(map)
    }
}

impl<K: Sizable, V: Sizable> Sizable for BTreeMap<K, V> {
    fn compute_size(&self, ar: &mut SizingArchive) {
        size_len(ar);
        for (key, value) in self {
            key.compute_size(ar);
            value.compute_size(ar);
        }
    }
}

impl<K: Packable, V: Packable> Packable for BTreeMap<K, V> {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        pack_len(ar, self.len())?;
        for (key, value) in self {
            key.pack(ar)?;
            value.pack(ar)?;
        }
        Ok(())
    }
}

impl<K: Unpackable + Ord, V: Unpackable> Unpackable for BTreeMap<K, V> {
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        let count = unpack_len(ar)?;
        let mut map = BTreeMap::new();
        ar.for_each_element(count, |ar| {
            let key = ar.unpack::<K>()?;
            let value = ar.unpack::<V>()?;
            map.insert(key, value);
            Ok(())
        })?;
        Ok(map)
    }
}

// --- Sets ---

impl<T: Sizable, S> Sizable for HashSet<T, S> {
    fn compute_size(&self, ar: &mut SizingArchive) {
        size_len(ar);
        for item in self {
            item.compute_size(ar);
        }
    }
}

impl<T: Packable, S> Packable for HashSet<T, S> {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        pack_len(ar, self.len())?;
        for item in self {
            item.pack(ar)?;
        }
        Ok(())
    }
}

impl<T, S> Unpackable for HashSet<T, S>
where
    T: Unpackable + Eq + Hash,
    S: BuildHasher + Default,
{
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        let count = unpack_len(ar)?;
        let mut set = HashSet::with_hasher(S::default());
        set.try_reserve(ar.capacity_hint(count))?;
        ar.for_each_element(count, |ar| {
            set.insert(ar.unpack::<T>()?);
            Ok(())
        })?;
        Ok(set)
    }
}

impl<T: Sizable> Sizable for BTreeSet<T> {
    fn compute_size(&self, ar: &mut SizingArchive) {
        size_len(ar);
        for item in self {
            item.compute_size(ar);
        }
    }
}

impl<T: Packable> Packable for BTreeSet<T> {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        pack_len(ar, self.len())?;
        for item in self {
            item.pack(ar)?;
        }
        Ok(())
    }
}

impl<T: Unpackable + Ord> Unpackable for BTreeSet<T> {
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        let count = unpack_len(ar)?;
        let mut set = BTreeSet::new();
        ar.for_each_element(count, |ar| {
            set.insert(ar.unpack::<T>()?);
            Ok(())
        })?;
        Ok(set)
    }
}
