//! Bridge for `serde` types that have no native impl.
//!
//! Wrapping a value in [`Bincoded`] lets any `Serialize + DeserializeOwned`
//! type travel through the archives as an opaque, length-prefixed `bincode`
//! payload. It costs an extra encode per phase, so prefer the native traits
//! (or the derive) for hot types.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{pack_len, size_len, unpack_len};
use crate::alloc::AllocationPolicy;
use crate::archive::{PackTarget, PackingArchive, SizingArchive, UnpackingArchive};
use crate::dispatch::{Packable, Sizable, Unpackable};
use crate::error::{Result, TripackError};

/// A `serde` value carried as a `bincode` payload.
///
/// ```rust
/// use std::collections::HashMap;
/// use tripack::Bincoded;
///
/// let settings: HashMap<String, Vec<f32>> = HashMap::from([("gain".into(), vec![0.5, 1.0])]);
/// let buffer = tripack::serialize(&(7u8, Bincoded(settings.clone())))?;
/// let (tag, Bincoded(decoded)) =
///     tripack::deserialize::<(u8, Bincoded<HashMap<String, Vec<f32>>>), _>(&buffer)?;
/// assert_eq!((tag, decoded), (7, settings));
/// # Ok::<(), tripack::TripackError>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bincoded<T>(pub T);

impl<T> Bincoded<T> {
    /// Unwraps the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Bincoded<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| TripackError::Serialization(e.to_string()))
}

impl<T: Serialize> Sizable for Bincoded<T> {
    fn compute_size(&self, ar: &mut SizingArchive) {
        size_len(ar);
        // An unencodable value contributes nothing; packing reports the error.
        if let Ok(bytes) = encode(&self.0) {
            ar.add_to_size_raw(bytes.len());
        }
    }
}

impl<T: Serialize> Packable for Bincoded<T> {
    fn pack<D: PackTarget>(&self, ar: &mut PackingArchive<D>) -> Result<()> {
        let bytes = encode(&self.0)?;
        pack_len(ar, bytes.len())?;
        ar.pack_bytes(&bytes)
    }
}

impl<T: DeserializeOwned> Unpackable for Bincoded<T> {
    fn unpack<A: AllocationPolicy>(ar: &mut UnpackingArchive<'_, A>) -> Result<Self> {
        let len = unpack_len(ar)?;
        let payload = ar.unpack_bytes(len)?;
        let (value, read): (T, usize) =
            bincode::serde::decode_from_slice(payload, bincode::config::standard())
                .map_err(|e| TripackError::Serialization(e.to_string()))?;
        if read != len {
            return Err(TripackError::invalid_data(format!(
                "bincode payload of {len} bytes decoded from only {read}"
            )));
        }
        Ok(Self(value))
    }
}
