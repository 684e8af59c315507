#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use proptest::prelude::*;
use tripack::constants::DEFAULT_MAX_ELEMENT_COUNT;
use tripack::{BorrowedBuffer, Serializable, SerializationHandler, SimpleHandler, TripackError};

#[derive(Serializable, Debug, PartialEq)]
struct Heartbeat;

proptest! {
    #[test]
    fn integers_and_strings(a in any::<i64>(), b in any::<u8>(), s in ".*") {
        let value = (a, b, s);
        let decoded: (i64, u8, String) = tripack::deserialize(&tripack::serialize(&value).unwrap()).unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn floats_round_trip_bit_exact(values in prop::collection::vec(any::<f64>(), 0..64)) {
        let decoded: Vec<f64> = tripack::deserialize(&tripack::serialize(&values).unwrap()).unwrap();
        let bits = |v: &[f64]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        prop_assert_eq!(bits(&decoded), bits(&values));
    }

    #[test]
    fn nested_containers(value in prop::collection::vec(
        (any::<Option<u32>>(), prop::collection::btree_map(any::<i16>(), "[a-z]{0,8}", 0..8)),
        0..16,
    )) {
        let decoded: Vec<(Option<u32>, BTreeMap<i16, String>)> =
            tripack::deserialize(&tripack::serialize(&value).unwrap()).unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn sized_length_matches_packed_length(map in prop::collection::hash_map(any::<u32>(), any::<Vec<u8>>(), 0..32)) {
        let handler = SimpleHandler::new();
        let size = handler.get_size(&map);
        let buffer = handler.serialize(&map).unwrap();
        prop_assert_eq!(buffer.capacity(), size);

        let decoded: HashMap<u32, Vec<u8>> = handler.deserialize(&BorrowedBuffer::new(buffer.data())).unwrap();
        prop_assert_eq!(decoded, map);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let started = Instant::now();
        let _ = tripack::deserialize::<Vec<(String, Option<char>)>, _>(&bytes);
        let _ = tripack::deserialize::<BTreeMap<bool, Vec<u16>>, _>(&bytes);
        let _ = tripack::deserialize::<Vec<()>, _>(&bytes);
        let _ = tripack::deserialize::<Vec<Heartbeat>, _>(&bytes);
        let _ = tripack::deserialize::<Vec<Vec<Heartbeat>>, _>(&bytes);
        prop_assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn zero_byte_counts_are_bounded(count in any::<usize>()) {
        match tripack::deserialize::<Vec<Heartbeat>, _>(&count.to_ne_bytes()[..]) {
            Ok(decoded) => {
                prop_assert!(count <= DEFAULT_MAX_ELEMENT_COUNT);
                prop_assert_eq!(decoded.len(), count);
            }
            Err(err) => {
                prop_assert!(count > DEFAULT_MAX_ELEMENT_COUNT);
                prop_assert!(matches!(err, TripackError::InvalidData(_)));
            }
        }
    }
}
