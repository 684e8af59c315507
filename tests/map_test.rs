#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[test]
fn test_int_map_round_trip() -> tripack::Result<()> {
    let map: BTreeMap<i32, i32> = [(1, 2), (3, 4), (5, 6)].into_iter().collect();

    let buffer = tripack::serialize(&map)?;
    assert_eq!(buffer.capacity(), size_of::<usize>() + 3 * 2 * size_of::<i32>());

    let decoded: BTreeMap<i32, i32> = tripack::deserialize(&buffer)?;
    assert_eq!(decoded, map);
    Ok(())
}

#[test]
fn test_unordered_map_equality() -> tripack::Result<()> {
    let map: HashMap<u64, String> = (0..500).map(|k| (k, format!("v{k}"))).collect();
    let decoded: HashMap<u64, String> = tripack::deserialize(&tripack::serialize(&map)?)?;
    assert_eq!(decoded.len(), 500);
    assert_eq!(decoded, map);
    Ok(())
}

#[test]
fn test_nested_maps() -> tripack::Result<()> {
    let mut inner = BTreeMap::new();
    inner.insert(1u8, vec![String::from("a"), String::from("b")]);
    inner.insert(2u8, Vec::new());

    let mut outer: HashMap<String, BTreeMap<u8, Vec<String>>> = HashMap::new();
    outer.insert("first".into(), inner.clone());
    outer.insert("empty".into(), BTreeMap::new());

    let decoded: HashMap<String, BTreeMap<u8, Vec<String>>> =
        tripack::deserialize(&tripack::serialize(&outer)?)?;
    assert_eq!(decoded, outer);
    assert_eq!(decoded["first"], inner);
    Ok(())
}

#[test]
fn test_sets() -> tripack::Result<()> {
    let ordered: BTreeSet<char> = "serialization".chars().collect();
    let hashed: HashSet<(i8, bool)> = [(-1, true), (0, false), (1, true)].into();

    let buffer = tripack::serialize(&(&ordered, &hashed))?;
    let (o, h): (BTreeSet<char>, HashSet<(i8, bool)>) = tripack::deserialize(&buffer)?;
    assert_eq!(o, ordered);
    assert_eq!(h, hashed);
    Ok(())
}

#[test]
fn test_truncated_map_fails() -> tripack::Result<()> {
    let map = BTreeMap::from([(10u32, 20u32), (30, 40)]);
    let buffer = tripack::serialize(&map)?;
    let truncated = &buffer.data()[..buffer.capacity() - 1];

    let err = tripack::deserialize::<BTreeMap<u32, u32>, _>(truncated).unwrap_err();
    assert!(err.is_overrun());
    Ok(())
}
