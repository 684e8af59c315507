#![allow(missing_docs)]

use std::collections::BTreeMap;

use tripack::{
    ArchiveKind, GlobalAllocator, PackingArchive, SerializationHandler, SimpleHandler,
    SizingArchive, TripackError, UnpackingArchive,
};

/// Drives the three archives by hand and checks that the passes agree.
#[test]
fn test_sequence_round_trip_through_archives() -> tripack::Result<()> {
    let id = 7u64;
    let tags = vec![String::from("red"), String::from("green")];
    let weights = BTreeMap::from([(1u8, 0.5f32), (2, 0.25)]);

    let mut sizing = SizingArchive::new();
    sizing.add(&id).add(&tags).add(&weights);

    let mut region = vec![0u8; sizing.size()];
    let mut packing = PackingArchive::new(region.as_mut_slice());
    packing.pack(&id)?.pack(&tags)?.pack(&weights)?;
    assert_eq!(packing.offset(), sizing.size());

    let mut ar = UnpackingArchive::new(&region, GlobalAllocator);
    assert_eq!(ar.unpack::<u64>()?, id);
    assert_eq!(ar.unpack::<Vec<String>>()?, tags);
    assert_eq!(ar.unpack::<BTreeMap<u8, f32>>()?, weights);
    ar.expect_exhausted()?;
    Ok(())
}

#[test]
fn test_size_agreement_for_assorted_values() -> tripack::Result<()> {
    fn check<T: tripack::Sizable + tripack::Packable + ?Sized>(value: &T) -> tripack::Result<()> {
        let size = tripack::packed_size_of(value);
        let mut region = vec![0u8; size];
        let mut packing = PackingArchive::new(region.as_mut_slice());
        packing.pack(value)?;
        assert_eq!(packing.offset(), size);
        assert_eq!(packing.remaining(), 0);
        Ok(())
    }

    check(&0u8)?;
    check("")?;
    check("grüße")?;
    check(&vec![vec![1u32], vec![], vec![2, 3]])?;
    check(&(true, 'λ', (), Some(Box::new(9i16)), [0u64; 3]))?;
    check(&std::collections::HashMap::from([(1i64, String::from("one"))]))?;
    Ok(())
}

/// Unpacking in a different order than packing is a caller error. The
/// format carries no tags, so it either trips a cursor check or yields
/// nonsense; it never reproduces the original values.
#[test]
fn test_ordering_mismatch_is_not_a_round_trip() -> tripack::Result<()> {
    let handler = SimpleHandler::builder().require_exhausted(false).build();

    // Swapped scalars decode "successfully" into the wrong values.
    let buffer = tripack::serialize_values!(with handler; 1u32, 2u64)?;
    let mut ar = handler.make_unpacking_archive(&buffer);
    let first = ar.unpack::<u64>()?;
    let second = ar.unpack::<u32>()?;
    assert_ne!((first, second), (2, 1));

    // Reading the integer's bytes as a string length walks off the buffer.
    let buffer = tripack::serialize_values!(with handler; 42i32, String::from("hello world"))?;
    let mut ar = handler.make_unpacking_archive(&buffer);
    match ar.unpack::<String>() {
        Err(err) => assert!(err.is_overrun() || matches!(err, TripackError::InvalidData(_))),
        Ok(text) => assert_ne!(text, "hello world"),
    }
    Ok(())
}

#[test]
fn test_unpacking_past_the_end_is_reported() -> tripack::Result<()> {
    let buffer = tripack::serialize(&5u16)?;
    let mut ar = SimpleHandler::new().make_unpacking_archive(&buffer);
    ar.unpack::<u16>()?;

    let err = ar.unpack::<u16>().unwrap_err();
    assert!(matches!(
        err,
        TripackError::Overrun {
            phase: ArchiveKind::Unpacking,
            offset: 2,
            requested: 2,
            capacity: 2,
        }
    ));
    Ok(())
}

#[test]
fn test_packing_more_than_was_sized_is_reported() -> tripack::Result<()> {
    let handler = SimpleHandler::new();
    let mut sizing = handler.make_sizing_archive();
    sizing.add(&1u32);

    let mut packing = handler.make_packing_archive(sizing)?;
    packing.pack(&1u32)?;
    let err = packing.pack(&2u32).unwrap_err();
    assert!(err.is_overrun());

    // The pass is abandoned but the bytes written before the failure are intact.
    let buffer = handler.extract_buffer(packing)?;
    assert_eq!(handler.deserialize::<u32, _>(&buffer)?, 1);
    Ok(())
}

#[test]
fn test_packing_into_transmit_region() -> tripack::Result<()> {
    let handler = SimpleHandler::new();
    let mut transmit = [0u8; 64];

    let mut sizing = handler.make_sizing_archive();
    sizing.add(&-1i8).add("ok");
    let mut packing = handler.make_packing_archive_into(sizing, &mut transmit)?;
    packing.pack(&-1i8)?.pack("ok")?;
    let written = handler.extract_buffer(packing)?.len();

    let mut ar = handler.make_unpacking_archive(&transmit[..written]);
    assert_eq!(ar.unpack::<i8>()?, -1);
    assert_eq!(ar.unpack::<String>()?, "ok");
    handler.finish_unpacking(&ar)
}

#[test]
fn test_archive_kinds() {
    use tripack::Archive;

    let sizing = SizingArchive::new();
    let mut region = [0u8; 1];
    let packing = PackingArchive::new(&mut region[..]);
    assert_eq!(sizing.kind(), ArchiveKind::Sizing);
    assert!(packing.is_packing());

    let ar = UnpackingArchive::new(&[], GlobalAllocator);
    assert!(ar.is_unpacking());
    assert_eq!(ArchiveKind::Unpacking.to_string(), "unpacking");
}
