use super::*;

#[test]
fn write_read_round_trip() {
    let object = ObjectFile::new(vec![
        Section::new("data", 0x2000, vec![34, 1, 231, 60, 4, 2, 255]),
        Section::new(
            "instructions",
            0x1000,
            vec![30, 27, 34, 50, 91, 83, 49, 5, 6, 134, 61, 2, 6, 239, 34, 8, 15],
        ),
    ]);

    let mut buf = Vec::new();
    write(&mut buf, &object).unwrap();
    let decoded = read(&mut &buf[..]).unwrap();

    assert_eq!(object, decoded);
}

#[test]
fn empty_object_file_round_trips() {
    let object = ObjectFile::new(vec![]);
    let mut buf = Vec::new();
    write(&mut buf, &object).unwrap();
    let decoded = read(&mut &buf[..]).unwrap();
    assert_eq!(decoded.sections.len(), 0);
}

#[test]
fn section_lookup_by_name() {
    let object = ObjectFile::new(vec![
        Section::new("data", 0x2000, vec![1, 2, 3]),
        Section::new("text", 0x1000, vec![4, 5]),
    ]);
    assert_eq!(object.section("text").unwrap().start_addr, 0x1000);
    assert!(object.section("missing").is_none());
}

#[test]
fn truncated_section_is_reported() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&1u32.to_le_bytes()); // sectionCount
    buf.extend_from_slice(&4u32.to_le_bytes()); // nameLen
    buf.extend_from_slice(b"text");
    buf.extend_from_slice(&0x1000u32.to_le_bytes()); // startAddr
    buf.extend_from_slice(&16u32.to_le_bytes()); // size (but no data follows)

    let err = read(&mut &buf[..]).unwrap_err();
    assert!(matches!(err, ObjectFileError::TruncatedSection { .. }));
}

#[test]
fn file_round_trip() {
    let path = std::env::temp_dir().join("sobjfile_test_round_trip.sobj");
    let object = ObjectFile::new(vec![Section::new("data", 0x2000, vec![9, 8, 7])]);

    write_file(&path, &object).unwrap();
    let read_back = read_file(&path).unwrap();

    assert_eq!(object, read_back);
    std::fs::remove_file(&path).unwrap();
}
