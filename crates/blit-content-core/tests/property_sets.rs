use blit_content_core::properties::{
    PropertyKind, PropertySet, PropertyValue, read_properties, write_properties,
};
use std::io::Cursor;

fn sample() -> PropertySet {
    let mut p = PropertySet::new();
    p.insert("title", PropertyValue::String("Cave".into()));
    p.insert("dark", PropertyValue::Bool(true));
    p.insert("depth", PropertyValue::Int(-3));
    p.insert("gravity", PropertyValue::Float(9.5));
    p.insert("tint", PropertyValue::Color([10, 20, 30, 255]));
    p.insert("music", PropertyValue::String("cave.ogg".into()));
    p
}

#[test]
fn encodes_and_decodes_all_five_types() {
    let p = sample();
    let mut buf = Vec::new();
    write_properties(&mut buf, Some(&p)).unwrap();
    let back = read_properties(&mut Cursor::new(buf)).unwrap().unwrap();
    assert_eq!(back, p);
    assert_eq!(back.strings[1].0, "music");
}

#[test]
fn absent_set_is_a_single_flag_byte() {
    let mut buf = Vec::new();
    write_properties(&mut buf, None).unwrap();
    assert_eq!(buf, vec![0]);
    assert_eq!(read_properties(&mut Cursor::new(buf)).unwrap(), None);
}

#[test]
fn empty_set_writes_five_zero_counts() {
    let mut buf = Vec::new();
    PropertySet::new().write_to(&mut buf).unwrap();
    assert_eq!(buf, vec![0u8; 20]);
}

#[test]
fn retyping_a_key_moves_it_between_tables() {
    let mut p = sample();
    p.insert("depth", PropertyValue::Float(2.0));
    assert_eq!(p.kind_of("depth"), Some(PropertyKind::Float));
    assert!(p.ints.is_empty());
    assert_eq!(p.len(), 6);
}

#[test]
fn overrides_win_when_merging() {
    let base = sample();
    let mut own = PropertySet::new();
    own.insert("dark", PropertyValue::Bool(false));
    own.insert("extra", PropertyValue::Int(1));
    let merged = base.merged_with(&own);
    assert_eq!(merged.get("dark"), Some(PropertyValue::Bool(false)));
    assert_eq!(merged.get("extra"), Some(PropertyValue::Int(1)));
    assert_eq!(merged.get("title"), Some(PropertyValue::String("Cave".into())));
}

#[test]
fn truncated_input_is_an_error() {
    let mut buf = Vec::new();
    sample().write_to(&mut buf).unwrap();
    buf.truncate(buf.len() - 2);
    assert!(PropertySet::read_from(&mut Cursor::new(buf)).is_err());
}
