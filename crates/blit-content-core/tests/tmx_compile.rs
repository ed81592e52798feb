use blit_content_core::config::MapCompileConfig;
use blit_content_core::error::ContentError;
use blit_content_core::properties::PropertyValue;
use blit_content_core::tmx::gid::{FLIP_H, ROT_90_CW, TileCell};
use blit_content_core::tmx::{
    MAP_INFO_FILE, Section, compile_map_file, layer_file_stem, read_chunk, read_chunk_index,
    read_layer_blob, read_map_info_file,
};
use std::fs;
use std::path::{Path, PathBuf};

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let p = dir.join(name);
    fs::write(&p, text).unwrap();
    p
}

fn map_xml(attrs: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" renderorder="right-down" tilewidth="16" tileheight="16" {attrs}>
{body}
</map>"#
    )
}

fn csv(gids: &[u32]) -> String {
    gids.iter().map(|g| g.to_string()).collect::<Vec<_>>().join(",")
}

fn cell(tileset: u8, flags: u8, index: i32) -> TileCell {
    TileCell { tileset, flags, index }
}

#[test]
fn finite_csv_layer_round_trips() {
    let gids: Vec<u32> = (0..100u32)
        .map(|i| match i % 4 {
            0 => 0,
            1 => i + 1,
            2 => (101 + i) | 0x8000_0000,
            _ => (i + 1) | 0xA000_0000,
        })
        .collect();
    let body = format!(
        r##"<properties>
  <property name="title" value="Meadow"/>
  <property name="level" type="int" value="3"/>
 </properties>
 <tileset firstgid="1" name="terrain" tilewidth="16" tileheight="16" tilecount="100" columns="10">
  <tile id="3"><properties><property name="solid" type="bool" value="true"/></properties></tile>
 </tileset>
 <tileset firstgid="101" name="props" tilewidth="16" tileheight="16" tilecount="100" columns="10"/>
 <layer id="1" name="Ground" width="10" height="10">
  <properties><property name="parallax" type="float" value="0.5"/></properties>
  <data encoding="csv">{}</data>
 </layer>"##,
        csv(&gids)
    );
    let tmp = tempfile::tempdir().unwrap();
    let tmx = write(
        tmp.path(),
        "meadow.tmx",
        &map_xml(r##"width="10" height="10" infinite="0" backgroundcolor="#336699""##, &body),
    );
    let out = tmp.path().join("out");
    let report = compile_map_file(&tmx, &out, &MapCompileConfig::default()).unwrap();
    assert_eq!(report.layers, 1);
    assert_eq!(report.chunks, 0);
    assert_eq!(report.files.len(), 2);

    let cells = read_layer_blob(&out.join(format!("{}.bytes", layer_file_stem("Ground")))).unwrap();
    assert_eq!(cells.len(), 100);
    for (i, c) in cells.iter().enumerate() {
        let expected = match i % 4 {
            0 => TileCell::EMPTY,
            1 => cell(0, 0, i as i32),
            2 => cell(1, FLIP_H, i as i32),
            _ => cell(0, ROT_90_CW, i as i32),
        };
        assert_eq!(*c, expected, "cell {i}");
    }

    let info = read_map_info_file(&out.join(MAP_INFO_FILE)).unwrap();
    assert_eq!((info.width, info.height), (10, 10));
    assert_eq!(info.background, [0x33, 0x66, 0x99, 255]);
    assert!(!info.infinite);
    let props = info.properties.unwrap();
    assert_eq!(props.get("title"), Some(PropertyValue::String("Meadow".into())));
    assert_eq!(props.get("level"), Some(PropertyValue::Int(3)));
    assert_eq!(
        info.tile_properties[&0][&3].get("solid"),
        Some(PropertyValue::Bool(true))
    );
    assert_eq!(info.tile_properties.len(), 1);
    let [Section::Tiles(ground)] = info.sections.as_slice() else {
        panic!("expected one tile section, got {:?}", info.sections);
    };
    assert_eq!(ground.name, "Ground");
    assert_eq!((ground.width, ground.height), (10, 10));
    assert!(ground.settings.visible);
    assert_eq!(ground.settings.opacity, 1.0);
}

#[test]
fn groups_accumulate_offset_opacity_and_visibility() {
    let body = r#"<tileset firstgid="1" name="t" tilewidth="16" tileheight="16" tilecount="4" columns="2"/>
 <group id="5" name="Back" offsetx="10" offsety="5" opacity="0.5">
  <layer id="1" name="Far" width="2" height="2" offsetx="1" offsety="1" opacity="0.5"><data encoding="csv">1,1,1,1</data></layer>
  <group id="6" name="Hidden" visible="0">
   <objectgroup id="7" name="Markers" opacity="1"/>
  </group>
 </group>
 <layer id="2" name="Near" width="2" height="2"><data><tile gid="1"/><tile/><tile gid="1"/><tile gid="0"/></data></layer>"#;
    let tmp = tempfile::tempdir().unwrap();
    let tmx = write(tmp.path(), "g.tmx", &map_xml(r#"width="2" height="2""#, body));
    let out = tmp.path().join("out");
    let report = compile_map_file(&tmx, &out, &MapCompileConfig::default()).unwrap();
    assert_eq!((report.layers, report.object_groups), (2, 1));

    let info = read_map_info_file(&out.join(MAP_INFO_FILE)).unwrap();
    let [Section::Tiles(far), Section::Objects(markers), Section::Tiles(near)] = info.sections.as_slice()
    else {
        panic!("unexpected sections {:?}", info.sections);
    };
    assert_eq!(far.settings.offset, (11.0, 6.0));
    assert_eq!(far.settings.opacity, 64.0 / 255.0);
    assert!(far.settings.visible);

    assert_eq!(markers.settings.offset, (10.0, 5.0));
    assert_eq!(markers.settings.opacity, 128.0 / 255.0);
    assert!(!markers.settings.visible);
    assert!(markers.objects.is_empty());

    assert_eq!(near.settings.offset, (0.0, 0.0));
    let cells = read_layer_blob(&out.join(format!("{}.bytes", layer_file_stem("near")))).unwrap();
    assert_eq!(cells, vec![cell(0, 0, 0), TileCell::EMPTY, cell(0, 0, 0), TileCell::EMPTY]);
}

#[test]
fn object_sections_carry_template_merged_objects() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "coin.tx",
        r#"<template><object type="pickup" width="8" height="8"><properties><property name="value" type="int" value="1"/></properties><point/></object></template>"#,
    );
    let body = r##"<objectgroup id="1" name="Items" color="#8000ff00" offsetx="2">
  <object id="1" template="coin.tx" name="Gold" x="4" y="6"><properties><property name="value" type="int" value="5"/></properties></object>
  <object id="2" name="Zone" x="0" y="0" width="32" height="16" rotation="45" visible="0"/>
  <object id="3" name="Wall" x="1" y="1"><polygon points="0,0 8,0 8,8"/></object>
 </objectgroup>"##;
    let tmx = write(tmp.path(), "o.tmx", &map_xml(r#"width="4" height="4""#, body));
    let out = tmp.path().join("out");
    compile_map_file(&tmx, &out, &MapCompileConfig::default()).unwrap();

    let info = read_map_info_file(&out.join(MAP_INFO_FILE)).unwrap();
    let [Section::Objects(items)] = info.sections.as_slice() else {
        panic!("unexpected sections {:?}", info.sections);
    };
    assert_eq!(items.name, "Items");
    assert_eq!(items.color, [0, 255, 0, 128]);
    assert_eq!(items.settings.offset, (2.0, 0.0));
    let [gold, zone, wall] = items.objects.as_slice() else {
        panic!("expected three objects");
    };
    assert_eq!((gold.kind.as_str(), gold.x, gold.y, gold.width), ("pickup", 4.0, 6.0, 8.0));
    assert_eq!(gold.shape as u8, 1);
    assert_eq!(
        gold.properties.as_ref().unwrap().get("value"),
        Some(PropertyValue::Int(5))
    );
    assert_eq!((zone.rotation, zone.visible), (45.0, false));
    assert_eq!(zone.properties, None);
    assert_eq!(wall.points.len(), 3);
}

#[test]
fn infinite_layers_compile_to_indexed_chunks() {
    let chunk_a: Vec<u32> = vec![1; 256];
    let chunk_b: Vec<u32> = (0..256).map(|i| if i % 2 == 0 { 2 } else { 0 }).collect();
    let body = format!(
        r#"<editorsettings><chunksize width="16" height="16"/></editorsettings>
 <tileset firstgid="1" name="t" tilewidth="16" tileheight="16" tilecount="4" columns="2"/>
 <layer id="1" name="World" width="30" height="20">
  <data encoding="csv">
   <chunk x="-16" y="-16" width="16" height="16">{}</chunk>
   <chunk x="32" y="16" width="16" height="16">{}</chunk>
  </data>
 </layer>"#,
        csv(&chunk_a),
        csv(&chunk_b)
    );
    let tmp = tempfile::tempdir().unwrap();
    let tmx = write(tmp.path(), "inf.tmx", &map_xml(r#"width="30" height="20" infinite="1""#, &body));
    let out = tmp.path().join("out");
    let report = compile_map_file(&tmx, &out, &MapCompileConfig::default()).unwrap();
    assert_eq!((report.chunks, report.segments), (2, 1));

    let info = read_map_info_file(&out.join(MAP_INFO_FILE)).unwrap();
    assert!(info.infinite);
    assert_eq!((info.width, info.height), (64, 48));
    assert_eq!((info.chunk_width, info.chunk_height), (16, 16));

    let stem = layer_file_stem("World");
    let index = read_chunk_index(&out.join(format!("{stem}_index.bytes"))).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!((index[0].x, index[0].y), (0, 0));
    assert_eq!((index[1].x, index[1].y), (48, 32));
    assert_eq!(index[1].byte_offset, index[0].length);

    let a = read_chunk(&out, "World", &index[0]).unwrap();
    assert!(a.iter().all(|c| *c == cell(0, 0, 0)));
    let b = read_chunk(&out, "World", &index[1]).unwrap();
    assert_eq!(&b[..2], &[cell(0, 0, 1), TileCell::EMPTY]);
}

#[test]
fn small_segment_limit_gives_one_segment_per_chunk() {
    let chunks: String = (0..5)
        .map(|i| {
            format!(
                r#"<chunk x="{}" y="0" width="4" height="4">{}</chunk>"#,
                i * 4,
                csv(&[i as u32 + 1; 16])
            )
        })
        .collect();
    let body = format!(
        r#"<tileset firstgid="1" name="t" tilewidth="16" tileheight="16" tilecount="8" columns="4"/>
 <layer id="1" name="Strip" width="20" height="4"><data encoding="csv">{chunks}</data></layer>"#
    );
    let tmp = tempfile::tempdir().unwrap();
    let tmx = write(tmp.path(), "s.tmx", &map_xml(r#"width="20" height="4" infinite="1""#, &body));
    let out = tmp.path().join("out");
    let cfg = MapCompileConfig::builder().max_segment_size(1).build();
    let report = compile_map_file(&tmx, &out, &cfg).unwrap();
    assert_eq!((report.chunks, report.segments), (5, 5));

    let index = read_chunk_index(&out.join(format!("{}_index.bytes", layer_file_stem("Strip")))).unwrap();
    for (i, e) in index.iter().enumerate() {
        assert_eq!((e.segment, e.byte_offset), (i as u32, 0));
        assert_eq!(read_chunk(&out, "Strip", e).unwrap()[0].index, i as i32);
    }
}

#[test]
fn gids_past_the_tileset_tile_count_are_empty() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "ext.tsx",
        r#"<tileset name="ext" tilewidth="16" tileheight="16" tilecount="2" columns="2"/>"#,
    );
    let body = r#"<tileset firstgid="1" name="t" tilewidth="16" tileheight="16" tilecount="4" columns="2"/>
 <tileset firstgid="100" source="ext.tsx"/>
 <layer id="1" name="Edge" width="3" height="2"><data encoding="csv">2,500,4,5,101,102</data></layer>"#;
    let tmx = write(tmp.path(), "e.tmx", &map_xml(r#"width="3" height="2""#, body));
    let out = tmp.path().join("out");
    compile_map_file(&tmx, &out, &MapCompileConfig::default()).unwrap();

    let cells = read_layer_blob(&out.join(format!("{}.bytes", layer_file_stem("Edge")))).unwrap();
    assert_eq!(
        cells,
        vec![
            cell(0, 0, 1),
            TileCell::EMPTY,
            cell(0, 0, 3),
            TileCell::EMPTY,
            cell(1, 0, 1),
            TileCell::EMPTY,
        ]
    );
}

#[test]
fn layer_names_differing_only_in_case_are_rejected() {
    let body = r#"<layer id="1" name="Ground" width="1" height="1"><data encoding="csv">0</data></layer>
 <layer id="2" name="GROUND" width="1" height="1"><data encoding="csv">0</data></layer>"#;
    let tmp = tempfile::tempdir().unwrap();
    let tmx = write(tmp.path(), "d.tmx", &map_xml(r#"width="1" height="1""#, body));
    let err = compile_map_file(&tmx, &tmp.path().join("out"), &MapCompileConfig::default()).unwrap_err();
    match err {
        ContentError::InFile { source, .. } => {
            assert!(matches!(*source, ContentError::DuplicateLayerName(n) if n == "GROUND"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn object_groups_share_the_layer_name_space() {
    let cases = [
        (
            r#"<objectgroup id="1" name="Spawns"/>
 <objectgroup id="2" name="SPAWNS"/>"#,
            "SPAWNS",
        ),
        (
            r#"<objectgroup id="1" name="Spawns"/>
 <group id="2" name="G"><layer id="3" name="spawns" width="1" height="1"><data encoding="csv">0</data></layer></group>"#,
            "spawns",
        ),
    ];
    for (body, dup) in cases {
        let tmp = tempfile::tempdir().unwrap();
        let tmx = write(tmp.path(), "n.tmx", &map_xml(r#"width="1" height="1""#, body));
        let err = compile_map_file(&tmx, &tmp.path().join("out"), &MapCompileConfig::default()).unwrap_err();
        match err {
            ContentError::InFile { source, .. } => {
                assert!(matches!(*source, ContentError::DuplicateLayerName(ref n) if n == dup), "{source:?}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}

#[test]
fn previous_output_is_replaced() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("layer_deadbeef.bytes"), b"stale").unwrap();
    fs::write(out.join("old.meta"), b"stale").unwrap();
    fs::write(out.join("readme.txt"), b"keep").unwrap();

    let body = r#"<layer id="1" name="Only" width="1" height="1"><data encoding="csv">0</data></layer>"#;
    let tmx = write(tmp.path(), "r.tmx", &map_xml(r#"width="1" height="1""#, body));
    compile_map_file(&tmx, &out, &MapCompileConfig::default()).unwrap();

    assert!(!out.join("layer_deadbeef.bytes").exists());
    assert!(!out.join("old.meta").exists());
    assert!(out.join("readme.txt").exists());
    assert!(out.join(MAP_INFO_FILE).exists());
}

#[test]
fn bad_compile_settings_are_rejected() {
    let cfg = MapCompileConfig::builder().compression_level(12).build();
    assert!(cfg.validate().is_err());
    let cfg = MapCompileConfig::builder().max_segment_size(0).build();
    assert!(cfg.validate().is_err());
}
