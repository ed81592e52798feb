use blit_content_core::config::SpritePackConfig;
use blit_content_core::error::ContentError;
use std::path::{Path, PathBuf};

#[test]
fn parses_keys_values_and_comments() {
    let text = "\
// sprite pack for the title screen
SOURCE_FOLDER = sprites/ui
source_folder=sprites/hero   // trailing comment
OUTPUT_WIDTH=512
OUTPUT_HEIGHT = 256

Trim = yes
";
    let cfg = SpritePackConfig::parse_descriptor(text, Path::new("assets")).unwrap();
    assert_eq!(
        cfg.source_folders,
        vec![PathBuf::from("assets/sprites/ui"), PathBuf::from("assets/sprites/hero")]
    );
    assert_eq!((cfg.output_width, cfg.output_height), (512, 256));
    assert!(cfg.trim);
}

#[test]
fn defaults_apply_when_keys_are_missing() {
    let cfg = SpritePackConfig::parse_descriptor("SOURCE_FOLDER=a", Path::new("")).unwrap();
    assert_eq!((cfg.output_width, cfg.output_height), (2048, 2048));
    assert!(!cfg.trim);
}

#[test]
fn unknown_key_reports_its_line() {
    let err = SpritePackConfig::parse_descriptor("SOURCE_FOLDER=a\nPADDING=2", Path::new("")).unwrap_err();
    match err {
        ContentError::Descriptor { line, message } => {
            assert_eq!(line, 2);
            assert!(message.contains("PADDING"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn malformed_lines_are_rejected() {
    for text in ["SOURCE_FOLDER", "OUTPUT_WIDTH=wide", "TRIM=maybe", "OUTPUT_HEIGHT="] {
        assert!(
            matches!(
                SpritePackConfig::parse_descriptor(text, Path::new("")),
                Err(ContentError::Descriptor { line: 1, .. })
            ),
            "{text}"
        );
    }
}

#[test]
fn descriptor_without_folders_is_valid() {
    let cfg = SpritePackConfig::parse_descriptor("// nothing yet\nOUTPUT_WIDTH=64", Path::new("")).unwrap();
    assert!(cfg.source_folders.is_empty());
    assert!(cfg.validate().is_ok());
}

#[test]
fn sheet_size_must_be_in_range() {
    for text in ["OUTPUT_WIDTH=32", "OUTPUT_HEIGHT=16384"] {
        assert!(matches!(
            SpritePackConfig::parse_descriptor(text, Path::new("")),
            Err(ContentError::InvalidDimensions { .. })
        ));
    }
}

#[test]
fn descriptor_file_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.sp");
    std::fs::write(&path, "NOPE=1").unwrap();
    match SpritePackConfig::from_descriptor_file(&path).unwrap_err() {
        ContentError::InFile { path: p, source } => {
            assert_eq!(p, path);
            assert!(matches!(*source, ContentError::Descriptor { line: 1, .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn builder_matches_parsed_config() {
    let built = SpritePackConfig::builder()
        .source_folder("x/a")
        .with_output_dimensions(1024, 1024)
        .trim(true)
        .build();
    let parsed = SpritePackConfig::parse_descriptor(
        "SOURCE_FOLDER=a\nOUTPUT_WIDTH=1024\nOUTPUT_HEIGHT=1024\nTRIM=true",
        Path::new("x"),
    )
    .unwrap();
    assert_eq!(built, parsed);
}
