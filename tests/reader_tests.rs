use pretty_assertions::assert_eq;
use std::io::{Cursor, Write};
use tabular_sdk::{load_manifest, FsReader, ReadError, Reader, Registry, SourceFormat, Shape, ZipReader};
use zip::write::SimpleFileOptions;

const MANIFEST: &str = r#"{
  "types": [
    {
      "name": "Hero",
      "resource": "hero",
      "key": "ID",
      "fields": [
        { "name": "ID", "type": "int", "required": true },
        { "name": "Name", "type": "string", "required": true },
        { "name": "Tags", "type": "string[]" }
      ]
    },
    {
      "name": "Global",
      "resource": "global.json",
      "shape": "singleton",
      "fields": [
        { "name": "Factor", "type": "double", "required": true },
        { "name": "Price", "type": "int", "required": true }
      ]
    }
  ]
}"#;

const HERO_CSV: &str = "ID,Name,Tags\n1,Alpha,melee|tank\n2,Beta,\n";
const GLOBAL_JSON: &str = r#"{"Factor":1.5,"Price":100}"#;

fn assert_loaded<R: Reader>(registry: &Registry<R>) {
    assert!(registry.is_loaded());
    let alpha = registry.find("Hero", &["1"]).unwrap().unwrap();
    assert_eq!(alpha.get_str("Name"), Some("Alpha"));
    assert_eq!(alpha.get("Tags").and_then(|t| t.as_list()).map(|l| l.len()), Some(2));
    assert_eq!(registry.get_instance("Global").unwrap().get_f64("Factor"), Some(1.5));
}

#[test]
fn manifest_resolves_formats_and_shapes() {
    let types = load_manifest(MANIFEST).unwrap();
    assert_eq!(types.len(), 2);
    assert_eq!(types[0].format, SourceFormat::Csv);
    assert_eq!(types[0].shape, Shape::Table);
    assert_eq!(types[0].keys, ["ID"]);
    assert_eq!(types[1].format, SourceFormat::Json);
    assert_eq!(types[1].shape, Shape::Singleton);
}

#[test]
fn manifest_rejects_bad_field_type() {
    let bad = r#"{"types":[{"name":"A","resource":"a","fields":[{"name":"X","type":"decimal"}]}]}"#;
    assert!(load_manifest(bad).is_err());
}

#[test]
fn fs_reader_tries_suffixes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hero.csv"), HERO_CSV).unwrap();
    std::fs::write(dir.path().join("global.json"), GLOBAL_JSON).unwrap();
    std::fs::write(dir.path().join("shop_config.json"), "[]").unwrap();

    let reader = FsReader::new(dir.path());
    assert_eq!(reader.read("hero").unwrap(), HERO_CSV);
    assert_eq!(reader.read("shop").unwrap(), "[]");
    assert!(matches!(reader.read("villain"), Err(ReadError::NotFound(_))));

    let mut registry = Registry::from_manifest(reader, MANIFEST).unwrap();
    registry.load_all().unwrap();
    assert_loaded(&registry);
}

fn bundle(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, text) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(text.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn zip_reader_serves_bundle_entries() {
    let reader = ZipReader::from_bytes(bundle(&[("hero.csv", HERO_CSV), ("global.json", GLOBAL_JSON)])).unwrap();
    let mut names = reader.entry_names().unwrap();
    names.sort();
    assert_eq!(names, ["global.json", "hero.csv"]);
    assert!(matches!(reader.read("villain"), Err(ReadError::NotFound(_))));

    let mut registry = Registry::from_manifest(reader, MANIFEST).unwrap();
    registry.load_all().unwrap();
    assert_loaded(&registry);
}

#[test]
fn zip_reader_opens_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("res.zip");
    std::fs::write(&path, bundle(&[("hero.csv", HERO_CSV)])).unwrap();
    let reader = ZipReader::open(&path).unwrap();
    assert_eq!(reader.read("hero").unwrap(), HERO_CSV);
    assert!(matches!(ZipReader::from_bytes(b"not a zip".to_vec()), Err(ReadError::Bundle(_))));
}
