//! Tests for presets, mask and configure.

use super::{parse, parse_err};
use crate::cli::{CliCommand, ListKind, MaskCommand};
use std::path::Path;

#[test]
fn cli_parse_presets() {
    match parse(&["gribq", "presets"]) {
        CliCommand::Presets { model } => assert!(model.is_none()),
        _ => panic!("expected Presets"),
    }
    match parse(&["gribq", "presets", "--model", "gfs"]) {
        CliCommand::Presets { model } => assert_eq!(model.as_deref(), Some("gfs")),
        _ => panic!("expected Presets"),
    }
}

#[test]
fn cli_parse_mask_encode() {
    match parse(&[
        "gribq", "mask", "encode", "--list", "variables", "UGRD", "VGRD",
    ]) {
        CliCommand::Mask {
            action: MaskCommand::Encode { model, list, ids },
        } => {
            assert!(model.is_none());
            assert_eq!(list, ListKind::Variables);
            assert_eq!(ids, vec!["UGRD", "VGRD"]);
        }
        _ => panic!("expected Mask Encode"),
    }
}

#[test]
fn cli_parse_mask_encode_requires_ids() {
    parse_err(&["gribq", "mask", "encode", "--list", "levels"]);
}

#[test]
fn cli_parse_mask_decode() {
    match parse(&["gribq", "mask", "decode", "--list", "levels", "0xb"]) {
        CliCommand::Mask {
            action: MaskCommand::Decode { list, mask, .. },
        } => {
            assert_eq!(list, ListKind::Levels);
            assert_eq!(mask, "0xb");
        }
        _ => panic!("expected Mask Decode"),
    }
}

#[test]
fn cli_parse_mask_unknown_list() {
    parse_err(&["gribq", "mask", "decode", "--list", "params", "0x1"]);
}

#[test]
fn cli_parse_configure() {
    match parse(&["gribq", "configure", "--storage", "/srv/grib"]) {
        CliCommand::Configure { storage } => {
            assert_eq!(storage.as_deref(), Some(Path::new("/srv/grib")));
        }
        _ => panic!("expected Configure"),
    }
    match parse(&["gribq", "configure"]) {
        CliCommand::Configure { storage } => assert!(storage.is_none()),
        _ => panic!("expected Configure"),
    }
}
