// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unreadable_literal)] // Large test constants

//! Failure reporting: descriptor defects surface as `Configuration`, bad wire
//! data as one of the recoverable variants, each pointing at the failing field.

use opcdr::error::PathStep;
use opcdr::{
    Codec, ConfigError, FieldPath, MarshalError, Topic, TopicDescriptor, WireConfig,
};

#[derive(Debug, Clone, Default, PartialEq, Topic)]
#[topic(name = "Errs::Point")]
struct Point {
    x: i32,
    y: i32,
    visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Topic)]
#[topic(name = "Errs::Track")]
struct Track {
    #[key]
    id: u32,
    active: bool,
    #[topic(bound = 4)]
    label: String,
    points: Vec<Point>,
}

const TRACK_YAML: &str = r#"
type_name: Errs.Track
size: 48
align: 8
flags: 3
key_count: 1
keys:
  - name: id
    index: 0
ops:
  - [0x01030001, 0, 0x010b0000, 1, 0x01060000, 2, 4, 0x01070a00, 3, 1, 0]
  - [0x01030002, 0, 0x01030002, 1, 0x010b0000, 2, 0]
"#;

fn track() -> Track {
    Track {
        id: 3,
        active: true,
        label: "abc".into(),
        points: vec![Point {
            x: 1,
            y: -1,
            visible: true,
        }],
    }
}

#[test]
fn test_yaml_descriptor_matches_derived() {
    let loaded: TopicDescriptor = serde_yaml::from_str(TRACK_YAML).expect("yaml");
    loaded.validate().expect("valid");
    let derived = Track::descriptor();
    assert_eq!(loaded.ops, derived.ops);
    assert_eq!(loaded.keys, derived.keys);
    assert_eq!(loaded.canonical_name(), derived.type_name);

    // A derived instance marshals identically through either descriptor.
    let value = track();
    assert_eq!(
        opcdr::serialize(&loaded, &value).expect("loaded"),
        opcdr::serialize(derived, &value).expect("derived")
    );
}

#[test]
fn test_wrong_descriptor_is_configuration_error() {
    let err = opcdr::serialize(Point::descriptor(), &track()).expect_err("mismatch");
    assert!(!err.is_recoverable());
    match err {
        MarshalError::Configuration {
            type_name,
            source: ConfigError::LayoutMismatch { field, .. },
        } => {
            assert_eq!(type_name, "Errs::Point");
            // Point's i32 `x` against Track's u32 `id`.
            assert_eq!(field, FieldPath::new(vec![PathStep::Field(0)]));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_invalid_bool_is_recoverable() {
    let desc = Track::descriptor();
    let codec = Codec::default();
    let mut bytes = codec.serialize(desc, &track()).expect("serialize");
    bytes[4] = 2;

    let err = codec.deserialize::<Track>(desc, &bytes).expect_err("bad bool");
    assert!(err.is_recoverable());
    assert!(matches!(err, MarshalError::InvalidEncoding { offset: 4, .. }));
    assert_eq!(err.field(), Some(&FieldPath::new(vec![PathStep::Field(1)])));

    // The same codec keeps working once the input is fixed.
    bytes[4] = 0;
    let back: Track = codec.deserialize(desc, &bytes).expect("retry");
    assert!(!back.active);
}

#[test]
fn test_bounded_string_limits() {
    let desc = Track::descriptor();
    let mut value = track();
    value.label = "abcde".into();
    let err = opcdr::serialize(desc, &value).expect_err("over bound");
    assert!(matches!(err, MarshalError::MalformedLength { length: 5, .. }));

    // Same overflow arriving from the wire.
    let mut bytes = opcdr::serialize(desc, &track()).expect("serialize");
    bytes[8] = 6;
    let err = opcdr::deserialize::<Track>(desc, &bytes).expect_err("over bound");
    assert!(matches!(
        err,
        MarshalError::MalformedLength { offset: 8, length: 6, .. }
    ));
}

#[test]
fn test_sequence_element_path() {
    let desc = Track::descriptor();
    let mut value = track();
    value.points.push(Point {
        x: 9,
        y: 9,
        visible: false,
    });
    let mut bytes = opcdr::serialize(desc, &value).expect("serialize");
    assert_eq!(bytes.len(), 41);

    // Second point's `visible` flag.
    bytes[40] = 7;
    let err = opcdr::deserialize::<Track>(desc, &bytes).expect_err("bad flag");
    assert!(matches!(err, MarshalError::InvalidEncoding { offset: 40, .. }));
    assert_eq!(
        err.field(),
        Some(&FieldPath::new(vec![
            PathStep::Field(3),
            PathStep::Index(1),
            PathStep::Field(2),
        ]))
    );
    assert_eq!(err.field().map(ToString::to_string).as_deref(), Some(".3[1].2"));

    // 18 bytes after the count still fit two minimal points; the cut lands in `y`.
    let err = opcdr::deserialize::<Track>(desc, &bytes[..38]).expect_err("short");
    assert!(matches!(err, MarshalError::TruncatedInput { offset: 36, .. }));
    assert_eq!(err.field().map(ToString::to_string).as_deref(), Some(".3[1].1"));

    // One byte less fails the up-front count check on the sequence itself.
    let err = opcdr::deserialize::<Track>(desc, &bytes[..37]).expect_err("short");
    assert!(matches!(err, MarshalError::TruncatedInput { .. }));
    assert_eq!(err.field(), Some(&FieldPath::new(vec![PathStep::Field(3)])));
}

#[test]
fn test_sequence_limit_enforced_both_ways() {
    let desc = Track::descriptor();
    let codec = Codec::new(WireConfig {
        max_sequence_len: 1,
        ..WireConfig::default()
    });
    let mut value = track();
    assert!(codec.serialize(desc, &value).is_ok());

    value.points.push(Point::default());
    let err = codec.serialize(desc, &value).expect_err("too long");
    assert!(matches!(err, MarshalError::MalformedLength { length: 2, .. }));

    let bytes = opcdr::serialize(desc, &value).expect("default limits");
    let err = codec.deserialize::<Track>(desc, &bytes).expect_err("too long");
    assert!(matches!(err, MarshalError::MalformedLength { length: 2, .. }));
}

#[test]
fn test_payload_header_errors() {
    let desc = Track::descriptor();
    let codec = Codec::default();

    let err = codec.deserialize_payload::<Track>(desc, &[0, 1]).expect_err("short");
    assert!(matches!(
        err,
        MarshalError::TruncatedInput { needed: 4, available: 2, .. }
    ));

    let mut payload = codec.serialize_payload(desc, &track()).expect("payload");
    assert_eq!(&payload[..4], &[0x00, 0x01, 0x00, 0x00]);
    payload[1] = 0x42;
    let err = codec.deserialize_payload::<Track>(desc, &payload).expect_err("kind");
    assert!(matches!(err, MarshalError::InvalidEncoding { offset: 0, .. }));

    let packed = Codec::new(WireConfig {
        max_align: 1,
        ..WireConfig::default()
    });
    let err = packed.serialize_payload(desc, &track()).expect_err("no kind");
    assert!(matches!(
        err,
        MarshalError::Configuration {
            source: ConfigError::NoEncapsulation { max_align: 1 },
            ..
        }
    ));
}

#[test]
fn test_serialize_into_restores_buffer_on_error() {
    let desc = Track::descriptor();
    let mut value = track();
    value.label = "bad\0".into();
    let mut out = vec![0xAA; 3];
    let err = Codec::default()
        .serialize_into(desc, &value, &mut out)
        .expect_err("interior nul");
    assert!(matches!(err, MarshalError::InvalidEncoding { .. }));
    assert_eq!(out, [0xAA; 3]);
}
