// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::unreadable_literal)] // Large test constants
#![allow(clippy::cast_possible_truncation)] // Test parameters

//! `TestData::Msg`: every scalar kind, a keyed string, a string sequence and
//! one- and two-dimensional arrays.
//!
//! The same type is described twice, once as a hand-written op table and once
//! through `#[derive(Topic)]`; both must produce identical descriptors and bytes.

use opcdr::descriptor::{KeyDescriptor, TopicDescriptor, TopicFlags};
use opcdr::ops::*;
use opcdr::reflect::{DynValue, Primitive};
use opcdr::{Codec, Topic, WireConfig};

const MSG_META: &str = "<MetaData version=\"1.0.0\"><Module name=\"TestData\"><Struct name=\"Msg\"><Member name=\"short_field\"><Short/></Member><Member name=\"long_field\"><Long/></Member><Member name=\"ushort_field\"><UShort/></Member><Member name=\"ulong_field\"><ULong/></Member><Member name=\"float_field\"><Float/></Member><Member name=\"double_field\"><Double/></Member><Member name=\"char_field\"><Char/></Member><Member name=\"bool_field\"><Boolean/></Member><Member name=\"octet_field\"><Octet/></Member><Member name=\"string_field\"><String/></Member><Member name=\"sequence_field\"><Sequence><String/></Sequence></Member><Member name=\"array_field\"><Array size=\"25\"><Short/></Array></Member><Member name=\"twod_array_field\"><Array size=\"25\"><Array size=\"30\"><Float/></Array></Array></Member></Struct></Module></MetaData>";

#[derive(Debug, Clone, Default, PartialEq, Topic)]
#[topic(name = "TestData::Msg")]
struct Msg {
    #[key]
    short_field: i16,
    #[key]
    long_field: i32,
    ushort_field: u16,
    ulong_field: u32,
    float_field: f32,
    double_field: f64,
    char_field: i8,
    bool_field: bool,
    octet_field: u8,
    #[key]
    string_field: String,
    sequence_field: Vec<String>,
    array_field: [i16; 25],
    twod_array_field: [[f32; 30]; 25],
}

fn hand_written() -> TopicDescriptor {
    TopicDescriptor {
        type_name: "TestData::Msg".into(),
        size: std::mem::size_of::<Msg>() as u32,
        align: 8,
        flags: TopicFlags::NO_OPTIMIZE,
        key_count: 3,
        keys: vec![
            KeyDescriptor::new("short_field", 0),
            KeyDescriptor::new("long_field", 2),
            KeyDescriptor::new("string_field", 18),
        ],
        ops: OpArena::from_root(vec![
            OP_ADR | TYPE_2BY | FLAG_SGN | FLAG_KEY, 0,
            OP_ADR | TYPE_4BY | FLAG_SGN | FLAG_KEY, 1,
            OP_ADR | TYPE_2BY, 2,
            OP_ADR | TYPE_4BY, 3,
            OP_ADR | TYPE_4BY | FLAG_FP, 4,
            OP_ADR | TYPE_8BY | FLAG_FP, 5,
            OP_ADR | TYPE_1BY | FLAG_SGN, 6,
            OP_ADR | TYPE_BOO, 7,
            OP_ADR | TYPE_1BY, 8,
            OP_ADR | TYPE_STR | FLAG_KEY, 9,
            OP_ADR | TYPE_SEQ | SUBTYPE_STR, 10,
            OP_ADR | TYPE_ARR | SUBTYPE_2BY | FLAG_SGN, 11, 25,
            OP_ADR | TYPE_ARR | SUBTYPE_4BY | FLAG_FP, 12, 750,
            OP_RTS,
        ]),
        meta: MSG_META.into(),
    }
}

fn sample() -> Msg {
    let mut msg = Msg {
        short_field: -3,
        long_field: 0x0102_0304,
        ushort_field: 65535,
        ulong_field: 7,
        float_field: 1.5,
        double_field: -2.25,
        char_field: -1,
        bool_field: true,
        octet_field: 0xAB,
        string_field: "hello".into(),
        sequence_field: vec!["a".into(), "bc".into()],
        ..Msg::default()
    };
    for (i, v) in msg.array_field.iter_mut().enumerate() {
        *v = i as i16 - 12;
    }
    for (r, row) in msg.twod_array_field.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = (r * 30 + c) as f32;
        }
    }
    msg
}

#[test]
fn test_derived_descriptor_matches_hand_written() {
    let derived = Msg::descriptor();
    let hand = hand_written();
    assert_eq!(hand.validate(), Ok(()));

    assert_eq!(derived.type_name, hand.type_name);
    assert_eq!(derived.ops, hand.ops);
    assert_eq!(derived.keys, hand.keys);
    assert_eq!(derived.key_count, 3);
    assert_eq!(derived.flags, TopicFlags::NO_OPTIMIZE);
    assert_eq!(derived.align, 8);
    assert_eq!(derived.meta, MSG_META);
}

#[test]
fn test_msg_wire_layout() {
    let msg = sample();
    let bytes = opcdr::serialize(Msg::descriptor(), &msg).expect("serialize");

    assert_eq!(&bytes[0..2], &(-3i16).to_le_bytes());
    assert_eq!(&bytes[2..4], &[0, 0]);
    assert_eq!(&bytes[4..8], &0x0102_0304i32.to_le_bytes());
    assert_eq!(&bytes[8..10], &65535u16.to_le_bytes());
    assert_eq!(&bytes[12..16], &7u32.to_le_bytes());
    assert_eq!(&bytes[16..20], &1.5f32.to_le_bytes());
    assert_eq!(&bytes[20..24], &[0; 4]);
    assert_eq!(&bytes[24..32], &(-2.25f64).to_le_bytes());
    assert_eq!(&bytes[32..35], &[0xFF, 1, 0xAB]);
    assert_eq!(&bytes[36..40], &6u32.to_le_bytes());
    assert_eq!(&bytes[40..46], b"hello\0");
    assert_eq!(&bytes[48..52], &2u32.to_le_bytes());
    assert_eq!(&bytes[52..58], &[2, 0, 0, 0, b'a', 0]);
    assert_eq!(&bytes[60..67], &[3, 0, 0, 0, b'b', b'c', 0]);
    assert_eq!(&bytes[68..70], &(-12i16).to_le_bytes());
    assert_eq!(&bytes[120..124], &0.0f32.to_le_bytes());
    assert_eq!(&bytes[3116..3120], &749.0f32.to_le_bytes());
    assert_eq!(bytes.len(), 3120);

    assert_eq!(opcdr::size_of(Msg::descriptor(), &msg).expect("size"), 3120);
}

#[test]
fn test_msg_roundtrip_and_dynamic_agree() {
    let msg = sample();
    let bytes = opcdr::serialize(Msg::descriptor(), &msg).expect("serialize");

    let back: Msg = opcdr::deserialize(Msg::descriptor(), &bytes).expect("deserialize");
    assert_eq!(back, msg);

    let hand = hand_written();
    let dynamic = opcdr::deserialize_dynamic(&hand, &bytes).expect("dynamic");
    assert_eq!(dynamic.get(9).and_then(DynValue::as_str), Some("hello"));
    assert_eq!(
        dynamic.get(12).and_then(DynValue::items).map(|items| items[31].clone()),
        Some(DynValue::Prim(Primitive::F32(31.0)))
    );
    assert_eq!(opcdr::serialize(&hand, &dynamic).expect("reserialize"), bytes);
}

#[test]
fn test_msg_key_in_declared_order() {
    let msg = sample();
    let key = opcdr::extract_key(Msg::descriptor(), &msg).expect("key");
    let mut expected = Vec::new();
    expected.extend_from_slice(&(-3i16).to_le_bytes());
    expected.extend_from_slice(&[0, 0]);
    expected.extend_from_slice(&0x0102_0304i32.to_le_bytes());
    expected.extend_from_slice(&6u32.to_le_bytes());
    expected.extend_from_slice(b"hello\0");
    assert_eq!(key, expected);

    // Non-key fields do not change the key or its hash.
    let mut other = msg.clone();
    other.ulong_field = 99;
    other.sequence_field.clear();
    assert_eq!(opcdr::extract_key(Msg::descriptor(), &other).expect("key"), expected);
    assert_eq!(
        opcdr::key_hash(Msg::descriptor(), &msg).expect("hash"),
        opcdr::key_hash(Msg::descriptor(), &other).expect("hash")
    );

    other.string_field.push('!');
    assert_ne!(
        opcdr::key_hash(Msg::descriptor(), &msg).expect("hash"),
        opcdr::key_hash(Msg::descriptor(), &other).expect("hash")
    );
}

#[test]
fn test_msg_big_endian_and_xcdr2() {
    let msg = sample();
    let be = Codec::new(WireConfig::cdr_be());
    let bytes = be.serialize(Msg::descriptor(), &msg).expect("serialize");
    assert_eq!(&bytes[4..8], &[1, 2, 3, 4]);
    let back: Msg = be.deserialize(Msg::descriptor(), &bytes).expect("deserialize");
    assert_eq!(back, msg);

    // XCDR2 caps alignment at 4: the double no longer needs its 4-byte pad.
    let x2 = Codec::new(WireConfig::xcdr2_le());
    let bytes = x2.serialize(Msg::descriptor(), &msg).expect("serialize");
    assert_eq!(bytes.len(), 3116);
    assert_eq!(x2.size_of(Msg::descriptor(), &msg).expect("size"), 3116);
    let back: Msg = x2.deserialize(Msg::descriptor(), &bytes).expect("deserialize");
    assert_eq!(back, msg);
}

#[test]
fn test_msg_payload_header_selects_decoding() {
    let msg = sample();
    let payload = Codec::new(WireConfig::cdr_be())
        .serialize_payload(Msg::descriptor(), &msg)
        .expect("payload");
    assert_eq!(&payload[..4], &[0x00, 0x00, 0x00, 0x00]);

    // A little-endian codec still decodes a big-endian payload.
    let back: Msg = Codec::default()
        .deserialize_payload(Msg::descriptor(), &payload)
        .expect("decode");
    assert_eq!(back, msg);
}
