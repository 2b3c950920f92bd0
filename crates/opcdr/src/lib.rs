// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # opcdr - op-stream driven CDR marshalling
//!
//! Marshals IDL-described structures to and from CDR by executing a compact
//! instruction stream carried in each type's [`TopicDescriptor`]. The same
//! interpreter serializes, deserializes, extracts keys and computes sizes for any
//! type; nothing is generated per type except the descriptor itself.
//!
//! ## Quick Start
//!
//! ```rust
//! use opcdr::Topic;
//!
//! #[derive(Debug, Default, PartialEq, opcdr::Topic)]
//! #[topic(name = "Sensors::Reading")]
//! struct Reading {
//!     #[key]
//!     sensor_id: u32,
//!     #[topic(bound = 16)]
//!     label: String,
//!     samples: Vec<f32>,
//! }
//!
//! let desc = Reading::descriptor();
//! let reading = Reading {
//!     sensor_id: 7,
//!     label: "hall".into(),
//!     samples: vec![20.5, 21.0],
//! };
//!
//! let bytes = opcdr::serialize(desc, &reading).unwrap();
//! assert_eq!(opcdr::size_of(desc, &reading).unwrap(), bytes.len());
//! assert_eq!(opcdr::extract_key(desc, &reading).unwrap(), [7, 0, 0, 0]);
//!
//! let back: Reading = opcdr::deserialize(desc, &bytes).unwrap();
//! assert_eq!(back, reading);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  #[derive(Topic)]  |  TypeBuilder  |  YAML / JSON descriptors       |
//! +---------------------------------------------------------------------+
//! |        TopicDescriptor (OpArena + key table + XML metadata)        |
//! +---------------------------------------------------------------------+
//! |    interp: serialize | deserialize | extract_key | size_of | hash  |
//! +---------------------------------------------------------------------+
//! |     reflect (indexed field access)  |  ser (aligned CDR cursors)   |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`ops`] - instruction words, decoding, arena, disassembler
//! - [`descriptor`] - descriptors, validation, registry and builder
//! - [`interp`] - the interpreter ([`Codec`])
//! - [`reflect`] - field access traits and dynamic samples
//! - [`meta`] - XML type metadata
//! - [`config`] - wire format constants and runtime configuration

// Allow the derive macro to work inside this crate's tests
extern crate self as opcdr;

/// Wire format constants and runtime configuration.
pub mod config;
/// Topic descriptors, validation, registry and builder.
pub mod descriptor;
/// Error taxonomy.
pub mod error;
/// The op-stream interpreter.
pub mod interp;
/// XML type metadata.
pub mod meta;
/// Instruction set, decoding and disassembly.
pub mod ops;
/// Indexed field access and dynamic samples.
pub mod reflect;
/// CDR cursors and payload header.
pub mod ser;

pub use config::{ByteOrder, WireConfig};
pub use descriptor::{DescriptorStore, KeyDescriptor, TopicDescriptor, TopicFlags, TypeBuilder};
pub use error::{ConfigError, FieldPath, MarshalError, Result};
pub use interp::{deserialize, deserialize_dynamic, extract_key, key_hash, serialize, size_of, Codec};
pub use reflect::{DynValue, DynamicSample, MemberType, Reflect, Topic, WireType};

// Derive macro (for #[derive(opcdr::Topic)])
#[cfg(feature = "derive")]
pub use opcdr_derive::Topic;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
