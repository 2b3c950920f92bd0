// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The op-stream interpreter.
//!
//! One generic walker per direction executes a descriptor's root stream top to
//! bottom, recursing only into sub-streams. Serialize, size computation and key
//! extraction share the encode walker over different [`Sink`](crate::ser::Sink)s;
//! deserialize runs the decode walker.
//!
//! Every operation is synchronous, touches only the instance it was handed, and
//! either completes or reports the first failure with the field it hit.
//!
//! # Example
//!
//! ```
//! use opcdr::descriptor::TypeBuilder;
//! use opcdr::interp::Codec;
//! use opcdr::reflect::{DynValue, DynamicSample, MemberType, PrimKind, Primitive};
//!
//! let desc = TypeBuilder::new("Demo::Reading")
//!     .key("sensor", MemberType::Prim(PrimKind::U16))
//!     .member("label", MemberType::String { bound: None })
//!     .build()
//!     .unwrap();
//!
//! let mut sample = DynamicSample::new(&desc).unwrap();
//! *sample.get_mut(0).unwrap() = DynValue::Prim(Primitive::U16(7));
//! *sample.get_mut(1).unwrap() = DynValue::Str("hall".into());
//!
//! let codec = Codec::default();
//! let bytes = codec.serialize(&desc, &sample).unwrap();
//! assert_eq!(bytes, [7, 0, 0, 0, 5, 0, 0, 0, b'h', b'a', b'l', b'l', 0]);
//! assert_eq!(codec.size_of(&desc, &sample).unwrap(), bytes.len());
//! assert_eq!(codec.extract_key(&desc, &sample).unwrap(), [7, 0]);
//! assert_eq!(codec.deserialize_dynamic(&desc, &bytes).unwrap(), sample);
//! ```

mod decode;
mod encode;
mod key;

use crate::config::WireConfig;
use crate::descriptor::{TopicDescriptor, TopicFlags};
use crate::error::{ConfigError, FieldPath, MarshalError, PathStep, Result};
use crate::ops::{Instruction, StreamId};
use crate::reflect::{DynamicSample, Elements, FieldRef, Reflect};
use crate::ser::{split_header, write_header, CdrReader, CdrWriter, SizeCounter};

use decode::Decoder;
use encode::Encoder;

/// Deepest struct/sequence nesting the walkers follow.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Location of the walker inside the instance, as a borrowed chain.
#[derive(Clone, Copy)]
pub(crate) enum Trail<'a> {
    Root,
    Field(&'a Trail<'a>, u32),
    Index(&'a Trail<'a>, usize),
}

impl Trail<'_> {
    pub(crate) fn field(&self, index: u32) -> Trail<'_> {
        Trail::Field(self, index)
    }

    pub(crate) fn index(&self, index: usize) -> Trail<'_> {
        Trail::Index(self, index)
    }

    pub(crate) fn path(&self) -> FieldPath {
        let mut steps = Vec::new();
        let mut cur = self;
        loop {
            match cur {
                Trail::Root => break,
                Trail::Field(parent, idx) => {
                    steps.push(PathStep::Field(*idx));
                    cur = parent;
                }
                Trail::Index(parent, idx) => {
                    steps.push(PathStep::Index(*idx));
                    cur = parent;
                }
            }
        }
        steps.reverse();
        FieldPath::new(steps)
    }
}

fn root_stream(desc: &TopicDescriptor) -> Result<&[u32]> {
    desc.ops
        .root()
        .ok_or_else(|| MarshalError::config(&desc.type_name, ConfigError::EmptyArena))
}

/// Words of the structure `insn` (in `stream`) refers to.
fn sub_stream<'d>(
    desc: &'d TopicDescriptor,
    stream: StreamId,
    insn: &Instruction,
    target: StreamId,
) -> Result<&'d [u32]> {
    desc.ops.stream(target).ok_or_else(|| {
        MarshalError::config(
            &desc.type_name,
            ConfigError::StreamOutOfRange {
                stream,
                pc: insn.pc,
                target,
            },
        )
    })
}

/// Leaf count of a possibly nested array.
fn flat_len<E: Elements + ?Sized>(items: &E) -> usize {
    (0..items.len())
        .map(|idx| match items.element(idx) {
            Some(FieldRef::Array(inner)) => flat_len(inner),
            _ => 1,
        })
        .sum()
}

fn nesting_too_deep(trail: &Trail<'_>, offset: usize) -> MarshalError {
    MarshalError::InvalidEncoding {
        field: trail.path(),
        offset,
        reason: format!("nesting deeper than {} levels", MAX_NESTING_DEPTH),
    }
}

/// Log configuration faults once, at the operation that hit them.
fn logged<T>(op: &str, desc: &TopicDescriptor, result: Result<T>) -> Result<T> {
    if let Err(err @ MarshalError::Configuration { .. }) = &result {
        log::error!("[interp] {} `{}`: {}", op, desc.type_name, err);
    }
    result
}

/// Marshalling engine bound to one wire configuration.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    wire: WireConfig,
}

impl Codec {
    pub fn new(wire: WireConfig) -> Self {
        Self { wire }
    }

    pub fn wire(&self) -> &WireConfig {
        &self.wire
    }

    /// Encode `instance` into a fresh buffer.
    pub fn serialize(&self, desc: &TopicDescriptor, instance: &dyn Reflect) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.serialize_into(desc, instance, &mut out)?;
        Ok(out)
    }

    /// Append the encoding of `instance` to `out`; alignment starts at `out.len()`.
    ///
    /// On failure `out` is restored to its previous length.
    pub fn serialize_into(
        &self,
        desc: &TopicDescriptor,
        instance: &dyn Reflect,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let start = out.len();
        let mut enc = Encoder::new(desc, &self.wire, CdrWriter::new(&mut *out, &self.wire));
        let result = logged("serialize", desc, enc.root(instance));
        if result.is_err() {
            out.truncate(start);
        }
        result
    }

    /// Decode a fresh `T` from `bytes`. Trailing bytes are ignored.
    pub fn deserialize<T: Reflect + Default>(&self, desc: &TopicDescriptor, bytes: &[u8]) -> Result<T> {
        let mut instance = T::default();
        self.decode_into(desc, bytes, &mut instance)?;
        Ok(instance)
    }

    /// Decode into a schema-less sample shaped by `desc`.
    pub fn deserialize_dynamic(&self, desc: &TopicDescriptor, bytes: &[u8]) -> Result<DynamicSample> {
        let mut sample = logged(
            "deserialize",
            desc,
            DynamicSample::new(desc).map_err(|err| MarshalError::config(&desc.type_name, err)),
        )?;
        self.decode_into(desc, bytes, &mut sample)?;
        Ok(sample)
    }

    fn decode_into(
        &self,
        desc: &TopicDescriptor,
        bytes: &[u8],
        instance: &mut dyn Reflect,
    ) -> Result<()> {
        let mut dec = Decoder::new(desc, &self.wire, CdrReader::new(bytes, &self.wire));
        logged("deserialize", desc, dec.root(instance))
    }

    /// Encode only the key fields, in declared key order.
    pub fn extract_key(&self, desc: &TopicDescriptor, instance: &dyn Reflect) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut enc = Encoder::new(desc, &self.wire, CdrWriter::new(&mut out, &self.wire));
        logged("extract_key", desc, enc.keys(instance))?;
        Ok(out)
    }

    /// Exact length `serialize` would produce.
    ///
    /// Fixed-size (optimizable) descriptors are answered from the stream once the
    /// root fields match it; nested structures are not visited.
    pub fn size_of(&self, desc: &TopicDescriptor, instance: &dyn Reflect) -> Result<usize> {
        let mut enc = Encoder::new(
            desc,
            &self.wire,
            CdrWriter::new(SizeCounter::default(), &self.wire),
        );
        if !desc.flags.contains(TopicFlags::NO_OPTIMIZE) {
            if let Some(size) = desc.fixed_wire_size(&self.wire) {
                logged("size_of", desc, enc.root_layout(instance))?;
                return Ok(size);
            }
        }
        logged("size_of", desc, enc.root(instance))?;
        Ok(enc.position())
    }

    /// 16-byte DDS key hash of `instance`.
    pub fn key_hash(&self, desc: &TopicDescriptor, instance: &dyn Reflect) -> Result<[u8; 16]> {
        key::key_hash(desc, instance)
    }

    /// Encode with the 4-byte encapsulation header describing this codec's wire format.
    pub fn serialize_payload(&self, desc: &TopicDescriptor, instance: &dyn Reflect) -> Result<Vec<u8>> {
        let kind = self.wire.encapsulation().ok_or_else(|| {
            MarshalError::config(
                &desc.type_name,
                ConfigError::NoEncapsulation {
                    max_align: self.wire.max_align,
                },
            )
        })?;
        let mut out = Vec::new();
        write_header(&mut out, kind);
        self.serialize_into(desc, instance, &mut out)?;
        Ok(out)
    }

    /// Decode a payload whose header selects byte order and alignment.
    ///
    /// Length limits come from this codec. Error offsets are relative to the body.
    pub fn deserialize_payload<T: Reflect + Default>(
        &self,
        desc: &TopicDescriptor,
        payload: &[u8],
    ) -> Result<T> {
        let (wire, body) = self.payload_wire(payload)?;
        Codec::new(wire).deserialize(desc, body)
    }

    /// Like [`deserialize_payload`](Self::deserialize_payload), into a dynamic sample.
    pub fn deserialize_payload_dynamic(
        &self,
        desc: &TopicDescriptor,
        payload: &[u8],
    ) -> Result<DynamicSample> {
        let (wire, body) = self.payload_wire(payload)?;
        Codec::new(wire).deserialize_dynamic(desc, body)
    }

    fn payload_wire<'p>(&self, payload: &'p [u8]) -> Result<(WireConfig, &'p [u8])> {
        let (kind, body) = split_header(payload).map_err(|short| MarshalError::TruncatedInput {
            field: FieldPath::root(),
            offset: short.offset,
            needed: short.needed,
            available: short.available,
        })?;
        let framing =
            WireConfig::from_encapsulation(kind).ok_or_else(|| MarshalError::InvalidEncoding {
                field: FieldPath::root(),
                offset: 0,
                reason: format!("unknown encapsulation identifier {:#06x}", kind),
            })?;
        Ok((
            WireConfig {
                byte_order: framing.byte_order,
                max_align: framing.max_align,
                ..self.wire.clone()
            },
            body,
        ))
    }
}

/// [`Codec::serialize`] with the default wire configuration.
pub fn serialize(desc: &TopicDescriptor, instance: &dyn Reflect) -> Result<Vec<u8>> {
    Codec::default().serialize(desc, instance)
}

/// [`Codec::deserialize`] with the default wire configuration.
pub fn deserialize<T: Reflect + Default>(desc: &TopicDescriptor, bytes: &[u8]) -> Result<T> {
    Codec::default().deserialize(desc, bytes)
}

/// [`Codec::deserialize_dynamic`] with the default wire configuration.
pub fn deserialize_dynamic(desc: &TopicDescriptor, bytes: &[u8]) -> Result<DynamicSample> {
    Codec::default().deserialize_dynamic(desc, bytes)
}

/// [`Codec::extract_key`] with the default wire configuration.
pub fn extract_key(desc: &TopicDescriptor, instance: &dyn Reflect) -> Result<Vec<u8>> {
    Codec::default().extract_key(desc, instance)
}

/// [`Codec::size_of`] with the default wire configuration.
pub fn size_of(desc: &TopicDescriptor, instance: &dyn Reflect) -> Result<usize> {
    Codec::default().size_of(desc, instance)
}

/// 16-byte DDS key hash: big-endian key bytes, zero-padded when the key can never
/// exceed 16 bytes, MD5 digest otherwise.
pub fn key_hash(desc: &TopicDescriptor, instance: &dyn Reflect) -> Result<[u8; 16]> {
    key::key_hash(desc, instance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_path() {
        let root = Trail::Root;
        let field = root.field(3);
        let nested = field.field(0);
        let elem = nested.index(17);
        assert_eq!(elem.path().to_string(), ".3.0[17]");
        assert!(root.path().is_root());
    }

    #[test]
    fn test_size_of_shortcut_checks_root_layout() {
        use crate::descriptor::TypeBuilder;
        use crate::reflect::{DynValue, MemberType};
        use crate::ops::PrimKind;

        let fixed = |first: PrimKind| {
            TypeBuilder::new("Size::Fixed")
                .member("id", MemberType::Prim(first))
                .member(
                    "axes",
                    MemberType::Array {
                        dims: vec![3],
                        elem: Box::new(MemberType::Prim(PrimKind::I16)),
                    },
                )
                .build()
                .expect("build")
        };
        let desc = fixed(PrimKind::U32);
        assert!(!desc.flags.contains(TopicFlags::NO_OPTIMIZE));

        let codec = Codec::default();
        let mut sample = DynamicSample::new(&desc).expect("sample");
        assert_eq!(codec.size_of(&desc, &sample), Ok(10));

        let other = DynamicSample::new(&fixed(PrimKind::F32)).expect("other");
        assert!(matches!(
            codec.size_of(&desc, &other),
            Err(MarshalError::Configuration {
                source: ConfigError::LayoutMismatch { ref field, .. },
                ..
            }) if *field == FieldPath::new(vec![PathStep::Field(0)])
        ));

        if let Some(DynValue::Array(items)) = sample.get_mut(1) {
            items.pop();
        }
        assert!(matches!(
            codec.size_of(&desc, &sample),
            Err(MarshalError::Configuration {
                source: ConfigError::ArrayCountMismatch { declared: 3, found: 2, .. },
                ..
            })
        ));
    }
}
