// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decode walker.
//!
//! Every length read from the wire is checked against the configured limits and
//! against the bytes actually left before anything is allocated.

use super::{flat_len, nesting_too_deep, root_stream, sub_stream, Trail, MAX_NESTING_DEPTH};
use crate::config::{WireConfig, LENGTH_PREFIX_SIZE};
use crate::descriptor::TopicDescriptor;
use crate::error::{ConfigError, MarshalError, Result};
use crate::ops::{instructions, Instruction, Leaf, Op, Shape, StreamId, ROOT_STREAM};
use crate::reflect::{ElementsMut, FieldMut, PrimMut, Primitive, Reflect};
use crate::ser::{CdrReader, Shortfall};

fn truncated(trail: &Trail<'_>, short: Shortfall) -> MarshalError {
    MarshalError::TruncatedInput {
        field: trail.path(),
        offset: short.offset,
        needed: short.needed,
        available: short.available,
    }
}

pub(super) struct Decoder<'d, 'b> {
    desc: &'d TopicDescriptor,
    wire: &'d WireConfig,
    input: CdrReader<'b>,
    /// Lower bound of each stream's encoded size, filled on demand.
    min_sizes: Vec<Option<usize>>,
}

impl<'d, 'b> Decoder<'d, 'b> {
    pub(super) fn new(desc: &'d TopicDescriptor, wire: &'d WireConfig, input: CdrReader<'b>) -> Self {
        Self {
            desc,
            wire,
            input,
            min_sizes: vec![None; desc.ops.len()],
        }
    }

    pub(super) fn root(&mut self, instance: &mut dyn Reflect) -> Result<()> {
        let words = root_stream(self.desc)?;
        self.stream(ROOT_STREAM, words, instance, &Trail::Root, 0)
    }

    fn config(&self, err: ConfigError) -> MarshalError {
        MarshalError::config(&self.desc.type_name, err)
    }

    fn stream(
        &mut self,
        stream: StreamId,
        words: &'d [u32],
        instance: &mut dyn Reflect,
        trail: &Trail<'_>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_NESTING_DEPTH {
            return Err(nesting_too_deep(trail, self.input.offset()));
        }
        let mut pc = 0;
        loop {
            match Op::decode(stream, words, pc).map_err(|err| self.config(err))? {
                Op::Return => return Ok(()),
                Op::Field(insn) => {
                    self.field(stream, &insn, instance, trail, depth)?;
                    pc += insn.len;
                }
            }
        }
    }

    fn field(
        &mut self,
        stream: StreamId,
        insn: &Instruction,
        instance: &mut dyn Reflect,
        trail: &Trail<'_>,
        depth: usize,
    ) -> Result<()> {
        let here = trail.field(insn.field);
        let Some(slot) = instance.field_mut(insn.field) else {
            return Err(self.config(ConfigError::MissingField { field: here.path() }));
        };

        match (&insn.shape, slot) {
            (Shape::Single(leaf), slot) => self.leaf(stream, insn, leaf, slot, &here, depth),
            (Shape::Sequence(leaf), FieldMut::Sequence(items)) => {
                let offset = self.input.offset() + self.input.padding_for(LENGTH_PREFIX_SIZE);
                let count = self
                    .input
                    .read_length()
                    .map_err(|short| truncated(&here, short))?;
                if count > self.wire.max_sequence_len {
                    return Err(MarshalError::MalformedLength {
                        field: here.path(),
                        offset,
                        length: u64::from(count),
                        reason: "sequence count exceeds max_sequence_len",
                    });
                }
                let count = count as usize;
                let needed = count.saturating_mul(self.min_size(leaf));
                if needed > self.input.remaining() {
                    return Err(MarshalError::TruncatedInput {
                        field: here.path(),
                        offset: self.input.offset(),
                        needed,
                        available: self.input.remaining(),
                    });
                }
                items.resize(count).map_err(|err| self.config(err))?;
                for idx in 0..count {
                    let at = here.index(idx);
                    let Some(item) = items.element_mut(idx) else {
                        return Err(self.config(ConfigError::MissingField { field: at.path() }));
                    };
                    self.leaf(stream, insn, leaf, item, &at, depth)?;
                }
                Ok(())
            }
            (Shape::Array { leaf, count }, FieldMut::Array(items)) => {
                let found = flat_len(&*items);
                if found != *count as usize {
                    return Err(self.config(ConfigError::ArrayCountMismatch {
                        field: here.path(),
                        declared: *count,
                        found,
                    }));
                }
                let mut next = 0;
                self.array(stream, insn, leaf, items, &here, &mut next, depth)
            }
            (shape, slot) => Err(self.config(ConfigError::LayoutMismatch {
                field: here.path(),
                expected: shape.to_string(),
                found: slot.kind_name(),
            })),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn array(
        &mut self,
        stream: StreamId,
        insn: &Instruction,
        leaf: &Leaf,
        items: &mut dyn ElementsMut,
        here: &Trail<'_>,
        next: &mut usize,
        depth: usize,
    ) -> Result<()> {
        for idx in 0..items.len() {
            match items.element_mut(idx) {
                Some(FieldMut::Array(inner)) => {
                    self.array(stream, insn, leaf, inner, here, next, depth)?;
                }
                Some(slot) => {
                    self.leaf(stream, insn, leaf, slot, &here.index(*next), depth)?;
                    *next += 1;
                }
                None => {
                    return Err(self.config(ConfigError::MissingField {
                        field: here.index(*next).path(),
                    }))
                }
            }
        }
        Ok(())
    }

    fn leaf(
        &mut self,
        stream: StreamId,
        insn: &Instruction,
        leaf: &Leaf,
        slot: FieldMut<'_>,
        trail: &Trail<'_>,
        depth: usize,
    ) -> Result<()> {
        match (leaf, slot) {
            (Leaf::Prim(kind), FieldMut::Prim(prim)) if prim.get().kind() == Some(*kind) => {
                let value = self
                    .input
                    .read_prim(*kind)
                    .map_err(|short| truncated(trail, short))?;
                prim.set(value);
                Ok(())
            }
            (Leaf::Bool, FieldMut::Prim(prim @ PrimMut::Bool(_))) => {
                let offset = self.input.offset();
                let value = match self.input.read_u8().map_err(|short| truncated(trail, short))? {
                    0 => false,
                    1 => true,
                    other => {
                        return Err(MarshalError::InvalidEncoding {
                            field: trail.path(),
                            offset,
                            reason: format!("boolean byte {:#04x}", other),
                        })
                    }
                };
                prim.set(Primitive::Bool(value));
                Ok(())
            }
            (Leaf::String { bound }, FieldMut::Str(text)) => self.string(*bound, text, trail),
            (Leaf::Struct(target), FieldMut::Struct(inner)) => {
                let words = sub_stream(self.desc, stream, insn, *target)?;
                self.stream(*target, words, inner, trail, depth + 1)
            }
            (leaf, slot) => Err(self.config(ConfigError::LayoutMismatch {
                field: trail.path(),
                expected: leaf.to_string(),
                found: slot.kind_name(),
            })),
        }
    }

    fn string(&mut self, bound: Option<u32>, slot: &mut String, trail: &Trail<'_>) -> Result<()> {
        let offset = self.input.offset() + self.input.padding_for(LENGTH_PREFIX_SIZE);
        let len = self
            .input
            .read_length()
            .map_err(|short| truncated(trail, short))?;
        let malformed = |reason| MarshalError::MalformedLength {
            field: trail.path(),
            offset,
            length: u64::from(len),
            reason,
        };
        if len == 0 {
            return Err(malformed("string length must count the terminating NUL"));
        }
        if len > self.wire.max_string_len {
            return Err(malformed("string length exceeds max_string_len"));
        }
        if bound.is_some_and(|bound| len - 1 > bound) {
            return Err(malformed("string longer than its bound"));
        }

        let bytes = self
            .input
            .take(len as usize)
            .map_err(|short| truncated(trail, short))?;
        let body_at = offset + LENGTH_PREFIX_SIZE;
        let invalid = |at: usize, reason: String| MarshalError::InvalidEncoding {
            field: trail.path(),
            offset: at,
            reason,
        };
        let (body, nul) = bytes.split_at(bytes.len() - 1);
        if nul != [0] {
            return Err(invalid(
                body_at + body.len(),
                "string is not NUL-terminated".into(),
            ));
        }
        if let Some(pos) = body.iter().position(|&b| b == 0) {
            return Err(invalid(body_at + pos, "string contains an interior NUL".into()));
        }
        let text = std::str::from_utf8(body).map_err(|err| {
            invalid(
                body_at + err.valid_up_to(),
                format!("string is not valid UTF-8: {}", err),
            )
        })?;
        slot.clear();
        slot.push_str(text);
        Ok(())
    }

    /// Fewest bytes one element of `leaf` can occupy.
    fn min_size(&mut self, leaf: &Leaf) -> usize {
        self.leaf_min(leaf, 0)
    }

    fn leaf_min(&mut self, leaf: &Leaf, depth: usize) -> usize {
        match leaf {
            Leaf::Struct(stream) => self.stream_min(*stream, depth + 1),
            other => other.min_wire_size(),
        }
    }

    // Zero is always a valid lower bound, so stream defects answer zero here and
    // surface when the walker reaches them.
    fn stream_min(&mut self, stream: StreamId, depth: usize) -> usize {
        if let Some(Some(size)) = self.min_sizes.get(stream as usize) {
            return *size;
        }
        if depth > self.desc.ops.len() {
            return 0;
        }
        let Some(words) = self.desc.ops.stream(stream) else {
            return 0;
        };
        let mut total = 0usize;
        for insn in instructions(stream, words) {
            let Ok(insn) = insn else {
                return 0;
            };
            let size = match insn.shape {
                Shape::Single(leaf) => self.leaf_min(&leaf, depth),
                Shape::Sequence(_) => LENGTH_PREFIX_SIZE,
                Shape::Array { leaf, count } => {
                    self.leaf_min(&leaf, depth).saturating_mul(count as usize)
                }
            };
            total = total.saturating_add(size);
        }
        if let Some(slot) = self.min_sizes.get_mut(stream as usize) {
            *slot = Some(total);
        }
        total
    }
}
