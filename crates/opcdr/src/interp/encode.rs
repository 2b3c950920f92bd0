// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Encode walker shared by serialize, size computation and key extraction.

use super::{flat_len, nesting_too_deep, root_stream, sub_stream, Trail, MAX_NESTING_DEPTH};
use crate::config::WireConfig;
use crate::descriptor::TopicDescriptor;
use crate::error::{ConfigError, MarshalError, Result};
use crate::ops::{instructions, Instruction, Leaf, Op, Shape, StreamId, ROOT_STREAM};
use crate::reflect::{Elements, FieldRef, Primitive, Reflect};
use crate::ser::{CdrWriter, Sink};

pub(super) struct Encoder<'d, S> {
    desc: &'d TopicDescriptor,
    wire: &'d WireConfig,
    out: CdrWriter<S>,
}

impl<'d, S: Sink> Encoder<'d, S> {
    pub(super) fn new(desc: &'d TopicDescriptor, wire: &'d WireConfig, out: CdrWriter<S>) -> Self {
        Self { desc, wire, out }
    }

    /// Bytes produced so far.
    pub(super) fn position(&self) -> usize {
        self.out.position()
    }

    /// Encode the whole instance.
    pub(super) fn root(&mut self, instance: &dyn Reflect) -> Result<()> {
        let words = root_stream(self.desc)?;
        self.stream(ROOT_STREAM, words, instance, &Trail::Root, 0)
    }

    /// Encode the key fields only, in declared key order.
    pub(super) fn keys(&mut self, instance: &dyn Reflect) -> Result<()> {
        let keys = self.desc.key_instructions().map_err(|err| self.config(err))?;
        for insn in &keys {
            self.field(ROOT_STREAM, insn, instance, &Trail::Root, 0)?;
        }
        Ok(())
    }

    /// Check that the root fields have the kinds and array lengths the stream
    /// expects, without descending into structures or writing anything.
    pub(super) fn root_layout(&self, instance: &dyn Reflect) -> Result<()> {
        let words = root_stream(self.desc)?;
        let root = Trail::Root;
        for insn in instructions(ROOT_STREAM, words) {
            let insn = insn.map_err(|err| self.config(err))?;
            let here = root.field(insn.field);
            let value = instance
                .field(insn.field)
                .ok_or_else(|| self.config(ConfigError::MissingField { field: here.path() }))?;
            let fits = match (&insn.shape, &value) {
                (Shape::Single(Leaf::Prim(kind)), FieldRef::Prim(prim)) => prim.kind() == Some(*kind),
                (Shape::Single(Leaf::Bool), FieldRef::Prim(Primitive::Bool(_)))
                | (Shape::Single(Leaf::String { .. }), FieldRef::Str(_))
                | (Shape::Single(Leaf::Struct(_)), FieldRef::Struct(_))
                | (Shape::Sequence(_), FieldRef::Sequence(_)) => true,
                (Shape::Array { count, .. }, FieldRef::Array(items)) => {
                    let found = flat_len(*items);
                    if found != *count as usize {
                        return Err(self.config(ConfigError::ArrayCountMismatch {
                            field: here.path(),
                            declared: *count,
                            found,
                        }));
                    }
                    true
                }
                _ => false,
            };
            if !fits {
                return Err(self.config(ConfigError::LayoutMismatch {
                    field: here.path(),
                    expected: insn.shape.to_string(),
                    found: value.kind_name(),
                }));
            }
        }
        Ok(())
    }

    fn config(&self, err: ConfigError) -> MarshalError {
        MarshalError::config(&self.desc.type_name, err)
    }

    fn stream(
        &mut self,
        stream: StreamId,
        words: &'d [u32],
        instance: &dyn Reflect,
        trail: &Trail<'_>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_NESTING_DEPTH {
            return Err(nesting_too_deep(trail, self.out.position()));
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
        instance: &dyn Reflect,
        trail: &Trail<'_>,
        depth: usize,
    ) -> Result<()> {
        let here = trail.field(insn.field);
        let value = instance
            .field(insn.field)
            .ok_or_else(|| self.config(ConfigError::MissingField { field: here.path() }))?;

        match (&insn.shape, value) {
            (Shape::Single(leaf), value) => self.leaf(stream, insn, leaf, value, &here, depth),
            (Shape::Sequence(leaf), FieldRef::Sequence(items)) => {
                let len = items.len();
                if len > self.wire.max_sequence_len as usize {
                    return Err(MarshalError::MalformedLength {
                        field: here.path(),
                        offset: self.out.position(),
                        length: len as u64,
                        reason: "sequence longer than max_sequence_len",
                    });
                }
                self.out.write_u32(len as u32);
                for idx in 0..len {
                    let at = here.index(idx);
                    let item = items
                        .element(idx)
                        .ok_or_else(|| self.config(ConfigError::MissingField { field: at.path() }))?;
                    self.leaf(stream, insn, leaf, item, &at, depth)?;
                }
                Ok(())
            }
            (Shape::Array { leaf, count }, FieldRef::Array(items)) => {
                let found = flat_len(items);
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
            (shape, value) => Err(self.config(ConfigError::LayoutMismatch {
                field: here.path(),
                expected: shape.to_string(),
                found: value.kind_name(),
            })),
        }
    }

    /// Elements of a (possibly nested) array in row-major order.
    #[allow(clippy::too_many_arguments)]
    fn array(
        &mut self,
        stream: StreamId,
        insn: &Instruction,
        leaf: &Leaf,
        items: &dyn Elements,
        here: &Trail<'_>,
        next: &mut usize,
        depth: usize,
    ) -> Result<()> {
        for idx in 0..items.len() {
            match items.element(idx) {
                Some(FieldRef::Array(inner)) => {
                    self.array(stream, insn, leaf, inner, here, next, depth)?;
                }
                Some(value) => {
                    self.leaf(stream, insn, leaf, value, &here.index(*next), depth)?;
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
        value: FieldRef<'_>,
        trail: &Trail<'_>,
        depth: usize,
    ) -> Result<()> {
        match (leaf, value) {
            (Leaf::Prim(kind), FieldRef::Prim(prim)) if prim.kind() == Some(*kind) => {
                self.out.write_prim(prim);
                Ok(())
            }
            (Leaf::Bool, FieldRef::Prim(prim @ Primitive::Bool(_))) => {
                self.out.write_prim(prim);
                Ok(())
            }
            (Leaf::String { bound }, FieldRef::Str(text)) => self.string(text, *bound, trail),
            (Leaf::Struct(target), FieldRef::Struct(inner)) => {
                let words = sub_stream(self.desc, stream, insn, *target)?;
                self.stream(*target, words, inner, trail, depth + 1)
            }
            (leaf, value) => Err(self.config(ConfigError::LayoutMismatch {
                field: trail.path(),
                expected: leaf.to_string(),
                found: value.kind_name(),
            })),
        }
    }

    fn string(&mut self, text: &str, bound: Option<u32>, trail: &Trail<'_>) -> Result<()> {
        let offset = self.out.position();
        if text.as_bytes().contains(&0) {
            return Err(MarshalError::InvalidEncoding {
                field: trail.path(),
                offset,
                reason: "string contains an interior NUL".into(),
            });
        }
        let chars = text.len();
        if bound.is_some_and(|bound| chars > bound as usize) {
            return Err(MarshalError::MalformedLength {
                field: trail.path(),
                offset,
                length: chars as u64,
                reason: "string longer than its bound",
            });
        }
        // The prefix counts the NUL.
        if chars >= self.wire.max_string_len as usize {
            return Err(MarshalError::MalformedLength {
                field: trail.path(),
                offset,
                length: chars as u64 + 1,
                reason: "string longer than max_string_len",
            });
        }
        self.out.write_string(text);
        Ok(())
    }
}
