// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-less instances shaped by an instruction stream.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Element, Elements, ElementsMut, FieldMut, FieldRef, Primitive, Reflect, SequenceMut};
use crate::config::DEFAULT_MAX_SEQUENCE_LEN;
use crate::descriptor::TopicDescriptor;
use crate::error::ConfigError;
use crate::ops::{instructions, Leaf, OpArena, Shape, StreamId, ROOT_STREAM};

/// Most values one default instance may hold, counting every array element.
pub const MAX_DEFAULT_VALUES: usize = DEFAULT_MAX_SEQUENCE_LEN as usize;

/// A value inside a [`DynamicSample`].
#[derive(Debug, Clone, PartialEq)]
pub enum DynValue {
    Prim(Primitive),
    Str(String),
    Struct(DynamicSample),
    /// Flattened fixed array.
    Array(Vec<DynValue>),
    Sequence(DynSequence),
}

impl DynValue {
    pub fn as_prim(&self) -> Option<Primitive> {
        match self {
            Self::Prim(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&DynamicSample> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of an array or sequence.
    pub fn items(&self) -> Option<&[DynValue]> {
        match self {
            Self::Array(items) => Some(items),
            Self::Sequence(seq) => Some(&seq.items),
            _ => None,
        }
    }

    /// Default value for `leaf`, charging every value built against `budget`.
    fn default_for(arena: &Arc<OpArena>, leaf: &Leaf, budget: &mut usize) -> Result<Self, ConfigError> {
        *budget = budget.saturating_sub(1);
        Ok(match leaf {
            Leaf::Prim(kind) => Self::Prim(Primitive::zero(*kind)),
            Leaf::Bool => Self::Prim(Primitive::Bool(false)),
            Leaf::String { .. } => Self::Str(String::new()),
            Leaf::Struct(stream) => Self::Struct(DynamicSample::build(arena, *stream, budget)?),
        })
    }
}

impl Element for DynValue {
    fn as_field(&self) -> FieldRef<'_> {
        match self {
            Self::Prim(p) => FieldRef::Prim(*p),
            Self::Str(s) => FieldRef::Str(s),
            Self::Struct(s) => FieldRef::Struct(s),
            Self::Array(items) => FieldRef::Array(items),
            Self::Sequence(seq) => FieldRef::Sequence(seq),
        }
    }

    fn as_field_mut(&mut self) -> FieldMut<'_> {
        match self {
            Self::Prim(p) => FieldMut::Prim(p.as_mut()),
            Self::Str(s) => FieldMut::Str(s),
            Self::Struct(s) => FieldMut::Struct(s),
            Self::Array(items) => FieldMut::Array(items),
            Self::Sequence(seq) => FieldMut::Sequence(seq),
        }
    }
}

/// A growable sequence that builds its own elements from the arena.
///
/// Elements are created lazily, so a stream may contain itself through a
/// sequence.
#[derive(Debug, Clone)]
pub struct DynSequence {
    arena: Arc<OpArena>,
    leaf: Leaf,
    items: Vec<DynValue>,
}

impl PartialEq for DynSequence {
    fn eq(&self, other: &Self) -> bool {
        self.leaf == other.leaf && self.items == other.items
    }
}

impl DynSequence {
    pub fn leaf(&self) -> &Leaf {
        &self.leaf
    }

    pub fn items(&self) -> &[DynValue] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [DynValue] {
        &mut self.items
    }

    /// Append a default element and return it.
    pub fn push_default(&mut self) -> Result<&mut DynValue, ConfigError> {
        let mut budget = MAX_DEFAULT_VALUES;
        let value = DynValue::default_for(&self.arena, &self.leaf, &mut budget)?;
        self.items.push(value);
        let last = self.items.len() - 1;
        Ok(&mut self.items[last])
    }
}

impl Elements for DynSequence {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn element(&self, index: usize) -> Option<FieldRef<'_>> {
        self.items.get(index).map(Element::as_field)
    }
}

impl ElementsMut for DynSequence {
    fn element_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
        self.items.get_mut(index).map(Element::as_field_mut)
    }
}

impl SequenceMut for DynSequence {
    fn resize(&mut self, len: usize) -> Result<(), ConfigError> {
        if len <= self.items.len() {
            self.items.truncate(len);
            return Ok(());
        }
        self.items.reserve(len - self.items.len());
        while self.items.len() < len {
            self.push_default()?;
        }
        Ok(())
    }
}

/// An instance of any descriptor, fields keyed by field index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DynamicSample {
    fields: BTreeMap<u32, DynValue>,
}

impl DynamicSample {
    /// Default-valued instance of `descriptor`'s root structure.
    pub fn new(descriptor: &TopicDescriptor) -> Result<Self, ConfigError> {
        Self::for_stream(&Arc::new(descriptor.ops.clone()), ROOT_STREAM)
    }

    /// Default-valued instance of the structure described by `stream`.
    ///
    /// The arena is validated first: a stream containing itself through a struct
    /// or array edge has no finite default.
    pub fn for_stream(arena: &Arc<OpArena>, stream: StreamId) -> Result<Self, ConfigError> {
        arena.validate()?;
        let mut budget = MAX_DEFAULT_VALUES;
        Self::build(arena, stream, &mut budget)
    }

    fn build(arena: &Arc<OpArena>, stream: StreamId, budget: &mut usize) -> Result<Self, ConfigError> {
        let words = arena.stream(stream).ok_or(ConfigError::StreamOutOfRange {
            stream,
            pc: 0,
            target: stream,
        })?;
        let mut fields = BTreeMap::new();
        for insn in instructions(stream, words) {
            let insn = insn?;
            let value = match &insn.shape {
                Shape::Single(leaf) => DynValue::default_for(arena, leaf, budget)?,
                Shape::Sequence(leaf) => DynValue::Sequence(DynSequence {
                    arena: Arc::clone(arena),
                    leaf: *leaf,
                    items: Vec::new(),
                }),
                Shape::Array { leaf, count } => {
                    let before = *budget;
                    let proto = DynValue::default_for(arena, leaf, budget)?;
                    let per = before - *budget;
                    let rest = per.checked_mul((*count as usize).saturating_sub(1));
                    match rest {
                        Some(rest) if rest <= *budget => *budget -= rest,
                        _ => {
                            return Err(ConfigError::ArrayTooLarge {
                                stream,
                                pc: insn.pc,
                                count: *count,
                                limit: MAX_DEFAULT_VALUES,
                            })
                        }
                    }
                    DynValue::Array(vec![proto; *count as usize])
                }
            };
            fields.insert(insn.field, value);
        }
        Ok(Self { fields })
    }

    pub fn get(&self, index: u32) -> Option<&DynValue> {
        self.fields.get(&index)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut DynValue> {
        self.fields.get_mut(&index)
    }

    /// Fields in index order.
    pub fn fields(&self) -> impl Iterator<Item = (u32, &DynValue)> {
        self.fields.iter().map(|(idx, value)| (*idx, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Reflect for DynamicSample {
    fn field(&self, index: u32) -> Option<FieldRef<'_>> {
        self.fields.get(&index).map(Element::as_field)
    }

    fn field_mut(&mut self, index: u32) -> Option<FieldMut<'_>> {
        self.fields.get_mut(&index).map(Element::as_field_mut)
    }
}
