// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Descriptor assembly from an ordered member list.
//!
//! Nested struct members contribute their whole arena (grafted once per type)
//! and their metadata (merged). The resulting markup lists dependencies before
//! the types that use them, so the output matches what an IDL compiler emits:
//!
//! ```
//! use opcdr::descriptor::TypeBuilder;
//! use opcdr::reflect::{MemberType, PrimKind};
//!
//! let desc = TypeBuilder::new("Geo::Point")
//!     .key("id", MemberType::Prim(PrimKind::U32))
//!     .member("xy", MemberType::Array { dims: vec![2], elem: Box::new(MemberType::Prim(PrimKind::F64)) })
//!     .build()
//!     .unwrap();
//! assert_eq!(desc.keys[0].index, 0);
//! assert_eq!(
//!     desc.meta,
//!     "<MetaData version=\"1.0.0\"><Module name=\"Geo\"><Struct name=\"Point\">\
//!      <Member name=\"id\"><ULong/></Member>\
//!      <Member name=\"xy\"><Array size=\"2\"><Double/></Array></Member>\
//!      </Struct></Module></MetaData>"
//! );
//! ```

use std::collections::{HashMap, HashSet};

use super::{KeyDescriptor, TopicDescriptor, TopicFlags};
use crate::config::{WireConfig, KEY_HASH_SIZE};
use crate::error::ConfigError;
use crate::meta::{canonical_name, scoped_parts, MetaData, MetaType, Member, Struct};
use crate::ops::{Leaf, OpArena, OpsBuilder, Shape, StreamId};
use crate::reflect::MemberType;

struct MemberDecl {
    name: String,
    ty: MemberType,
    key: bool,
}

/// Builder for a [`TopicDescriptor`].
pub struct TypeBuilder {
    type_name: String,
    size: u32,
    align: u32,
    members: Vec<MemberDecl>,
    keylist: Option<Vec<String>>,
}

impl TypeBuilder {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            size: 0,
            align: 1,
            members: Vec::new(),
            keylist: None,
        }
    }

    /// Host size and alignment, recorded as-is.
    pub fn layout(mut self, size: usize, align: usize) -> Self {
        self.size = size as u32;
        self.align = align as u32;
        self
    }

    pub fn member(mut self, name: impl Into<String>, ty: MemberType) -> Self {
        self.members.push(MemberDecl {
            name: name.into(),
            ty,
            key: false,
        });
        self
    }

    /// A member that is part of the key.
    pub fn key(mut self, name: impl Into<String>, ty: MemberType) -> Self {
        self.members.push(MemberDecl {
            name: name.into(),
            ty,
            key: true,
        });
        self
    }

    /// Explicit key list, in key order. Replaces per-member key marks.
    pub fn keylist<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keylist = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Assemble and validate the descriptor.
    pub fn build(self) -> Result<TopicDescriptor, ConfigError> {
        let type_name = canonical_name(&self.type_name);
        let parts = scoped_parts(&type_name);
        let Some((own_name, scope)) = parts.split_last() else {
            return Err(ConfigError::UnsupportedMember {
                reason: "empty type name",
            });
        };

        let mut names = HashSet::new();
        for member in &self.members {
            if !names.insert(member.name.as_str()) {
                return Err(ConfigError::DuplicateMember {
                    name: member.name.clone(),
                });
            }
        }
        let key_order = self.key_order()?;

        let mut asm = Assembly {
            arena: OpArena::from_root(Vec::new()),
            grafted: HashMap::new(),
            meta: MetaData::new(),
            meta_complete: true,
        };
        let mut ops = OpsBuilder::new();
        let mut pcs = Vec::with_capacity(self.members.len());
        let mut meta_members = Vec::with_capacity(self.members.len());
        for (idx, member) in self.members.iter().enumerate() {
            let shape = asm.shape(&member.ty)?;
            pcs.push(ops.field(idx as u32, &shape, key_order.contains(&idx)));
            meta_members.push(Member {
                name: member.name.clone(),
                ty: meta_type(&member.ty, scope),
            });
        }

        let mut streams = asm.arena.into_streams();
        streams[0] = ops.finish();

        let meta = if asm.meta_complete {
            asm.meta.insert_struct(
                scope,
                Struct {
                    name: (*own_name).to_owned(),
                    members: meta_members,
                },
            );
            asm.meta.render()
        } else {
            String::new()
        };

        let keys: Vec<KeyDescriptor> = key_order
            .iter()
            .map(|&idx| KeyDescriptor::new(self.members[idx].name.clone(), pcs[idx]))
            .collect();
        let mut desc = TopicDescriptor {
            type_name,
            size: self.size,
            align: self.align,
            flags: TopicFlags::empty(),
            key_count: keys.len() as u32,
            keys,
            ops: OpArena::new(streams),
            meta,
        };
        if desc.fixed_wire_size(&WireConfig::default()).is_none() {
            desc.flags = desc.flags | TopicFlags::NO_OPTIMIZE;
        }
        if !desc.keys.is_empty() && desc.max_key_size().is_some_and(|n| n <= KEY_HASH_SIZE) {
            desc.flags = desc.flags | TopicFlags::FIXED_KEY;
        }
        desc.validate()?;
        Ok(desc)
    }

    /// Member positions of the key fields, in key order.
    fn key_order(&self) -> Result<Vec<usize>, ConfigError> {
        let Some(list) = &self.keylist else {
            return Ok(self
                .members
                .iter()
                .enumerate()
                .filter(|(_, m)| m.key)
                .map(|(idx, _)| idx)
                .collect());
        };
        let mut order = Vec::with_capacity(list.len());
        for name in list {
            let idx = self
                .members
                .iter()
                .position(|m| &m.name == name)
                .ok_or_else(|| ConfigError::UnknownMember { name: name.clone() })?;
            if order.contains(&idx) {
                return Err(ConfigError::DuplicateKey { name: name.clone() });
            }
            order.push(idx);
        }
        Ok(order)
    }
}

/// Arena and metadata accumulated while lowering members.
struct Assembly {
    arena: OpArena,
    grafted: HashMap<String, StreamId>,
    meta: MetaData,
    meta_complete: bool,
}

impl Assembly {
    fn shape(&mut self, ty: &MemberType) -> Result<Shape, ConfigError> {
        Ok(match ty {
            MemberType::Sequence(elem) => Shape::Sequence(self.leaf(elem)?),
            MemberType::Array { dims, elem } => {
                let count = dims
                    .iter()
                    .try_fold(1u32, |acc, dim| acc.checked_mul(*dim))
                    .ok_or(ConfigError::UnsupportedMember {
                        reason: "array element count overflows u32",
                    })?;
                Shape::Array {
                    leaf: self.leaf(elem)?,
                    count,
                }
            }
            leaf => Shape::Single(self.leaf(leaf)?),
        })
    }

    fn leaf(&mut self, ty: &MemberType) -> Result<Leaf, ConfigError> {
        match ty {
            MemberType::Prim(kind) => Ok(Leaf::Prim(*kind)),
            MemberType::Bool => Ok(Leaf::Bool),
            MemberType::String { bound } => Ok(Leaf::String { bound: *bound }),
            MemberType::Struct(desc) => Ok(Leaf::Struct(self.stream_for(desc)?)),
            MemberType::Sequence(_) | MemberType::Array { .. } => {
                Err(ConfigError::UnsupportedMember {
                    reason: "collections of collections",
                })
            }
        }
    }

    fn stream_for(&mut self, desc: &TopicDescriptor) -> Result<StreamId, ConfigError> {
        let name = desc.canonical_name();
        if let Some(id) = self.grafted.get(&name) {
            return Ok(*id);
        }
        let id = self.arena.graft(&desc.ops)?;
        self.grafted.insert(name, id);
        if desc.meta.is_empty() {
            self.meta_complete = false;
        } else {
            self.meta.merge(&MetaData::parse(&desc.meta)?);
        }
        Ok(id)
    }
}

fn meta_type(ty: &MemberType, scope: &[&str]) -> MetaType {
    match ty {
        MemberType::Prim(kind) => MetaType::Prim(*kind),
        MemberType::Bool => MetaType::Boolean,
        MemberType::String { bound } => MetaType::String { length: *bound },
        MemberType::Struct(desc) => {
            let name = desc.canonical_name();
            let parts = scoped_parts(&name);
            let short = match parts.split_last() {
                Some((last, outer)) if outer == scope => (*last).to_owned(),
                _ => name.clone(),
            };
            MetaType::Type { name: short }
        }
        MemberType::Sequence(elem) => MetaType::Sequence(Box::new(meta_type(elem, scope))),
        MemberType::Array { dims, elem } => {
            dims.iter()
                .rev()
                .fold(meta_type(elem, scope), |inner, size| MetaType::Array {
                    size: *size,
                    elem: Box::new(inner),
                })
        }
    }
}
