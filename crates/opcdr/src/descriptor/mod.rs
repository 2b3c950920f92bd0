// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic descriptors: everything the interpreter needs to marshal one type.
//!
//! A descriptor is immutable once built and is shared read-only (`Arc` or
//! `&'static`). [`TopicDescriptor::validate`] checks the structural invariants;
//! the interpreter relies on them only for speed, never for safety.

pub mod builder;
pub mod store;

pub use builder::TypeBuilder;
pub use store::DescriptorStore;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::{WireConfig, KEY_HASH_SIZE, LENGTH_PREFIX_SIZE};
use crate::error::ConfigError;
use crate::meta::{canonical_name, MetaData};
use crate::ops::{instructions, Instruction, Leaf, OpArena, Shape, StreamId, ROOT_STREAM};

/// Descriptor-level flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicFlags(pub u32);

impl TopicFlags {
    /// The type has variable-size members; sizes must be computed by walking.
    pub const NO_OPTIMIZE: Self = Self(0x0001);
    /// The serialized key never exceeds 16 bytes; the key hash is the padded key.
    pub const FIXED_KEY: Self = Self(0x0002);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TopicFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One key field: its name and the word position of its instruction in the root stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDescriptor {
    pub name: String,
    pub index: u32,
}

impl KeyDescriptor {
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

/// Static description of one structure type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDescriptor {
    /// Fully-qualified name, `::` or `.` separated.
    pub type_name: String,
    /// In-memory size of the host structure, in bytes.
    pub size: u32,
    /// In-memory alignment of the host structure, in bytes.
    pub align: u32,
    #[serde(default)]
    pub flags: TopicFlags,
    pub key_count: u32,
    #[serde(default)]
    pub keys: Vec<KeyDescriptor>,
    pub ops: OpArena,
    #[serde(default)]
    pub meta: String,
}

impl TopicDescriptor {
    /// Canonical `::` spelling of the type name.
    pub fn canonical_name(&self) -> String {
        canonical_name(&self.type_name)
    }

    /// Root-stream instruction starting at word `pc`, if `pc` is an instruction boundary.
    pub fn root_instruction_at(&self, pc: u32) -> Result<Option<Instruction>, ConfigError> {
        let words = self.ops.root().ok_or(ConfigError::EmptyArena)?;
        for insn in instructions(ROOT_STREAM, words) {
            let insn = insn?;
            if insn.pc == pc as usize {
                return Ok(Some(insn));
            }
            if insn.pc > pc as usize {
                break;
            }
        }
        Ok(None)
    }

    /// Key instructions in declared order.
    pub fn key_instructions(&self) -> Result<Vec<Instruction>, ConfigError> {
        self.keys
            .iter()
            .map(|key| {
                self.root_instruction_at(key.index)?
                    .ok_or_else(|| ConfigError::KeyOutOfRange {
                        name: key.name.clone(),
                        index: key.index,
                    })
            })
            .collect()
    }

    /// Check every structural invariant, and metadata consistency when markup is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ops.validate()?;

        if self.key_count as usize != self.keys.len() {
            return Err(ConfigError::KeyCountMismatch {
                declared: self.key_count,
                actual: self.keys.len(),
            });
        }
        let mut names = HashSet::new();
        for (key, insn) in self.keys.iter().zip(self.key_instructions()?) {
            if !names.insert(key.name.as_str()) {
                return Err(ConfigError::DuplicateKey {
                    name: key.name.clone(),
                });
            }
            if !insn.key {
                return Err(ConfigError::KeyNotFlagged {
                    name: key.name.clone(),
                    index: key.index,
                });
            }
            if matches!(insn.shape, Shape::Sequence(_)) {
                return Err(ConfigError::KeyOnSequence {
                    name: key.name.clone(),
                    index: key.index,
                });
            }
        }

        if !self.flags.contains(TopicFlags::NO_OPTIMIZE)
            && self.fixed_wire_size(&WireConfig::default()).is_none()
        {
            return Err(ConfigError::NotFixedSize);
        }
        if self.flags.contains(TopicFlags::FIXED_KEY)
            && !self.max_key_size().is_some_and(|n| n <= KEY_HASH_SIZE)
        {
            return Err(ConfigError::KeyNotFixed);
        }

        if !self.meta.is_empty() {
            let meta = MetaData::parse(&self.meta)?;
            meta.check_consistency(&self.type_name, &self.ops)?;
        }
        Ok(())
    }

    /// Encoded size of every instance, or `None` if the type has strings or sequences.
    pub fn fixed_wire_size(&self, wire: &WireConfig) -> Option<usize> {
        let bounds = Bounds {
            ops: &self.ops,
            wire,
            bounded_strings: false,
        };
        bounds.stream(ROOT_STREAM, 0, 0)
    }

    /// Largest possible serialized key in key-hash encoding, or `None` if unbounded.
    pub fn max_key_size(&self) -> Option<usize> {
        let wire = WireConfig::key_hash();
        let bounds = Bounds {
            ops: &self.ops,
            wire: &wire,
            bounded_strings: true,
        };
        let mut pos = 0;
        for insn in self.key_instructions().ok()? {
            pos = bounds.shape(&insn.shape, pos, 0)?;
        }
        Some(pos)
    }
}

/// Static upper bound of encoded sizes.
///
/// Positions are tracked from body start so padding is exact. `align_up` is
/// monotonic, so bounding each string by its maximum length bounds the total.
struct Bounds<'a> {
    ops: &'a OpArena,
    wire: &'a WireConfig,
    bounded_strings: bool,
}

impl Bounds<'_> {
    fn align(&self, pos: usize, width: usize) -> usize {
        let align = self.wire.align_for(width);
        pos.div_ceil(align) * align
    }

    fn stream(&self, stream: StreamId, pos: usize, depth: usize) -> Option<usize> {
        // Validated arenas are acyclic on these edges; the depth cap covers unvalidated ones.
        if depth > self.ops.len() {
            return None;
        }
        let words = self.ops.stream(stream)?;
        let mut pos = pos;
        for insn in instructions(stream, words) {
            pos = self.shape(&insn.ok()?.shape, pos, depth)?;
        }
        Some(pos)
    }

    fn shape(&self, shape: &Shape, pos: usize, depth: usize) -> Option<usize> {
        match shape {
            Shape::Single(leaf) => self.leaf(leaf, pos, depth),
            Shape::Sequence(_) => None,
            Shape::Array { count: 0, .. } => Some(pos),
            Shape::Array {
                leaf: Leaf::Prim(kind),
                count,
            } => self
                .align(pos, kind.width())
                .checked_add(kind.width().checked_mul(*count as usize)?),
            Shape::Array {
                leaf: Leaf::Bool,
                count,
            } => pos.checked_add(*count as usize),
            Shape::Array { leaf, count } => self.repeat(leaf, *count as usize, pos, depth),
        }
    }

    /// Walk `count` elements of `leaf` without visiting each one.
    ///
    /// An element's size depends only on its start position modulo `max_align`,
    /// so the element sizes repeat with a period of at most `max_align`.
    fn repeat(&self, leaf: &Leaf, count: usize, pos: usize, depth: usize) -> Option<usize> {
        // Every alignment divides `max_align` when it is a power of two, and 840 otherwise.
        let period = if self.wire.max_align.is_power_of_two() {
            self.wire.max_align
        } else {
            840
        };
        let mut seen: Vec<Option<(usize, usize)>> = vec![None; period];
        let mut pos = pos;
        let mut done = 0;
        while done < count {
            let phase = pos % period;
            if let Some((at, start)) = seen[phase] {
                let cycle = done - at;
                let cycles = (count - done) / cycle;
                pos = pos.checked_add((pos - start).checked_mul(cycles)?)?;
                for _ in 0..(count - done) % cycle {
                    pos = self.leaf(leaf, pos, depth)?;
                }
                return Some(pos);
            }
            seen[phase] = Some((done, pos));
            pos = self.leaf(leaf, pos, depth)?;
            done += 1;
        }
        Some(pos)
    }

    fn leaf(&self, leaf: &Leaf, pos: usize, depth: usize) -> Option<usize> {
        match leaf {
            Leaf::Prim(kind) => self.align(pos, kind.width()).checked_add(kind.width()),
            Leaf::Bool => pos.checked_add(1),
            Leaf::String { bound: Some(bound) } if self.bounded_strings => {
                let start = self.align(pos, LENGTH_PREFIX_SIZE);
                start.checked_add(LENGTH_PREFIX_SIZE + *bound as usize + 1)
            }
            Leaf::String { .. } => None,
            Leaf::Struct(stream) => self.stream(*stream, pos, depth + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::*;

    fn keyed(ops: Vec<Vec<u32>>, keys: Vec<KeyDescriptor>, flags: TopicFlags) -> TopicDescriptor {
        TopicDescriptor {
            type_name: "T".into(),
            size: 0,
            align: 1,
            flags,
            key_count: keys.len() as u32,
            keys,
            ops: OpArena::new(ops),
            meta: String::new(),
        }
    }

    #[test]
    fn test_validate_key_table() {
        let ops = vec![vec![
            OP_ADR | TYPE_4BY | FLAG_KEY,
            0,
            OP_ADR | TYPE_SEQ | SUBTYPE_1BY | FLAG_KEY,
            1,
            OP_ADR | TYPE_STR,
            2,
            OP_RTS,
        ]];
        let ok = keyed(ops.clone(), vec![KeyDescriptor::new("a", 0)], TopicFlags::NO_OPTIMIZE);
        assert_eq!(ok.validate(), Ok(()));

        let mut bad_count = ok.clone();
        bad_count.key_count = 2;
        assert!(matches!(
            bad_count.validate(),
            Err(ConfigError::KeyCountMismatch { declared: 2, actual: 1 })
        ));

        let mid_word = keyed(ops.clone(), vec![KeyDescriptor::new("a", 1)], TopicFlags::NO_OPTIMIZE);
        assert!(matches!(mid_word.validate(), Err(ConfigError::KeyOutOfRange { index: 1, .. })));

        let unflagged = keyed(ops.clone(), vec![KeyDescriptor::new("c", 4)], TopicFlags::NO_OPTIMIZE);
        assert!(matches!(unflagged.validate(), Err(ConfigError::KeyNotFlagged { .. })));

        let on_seq = keyed(ops.clone(), vec![KeyDescriptor::new("b", 2)], TopicFlags::NO_OPTIMIZE);
        assert!(matches!(on_seq.validate(), Err(ConfigError::KeyOnSequence { .. })));

        let dup = keyed(
            ops,
            vec![KeyDescriptor::new("a", 0), KeyDescriptor::new("a", 0)],
            TopicFlags::NO_OPTIMIZE,
        );
        assert!(matches!(dup.validate(), Err(ConfigError::DuplicateKey { .. })));
    }

    #[test]
    fn test_optimizable_requires_fixed_size() {
        let strings = keyed(
            vec![vec![OP_ADR | TYPE_STR, 0, OP_RTS]],
            Vec::new(),
            TopicFlags::empty(),
        );
        assert_eq!(strings.validate(), Err(ConfigError::NotFixedSize));

        let fixed = keyed(
            vec![vec![
                OP_ADR | TYPE_1BY,
                0,
                OP_ADR | TYPE_8BY | FLAG_FP,
                1,
                OP_ADR | TYPE_ARR | SUBTYPE_2BY,
                2,
                3,
                OP_RTS,
            ]],
            Vec::new(),
            TopicFlags::empty(),
        );
        assert_eq!(fixed.validate(), Ok(()));
        assert_eq!(fixed.fixed_wire_size(&WireConfig::cdr_le()), Some(22));
        assert_eq!(fixed.fixed_wire_size(&WireConfig::xcdr2_le()), Some(18));
    }

    #[test]
    fn test_fixed_key_bound() {
        let ops = vec![vec![
            OP_ADR | TYPE_2BY | FLAG_KEY,
            0,
            OP_ADR | TYPE_BST | FLAG_KEY,
            1,
            5,
            OP_ADR | TYPE_STR | FLAG_KEY,
            2,
            OP_RTS,
        ]];
        // u16 (2) + pad (2) + prefix (4) + 5 chars + NUL = 14
        let small = keyed(
            ops.clone(),
            vec![KeyDescriptor::new("a", 0), KeyDescriptor::new("b", 2)],
            TopicFlags::NO_OPTIMIZE | TopicFlags::FIXED_KEY,
        );
        assert_eq!(small.max_key_size(), Some(14));
        assert_eq!(small.validate(), Ok(()));

        let unbounded = keyed(
            ops,
            vec![KeyDescriptor::new("c", 5)],
            TopicFlags::NO_OPTIMIZE | TopicFlags::FIXED_KEY,
        );
        assert_eq!(unbounded.max_key_size(), None);
        assert_eq!(unbounded.validate(), Err(ConfigError::KeyNotFixed));
    }

    #[test]
    fn test_struct_array_size_without_walking_elements() {
        let record = |count| {
            keyed(
                vec![
                    vec![OP_ADR | TYPE_ARR | SUBTYPE_STU, 0, count, 1, OP_RTS],
                    vec![OP_ADR | TYPE_4BY, 0, OP_ADR | TYPE_1BY, 1, OP_RTS],
                ],
                Vec::new(),
                TopicFlags::NO_OPTIMIZE,
            )
        };
        let wire = WireConfig::default();
        // 0..5, 8..13, 16..21
        assert_eq!(record(3).fixed_wire_size(&wire), Some(21));
        assert_eq!(record(1).fixed_wire_size(&wire), Some(5));
        assert_eq!(record(0).fixed_wire_size(&wire), Some(0));
        assert_eq!(
            record(u32::MAX).fixed_wire_size(&wire),
            Some(8 * u32::MAX as usize - 3)
        );

        let packed = WireConfig {
            max_align: 1,
            ..WireConfig::default()
        };
        assert_eq!(record(3).fixed_wire_size(&packed), Some(15));
    }

    #[test]
    fn test_metadata_is_checked_when_present() {
        let mut desc = keyed(
            vec![vec![OP_ADR | TYPE_4BY | FLAG_SGN, 0, OP_RTS]],
            Vec::new(),
            TopicFlags::empty(),
        );
        desc.type_name = "M::S".into();
        desc.meta = "<MetaData version=\"1.0.0\"><Module name=\"M\"><Struct name=\"S\">\
            <Member name=\"x\"><Long/></Member></Struct></Module></MetaData>"
            .into();
        assert_eq!(desc.validate(), Ok(()));

        desc.meta = desc.meta.replace("<Long/>", "<ULong/>");
        assert!(matches!(desc.validate(), Err(ConfigError::Metadata(_))));
    }

    #[test]
    fn test_descriptor_yaml_form() {
        let yaml = r#"
type_name: M::S
size: 4
align: 4
flags: 1
key_count: 1
keys:
  - name: x
    index: 0
ops:
  - [16973827, 0, 0]
"#;
        let desc: TopicDescriptor = serde_yaml::from_str(yaml).expect("yaml");
        assert_eq!(desc.flags, TopicFlags::NO_OPTIMIZE);
        assert_eq!(desc.ops.root(), Some(&[OP_ADR | TYPE_4BY | FLAG_SGN | FLAG_KEY, 0, OP_RTS][..]));
        assert_eq!(desc.validate(), Ok(()));
    }
}
