// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Instruction set of the marshalling engine.
//!
//! An instruction stream is a flat `u32` word array. Each instruction starts with
//! an opcode word:
//!
//! ```text
//!  31      24 23      16 15       8 7        0
//! +----------+----------+----------+----------+
//! |  opcode  |   type   | subtype  |  flags   |
//! +----------+----------+----------+----------+
//! ```
//!
//! followed by the field index and, depending on the type, an element count, a
//! string bound and/or a sub-stream index (always in that order, stream last).
//!
//! Sub-streams live in an [`OpArena`]; stream 0 is the root. A reference to a
//! nested structure is the arena index of its stream, never a pointer.
//!
//! # Example
//!
//! ```
//! use opcdr::ops::*;
//!
//! let words = [
//!     OP_ADR | TYPE_2BY | FLAG_SGN | FLAG_KEY, 0,
//!     OP_ADR | TYPE_ARR | SUBTYPE_4BY | FLAG_FP, 1, 750,
//!     OP_RTS,
//! ];
//! let Op::Field(insn) = Op::decode(0, &words, 0).unwrap() else { unreachable!() };
//! assert!(insn.key);
//! assert_eq!(insn.shape, Shape::Single(Leaf::Prim(PrimKind::I16)));
//! assert_eq!(insn.len, 2);
//! ```

mod builder;
mod disasm;

pub use builder::{encode_instruction, OpsBuilder};
pub use disasm::disassemble;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Index of a stream inside an [`OpArena`].
pub type StreamId = u32;

/// Root stream of every descriptor.
pub const ROOT_STREAM: StreamId = 0;

// =======================================================================
// Word encoding
// =======================================================================

/// Terminator: ends the current stream.
pub const OP_RTS: u32 = 0x00 << 24;
/// Field access.
pub const OP_ADR: u32 = 0x01 << 24;

/// Raw type codes (bits 16-23 as type, bits 8-15 as subtype).
pub const VAL_1BY: u32 = 0x01;
pub const VAL_2BY: u32 = 0x02;
pub const VAL_4BY: u32 = 0x03;
pub const VAL_8BY: u32 = 0x04;
pub const VAL_STR: u32 = 0x05;
pub const VAL_BST: u32 = 0x06;
pub const VAL_SEQ: u32 = 0x07;
pub const VAL_ARR: u32 = 0x08;
pub const VAL_STU: u32 = 0x0a;
pub const VAL_BOO: u32 = 0x0b;

pub const TYPE_1BY: u32 = VAL_1BY << 16;
pub const TYPE_2BY: u32 = VAL_2BY << 16;
pub const TYPE_4BY: u32 = VAL_4BY << 16;
pub const TYPE_8BY: u32 = VAL_8BY << 16;
pub const TYPE_STR: u32 = VAL_STR << 16;
pub const TYPE_BST: u32 = VAL_BST << 16;
pub const TYPE_SEQ: u32 = VAL_SEQ << 16;
pub const TYPE_ARR: u32 = VAL_ARR << 16;
pub const TYPE_STU: u32 = VAL_STU << 16;
pub const TYPE_BOO: u32 = VAL_BOO << 16;

pub const SUBTYPE_1BY: u32 = VAL_1BY << 8;
pub const SUBTYPE_2BY: u32 = VAL_2BY << 8;
pub const SUBTYPE_4BY: u32 = VAL_4BY << 8;
pub const SUBTYPE_8BY: u32 = VAL_8BY << 8;
pub const SUBTYPE_STR: u32 = VAL_STR << 8;
pub const SUBTYPE_BST: u32 = VAL_BST << 8;
pub const SUBTYPE_STU: u32 = VAL_STU << 8;
pub const SUBTYPE_BOO: u32 = VAL_BOO << 8;

/// Field contributes to the structure's identity.
pub const FLAG_KEY: u32 = 0x01;
/// Scalar is signed.
pub const FLAG_SGN: u32 = 0x02;
/// Scalar is an IEEE-754 float.
pub const FLAG_FP: u32 = 0x04;

const FLAG_MASK: u32 = FLAG_KEY | FLAG_SGN | FLAG_FP;

/// Attribute bits of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpFlags(pub u32);

impl OpFlags {
    pub const KEY: Self = Self(FLAG_KEY);
    pub const SGN: Self = Self(FLAG_SGN);
    pub const FP: Self = Self(FLAG_FP);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for OpFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// =======================================================================
// Decoded view
// =======================================================================

/// Scalar kinds addressable by the 1/2/4/8-byte type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl PrimKind {
    /// Size in bytes, on the wire and in memory.
    pub const fn width(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Raw width code (`VAL_1BY` .. `VAL_8BY`).
    pub const fn code(self) -> u32 {
        match self.width() {
            1 => VAL_1BY,
            2 => VAL_2BY,
            4 => VAL_4BY,
            _ => VAL_8BY,
        }
    }

    /// Attribute flags implied by the kind.
    pub const fn flags(self) -> u32 {
        match self {
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => FLAG_SGN,
            Self::F32 | Self::F64 => FLAG_FP,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => 0,
        }
    }

    /// Rebuild the kind from a width code and attribute flags.
    pub const fn from_code(code: u32, flags: u32) -> Option<Self> {
        let signed = flags & FLAG_SGN != 0;
        let float = flags & FLAG_FP != 0;
        match (code, signed, float) {
            (VAL_1BY, false, false) => Some(Self::U8),
            (VAL_1BY, true, false) => Some(Self::I8),
            (VAL_2BY, false, false) => Some(Self::U16),
            (VAL_2BY, true, false) => Some(Self::I16),
            (VAL_4BY, false, false) => Some(Self::U32),
            (VAL_4BY, true, false) => Some(Self::I32),
            (VAL_4BY, false, true) => Some(Self::F32),
            (VAL_8BY, false, false) => Some(Self::U64),
            (VAL_8BY, true, false) => Some(Self::I64),
            (VAL_8BY, false, true) => Some(Self::F64),
            _ => None,
        }
    }

    /// Rust spelling, used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

/// Element type of a field: everything that is not itself a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leaf {
    Prim(PrimKind),
    Bool,
    String { bound: Option<u32> },
    Struct(StreamId),
}

impl Leaf {
    /// Smallest possible encoded size, ignoring alignment.
    ///
    /// Nested structures count as zero; callers needing a tighter bound walk the
    /// sub-stream themselves.
    pub const fn min_wire_size(&self) -> usize {
        match self {
            Self::Prim(kind) => kind.width(),
            Self::Bool => 1,
            // length prefix + NUL
            Self::String { .. } => 5,
            Self::Struct(_) => 0,
        }
    }

    const fn sub_code(&self) -> u32 {
        match self {
            Self::Prim(kind) => kind.code(),
            Self::Bool => VAL_BOO,
            Self::String { bound: None } => VAL_STR,
            Self::String { bound: Some(_) } => VAL_BST,
            Self::Struct(_) => VAL_STU,
        }
    }

    const fn attr_flags(&self) -> u32 {
        match self {
            Self::Prim(kind) => kind.flags(),
            _ => 0,
        }
    }
}

/// Collection shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Single(Leaf),
    Sequence(Leaf),
    /// Fixed array; multi-dimensional arrays carry the product of their dimensions.
    Array { leaf: Leaf, count: u32 },
}

impl Shape {
    pub const fn leaf(&self) -> &Leaf {
        match self {
            Self::Single(leaf) | Self::Sequence(leaf) | Self::Array { leaf, .. } => leaf,
        }
    }
}

/// One decoded field-access instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Word position of the opcode word.
    pub pc: usize,
    /// Number of words the instruction occupies.
    pub len: usize,
    /// Field index within the enclosing structure.
    pub field: u32,
    pub key: bool,
    pub shape: Shape,
}

impl Instruction {
    /// Word position of the sub-stream reference, if the leaf is a structure.
    pub const fn stream_ref_pc(&self) -> Option<usize> {
        match self.shape.leaf() {
            Leaf::Struct(_) => Some(self.pc + self.len - 1),
            _ => None,
        }
    }

    /// Re-encode the instruction into words.
    pub fn encode(&self) -> Vec<u32> {
        encode_instruction(self.field, &self.shape, self.key)
    }
}

/// A decoded opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Field(Instruction),
    Return,
}

struct Words<'a> {
    stream: StreamId,
    words: &'a [u32],
    start: usize,
    pos: usize,
}

impl Words<'_> {
    fn next(&mut self) -> Result<u32, ConfigError> {
        let word = self
            .words
            .get(self.pos)
            .copied()
            .ok_or(ConfigError::TruncatedInstruction {
                stream: self.stream,
                pc: self.start,
            })?;
        self.pos += 1;
        Ok(word)
    }
}

impl Op {
    /// Decode the instruction starting at `pc` of `words`.
    pub fn decode(stream: StreamId, words: &[u32], pc: usize) -> Result<Self, ConfigError> {
        let mut cur = Words {
            stream,
            words,
            start: pc,
            pos: pc,
        };
        let word = cur
            .next()
            .map_err(|_| ConfigError::MissingTerminator { stream })?;

        match word >> 24 {
            0x00 if word == OP_RTS => return Ok(Self::Return),
            0x01 => {}
            _ => {
                return Err(ConfigError::UnknownOpcode { stream, pc, word });
            }
        }

        let type_code = (word >> 16) & 0xff;
        let sub_code = (word >> 8) & 0xff;
        let flags = word & 0xff;
        if flags & !FLAG_MASK != 0 {
            return Err(ConfigError::InvalidFlags {
                stream,
                pc,
                reason: "unknown flag bits",
            });
        }
        let field = cur.next()?;

        let shape = match type_code {
            VAL_SEQ => Shape::Sequence(decode_leaf(&mut cur, sub_code, flags)?),
            VAL_ARR => {
                let count = cur.next()?;
                Shape::Array {
                    leaf: decode_leaf(&mut cur, sub_code, flags)?,
                    count,
                }
            }
            VAL_1BY | VAL_2BY | VAL_4BY | VAL_8BY | VAL_BOO | VAL_STR | VAL_BST | VAL_STU => {
                if sub_code != 0 {
                    return Err(ConfigError::InvalidFlags {
                        stream,
                        pc,
                        reason: "subtype on a non-collection type",
                    });
                }
                Shape::Single(decode_leaf(&mut cur, type_code, flags)?)
            }
            other => {
                return Err(ConfigError::UnknownType {
                    stream,
                    pc,
                    code: other,
                })
            }
        };

        Ok(Self::Field(Instruction {
            pc,
            len: cur.pos - pc,
            field,
            key: flags & FLAG_KEY != 0,
            shape,
        }))
    }
}

fn decode_leaf(cur: &mut Words<'_>, code: u32, flags: u32) -> Result<Leaf, ConfigError> {
    let (stream, pc) = (cur.stream, cur.start);
    let attrs = flags & (FLAG_SGN | FLAG_FP);
    let leaf = match code {
        VAL_1BY | VAL_2BY | VAL_4BY | VAL_8BY => {
            let kind = PrimKind::from_code(code, flags).ok_or(ConfigError::InvalidFlags {
                stream,
                pc,
                reason: "signed/floating-point flags do not fit the width",
            })?;
            return Ok(Leaf::Prim(kind));
        }
        VAL_BOO => Leaf::Bool,
        VAL_STR => Leaf::String { bound: None },
        VAL_BST => Leaf::String {
            bound: Some(cur.next()?),
        },
        VAL_STU => Leaf::Struct(cur.next()?),
        VAL_SEQ | VAL_ARR => {
            return Err(ConfigError::UnsupportedSubtype { stream, pc, code });
        }
        other => {
            return Err(ConfigError::UnknownType {
                stream,
                pc,
                code: other,
            })
        }
    };
    if attrs != 0 {
        return Err(ConfigError::InvalidFlags {
            stream,
            pc,
            reason: "signed/floating-point flags on a non-numeric type",
        });
    }
    Ok(leaf)
}

// =======================================================================
// Arena
// =======================================================================

/// All instruction streams of one descriptor; stream 0 is the root.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpArena {
    streams: Vec<Vec<u32>>,
}

impl OpArena {
    pub fn new(streams: Vec<Vec<u32>>) -> Self {
        Self { streams }
    }

    /// Arena holding only a root stream.
    pub fn from_root(words: Vec<u32>) -> Self {
        Self {
            streams: vec![words],
        }
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn stream(&self, id: StreamId) -> Option<&[u32]> {
        self.streams.get(id as usize).map(Vec::as_slice)
    }

    pub fn root(&self) -> Option<&[u32]> {
        self.stream(ROOT_STREAM)
    }

    pub fn streams(&self) -> impl Iterator<Item = (StreamId, &[u32])> {
        self.streams
            .iter()
            .enumerate()
            .map(|(idx, words)| (idx as StreamId, words.as_slice()))
    }

    pub fn into_streams(self) -> Vec<Vec<u32>> {
        self.streams
    }

    /// Append a stream, returning its index.
    pub fn push(&mut self, words: Vec<u32>) -> StreamId {
        self.streams.push(words);
        (self.streams.len() - 1) as StreamId
    }

    /// Import every stream of `other`, re-basing its sub-stream references.
    ///
    /// Returns the index `other`'s root stream received in `self`.
    pub fn graft(&mut self, other: &OpArena) -> Result<StreamId, ConfigError> {
        let base = self.streams.len() as StreamId;
        let mut imported = Vec::with_capacity(other.streams.len());
        for (id, words) in other.streams() {
            let mut rebased = words.to_vec();
            for insn in instructions(id, words) {
                let insn = insn?;
                if let Some(at) = insn.stream_ref_pc() {
                    let target = rebased[at];
                    rebased[at] = target.checked_add(base).ok_or(ConfigError::StreamOutOfRange {
                        stream: id,
                        pc: insn.pc,
                        target,
                    })?;
                }
            }
            imported.push(rebased);
        }
        self.streams.extend(imported);
        Ok(base)
    }

    /// Check every stream decodes, terminates, references existing streams, and
    /// that no stream contains itself through struct or array edges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.streams.is_empty() {
            return Err(ConfigError::EmptyArena);
        }
        let mut edges: Vec<Vec<StreamId>> = Vec::with_capacity(self.streams.len());
        for (id, words) in self.streams() {
            let mut out = Vec::new();
            for insn in instructions(id, words) {
                let insn = insn?;
                if let Leaf::Struct(target) = insn.shape.leaf() {
                    if (*target as usize) >= self.streams.len() {
                        return Err(ConfigError::StreamOutOfRange {
                            stream: id,
                            pc: insn.pc,
                            target: *target,
                        });
                    }
                    if !matches!(insn.shape, Shape::Sequence(_)) {
                        out.push(*target);
                    }
                }
            }
            edges.push(out);
        }
        detect_cycles(&edges)
    }
}

fn detect_cycles(edges: &[Vec<StreamId>]) -> Result<(), ConfigError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Active,
        Done,
    }

    fn visit(node: usize, edges: &[Vec<StreamId>], marks: &mut [Mark]) -> Result<(), ConfigError> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::Active => {
                return Err(ConfigError::RecursiveStream {
                    stream: node as StreamId,
                })
            }
            Mark::Unvisited => {}
        }
        marks[node] = Mark::Active;
        for &next in &edges[node] {
            visit(next as usize, edges, marks)?;
        }
        marks[node] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; edges.len()];
    for node in 0..edges.len() {
        visit(node, edges, &mut marks)?;
    }
    Ok(())
}

/// Strict iterator over the field instructions of one stream.
///
/// Ends after the terminator; reports a missing terminator and any word after
/// it as errors.
pub fn instructions(stream: StreamId, words: &[u32]) -> Instructions<'_> {
    Instructions {
        stream,
        words,
        pc: 0,
        done: false,
    }
}

pub struct Instructions<'a> {
    stream: StreamId,
    words: &'a [u32],
    pc: usize,
    done: bool,
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, ConfigError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match Op::decode(self.stream, self.words, self.pc) {
            Ok(Op::Field(insn)) => {
                self.pc += insn.len;
                Some(Ok(insn))
            }
            Ok(Op::Return) => {
                self.done = true;
                if self.pc + 1 != self.words.len() {
                    return Some(Err(ConfigError::TrailingInstructions {
                        stream: self.stream,
                        pc: self.pc + 1,
                    }));
                }
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scalar_flags() {
        let words = [OP_ADR | TYPE_4BY | FLAG_FP, 4, OP_RTS];
        let Ok(Op::Field(insn)) = Op::decode(0, &words, 0) else {
            panic!("expected field instruction");
        };
        assert_eq!(insn.field, 4);
        assert!(!insn.key);
        assert_eq!(insn.shape, Shape::Single(Leaf::Prim(PrimKind::F32)));
        assert_eq!(Op::decode(0, &words, 2), Ok(Op::Return));
    }

    #[test]
    fn test_decode_array_of_bounded_strings() {
        let words = [OP_ADR | TYPE_ARR | SUBTYPE_BST | FLAG_KEY, 7, 3, 16, OP_RTS];
        let Ok(Op::Field(insn)) = Op::decode(2, &words, 0) else {
            panic!("expected field instruction");
        };
        assert_eq!(insn.len, 4);
        assert_eq!(
            insn.shape,
            Shape::Array {
                leaf: Leaf::String { bound: Some(16) },
                count: 3
            }
        );
        assert_eq!(insn.stream_ref_pc(), None);
        assert_eq!(insn.encode(), words[..4].to_vec());
    }

    #[test]
    fn test_decode_rejects_bad_words() {
        assert_eq!(
            Op::decode(0, &[0x0500_0000], 0),
            Err(ConfigError::UnknownOpcode {
                stream: 0,
                pc: 0,
                word: 0x0500_0000
            })
        );
        assert!(matches!(
            Op::decode(0, &[OP_ADR | TYPE_2BY | FLAG_FP, 0], 0),
            Err(ConfigError::InvalidFlags { .. })
        ));
        assert!(matches!(
            Op::decode(0, &[OP_ADR | TYPE_STR | FLAG_SGN, 0], 0),
            Err(ConfigError::InvalidFlags { .. })
        ));
        assert!(matches!(
            Op::decode(0, &[OP_ADR | TYPE_SEQ | (VAL_SEQ << 8), 0], 0),
            Err(ConfigError::UnsupportedSubtype { .. })
        ));
        assert!(matches!(
            Op::decode(0, &[OP_ADR | TYPE_ARR | SUBTYPE_1BY, 0], 0),
            Err(ConfigError::TruncatedInstruction { .. })
        ));
        assert_eq!(
            Op::decode(3, &[], 0),
            Err(ConfigError::MissingTerminator { stream: 3 })
        );
    }

    #[test]
    fn test_instructions_reject_trailing_words() {
        let words = [OP_ADR | TYPE_BOO, 0, OP_RTS, OP_ADR | TYPE_BOO, 1];
        let result: Result<Vec<_>, _> = instructions(0, &words).collect();
        assert_eq!(
            result,
            Err(ConfigError::TrailingInstructions { stream: 0, pc: 3 })
        );
    }

    #[test]
    fn test_validate_out_of_range_and_cycles() {
        let arena = OpArena::new(vec![vec![OP_ADR | TYPE_STU, 0, 1, OP_RTS]]);
        assert!(matches!(
            arena.validate(),
            Err(ConfigError::StreamOutOfRange { target: 1, .. })
        ));

        let direct = OpArena::new(vec![
            vec![OP_ADR | TYPE_STU, 0, 1, OP_RTS],
            vec![OP_ADR | TYPE_ARR | SUBTYPE_STU, 0, 2, 1, OP_RTS],
        ]);
        assert_eq!(
            direct.validate(),
            Err(ConfigError::RecursiveStream { stream: 1 })
        );

        // A sequence edge may recurse: the empty sequence terminates it.
        let tree = OpArena::new(vec![
            vec![OP_ADR | TYPE_4BY, 0, OP_ADR | TYPE_SEQ | SUBTYPE_STU, 1, 0, OP_RTS],
        ]);
        assert_eq!(tree.validate(), Ok(()));

        assert_eq!(OpArena::default().validate(), Err(ConfigError::EmptyArena));
    }

    #[test]
    fn test_graft_rebases_stream_references() {
        let inner = OpArena::new(vec![
            vec![OP_ADR | TYPE_STU, 0, 1, OP_RTS],
            vec![OP_ADR | TYPE_BOO, 0, OP_RTS],
        ]);
        let mut outer = OpArena::from_root(vec![OP_RTS]);
        outer.push(vec![OP_ADR | TYPE_1BY, 0, OP_RTS]);

        let root = outer.graft(&inner).expect("graft");
        assert_eq!(root, 2);
        assert_eq!(outer.len(), 4);
        assert_eq!(outer.stream(2), Some(&[OP_ADR | TYPE_STU, 0, 3, OP_RTS][..]));
        assert_eq!(outer.stream(3), Some(&[OP_ADR | TYPE_BOO, 0, OP_RTS][..]));
    }

    #[test]
    fn test_graft_rejects_reference_overflow() {
        let inner = OpArena::from_root(vec![OP_ADR | TYPE_STU, 0, u32::MAX, OP_RTS]);
        let mut outer = OpArena::from_root(vec![OP_RTS]);
        assert_eq!(
            outer.graft(&inner),
            Err(ConfigError::StreamOutOfRange {
                stream: 0,
                pc: 0,
                target: u32::MAX,
            })
        );
        assert_eq!(outer.len(), 1);
    }

    #[test]
    fn test_prim_kind_code_roundtrip() {
        for kind in [
            PrimKind::U8,
            PrimKind::I8,
            PrimKind::U16,
            PrimKind::I16,
            PrimKind::U32,
            PrimKind::I32,
            PrimKind::U64,
            PrimKind::I64,
            PrimKind::F32,
            PrimKind::F64,
        ] {
            assert_eq!(PrimKind::from_code(kind.code(), kind.flags()), Some(kind));
        }
        assert_eq!(PrimKind::from_code(VAL_1BY, FLAG_FP), None);
    }
}
