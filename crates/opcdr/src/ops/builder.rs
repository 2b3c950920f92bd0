// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stream assembly.

use super::{
    Leaf, Shape, FLAG_KEY, OP_ADR, OP_RTS, VAL_ARR, VAL_BOO, VAL_BST, VAL_SEQ, VAL_STR, VAL_STU,
};

/// Encode one field-access instruction.
pub fn encode_instruction(field: u32, shape: &Shape, key: bool) -> Vec<u32> {
    let key_bit = if key { FLAG_KEY } else { 0 };
    let mut words = Vec::with_capacity(4);

    let leaf = match shape {
        Shape::Single(leaf) => {
            let code = match leaf {
                Leaf::Prim(kind) => kind.code(),
                Leaf::Bool => VAL_BOO,
                Leaf::String { bound: None } => VAL_STR,
                Leaf::String { bound: Some(_) } => VAL_BST,
                Leaf::Struct(_) => VAL_STU,
            };
            words.push(OP_ADR | (code << 16) | leaf.attr_flags() | key_bit);
            words.push(field);
            leaf
        }
        Shape::Sequence(leaf) => {
            words.push(
                OP_ADR | (VAL_SEQ << 16) | (leaf.sub_code() << 8) | leaf.attr_flags() | key_bit,
            );
            words.push(field);
            leaf
        }
        Shape::Array { leaf, count } => {
            words.push(
                OP_ADR | (VAL_ARR << 16) | (leaf.sub_code() << 8) | leaf.attr_flags() | key_bit,
            );
            words.push(field);
            words.push(*count);
            leaf
        }
    };

    match leaf {
        Leaf::String { bound: Some(bound) } => words.push(*bound),
        Leaf::Struct(stream) => words.push(*stream),
        Leaf::Prim(_) | Leaf::Bool | Leaf::String { bound: None } => {}
    }
    words
}

/// Incremental builder for one instruction stream.
///
/// ```
/// use opcdr::ops::{Leaf, OpsBuilder, PrimKind, Shape, OP_RTS};
///
/// let mut ops = OpsBuilder::new();
/// let key_pc = ops.field(0, &Shape::Single(Leaf::Prim(PrimKind::I32)), true);
/// ops.field(1, &Shape::Single(Leaf::String { bound: None }), false);
/// let words = ops.finish();
/// assert_eq!(key_pc, 0);
/// assert_eq!(words.len(), 5);
/// assert_eq!(words[4], OP_RTS);
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpsBuilder {
    words: Vec<u32>,
}

impl OpsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field instruction; returns its word position.
    pub fn field(&mut self, field: u32, shape: &Shape, key: bool) -> u32 {
        let pc = self.words.len() as u32;
        self.words.extend(encode_instruction(field, shape, key));
        pc
    }

    /// Word position the next instruction will get.
    pub fn pc(&self) -> u32 {
        self.words.len() as u32
    }

    /// Append the terminator and return the stream.
    pub fn finish(mut self) -> Vec<u32> {
        self.words.push(OP_RTS);
        self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{
        PrimKind, FLAG_FP, FLAG_SGN, SUBTYPE_2BY, SUBTYPE_STR, TYPE_2BY, TYPE_ARR, TYPE_BST,
        TYPE_SEQ, TYPE_STU,
    };

    #[test]
    fn test_encode_layouts() {
        assert_eq!(
            encode_instruction(0, &Shape::Single(Leaf::Prim(PrimKind::I16)), true),
            vec![OP_ADR | TYPE_2BY | FLAG_SGN | FLAG_KEY, 0]
        );
        assert_eq!(
            encode_instruction(3, &Shape::Single(Leaf::String { bound: Some(8) }), false),
            vec![OP_ADR | TYPE_BST, 3, 8]
        );
        assert_eq!(
            encode_instruction(1, &Shape::Single(Leaf::Struct(2)), false),
            vec![OP_ADR | TYPE_STU, 1, 2]
        );
        assert_eq!(
            encode_instruction(10, &Shape::Sequence(Leaf::String { bound: None }), false),
            vec![OP_ADR | TYPE_SEQ | SUBTYPE_STR, 10]
        );
        assert_eq!(
            encode_instruction(
                11,
                &Shape::Array {
                    leaf: Leaf::Prim(PrimKind::I16),
                    count: 25
                },
                false
            ),
            vec![OP_ADR | TYPE_ARR | SUBTYPE_2BY | FLAG_SGN, 11, 25]
        );
        let f64_array = encode_instruction(
            4,
            &Shape::Array {
                leaf: Leaf::Prim(PrimKind::F64),
                count: 2,
            },
            false,
        );
        assert_eq!(f64_array[0] & 0xff, FLAG_FP);
    }

    #[test]
    fn test_builder_tracks_word_positions() {
        let mut ops = OpsBuilder::new();
        assert_eq!(ops.field(0, &Shape::Single(Leaf::Bool), false), 0);
        assert_eq!(
            ops.field(
                1,
                &Shape::Array {
                    leaf: Leaf::Struct(1),
                    count: 4
                },
                false
            ),
            2
        );
        assert_eq!(ops.pc(), 6);
        let words = ops.finish();
        assert_eq!(words.last(), Some(&OP_RTS));
    }
}
