// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Human-readable listing of an [`OpArena`].

use std::fmt::{self, Write as _};

use super::{instructions, Instruction, Leaf, OpArena, Shape};

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaf::Prim(kind) => f.write_str(kind.name()),
            Leaf::Bool => f.write_str("bool"),
            Leaf::String { bound: None } => f.write_str("string"),
            Leaf::String { bound: Some(bound) } => write!(f, "string<{}>", bound),
            Leaf::Struct(stream) => write!(f, "struct@{}", stream),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Single(leaf) => write!(f, "{}", leaf),
            Shape::Sequence(leaf) => write!(f, "sequence<{}>", leaf),
            Shape::Array { leaf, count } => write!(f, "{}[{}]", leaf, count),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADR field {} {}", self.field, self.shape)?;
        if self.key {
            f.write_str(" key")?;
        }
        Ok(())
    }
}

/// Render every stream of `arena`, one instruction per line.
///
/// Undecodable words are listed as such and end their stream's listing.
pub fn disassemble(arena: &OpArena) -> String {
    let mut out = String::new();
    for (id, words) in arena.streams() {
        let _ = writeln!(out, "stream {}:", id);
        let mut end = 0;
        for insn in instructions(id, words) {
            match insn {
                Ok(insn) => {
                    let _ = writeln!(out, "  {:04}  {}", insn.pc, insn);
                    end = insn.pc + insn.len;
                }
                Err(err) => {
                    let _ = writeln!(out, "  ????  {}", err);
                    end = usize::MAX;
                    break;
                }
            }
        }
        if end != usize::MAX {
            let _ = writeln!(out, "  {:04}  RTS", end);
        }
    }
    out
}
