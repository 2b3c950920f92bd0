// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for descriptor defects and wire-format failures.
//!
//! [`ConfigError`] describes a producer-side defect (malformed stream, bad key
//! table, stream/instance layout mismatch). It is fatal for the operation and is
//! never worth retrying with the same descriptor. [`MarshalError`] wraps it and
//! adds the per-call wire failures, which are recoverable.

use std::fmt;
use thiserror::Error;

use crate::meta::MetaError;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Field index within the enclosing structure.
    Field(u32),
    /// Element index within a sequence or (flattened) array.
    Index(usize),
}

/// Location of a field inside an instance, from the root structure down.
///
/// Rendered as `.3.0[17]`: field 3, its field 0, element 17.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPath(Vec<PathStep>);

impl FieldPath {
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self(steps)
    }

    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for step in &self.0 {
            match step {
                PathStep::Field(idx) => write!(f, ".{}", idx)?,
                PathStep::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Descriptor or instruction stream defect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("descriptor has no instruction stream")]
    EmptyArena,

    #[error("stream {stream} pc {pc}: unknown opcode word {word:#010x}")]
    UnknownOpcode { stream: u32, pc: usize, word: u32 },

    #[error("stream {stream} pc {pc}: unknown type code {code:#04x}")]
    UnknownType { stream: u32, pc: usize, code: u32 },

    #[error("stream {stream} pc {pc}: unsupported collection subtype {code:#04x}")]
    UnsupportedSubtype { stream: u32, pc: usize, code: u32 },

    #[error("stream {stream} pc {pc}: invalid flags ({reason})")]
    InvalidFlags {
        stream: u32,
        pc: usize,
        reason: &'static str,
    },

    #[error("stream {stream} pc {pc}: instruction runs past end of stream")]
    TruncatedInstruction { stream: u32, pc: usize },

    #[error("stream {stream}: missing terminator")]
    MissingTerminator { stream: u32 },

    #[error("stream {stream}: instructions after terminator at pc {pc}")]
    TrailingInstructions { stream: u32, pc: usize },

    #[error("stream {stream} pc {pc}: sub-stream {target} out of range")]
    StreamOutOfRange { stream: u32, pc: usize, target: u32 },

    #[error("stream {stream} contains itself without an intervening sequence")]
    RecursiveStream { stream: u32 },

    #[error("stream {stream} pc {pc}: array of {count} elements exceeds the limit of {limit} values")]
    ArrayTooLarge {
        stream: u32,
        pc: usize,
        count: u32,
        limit: usize,
    },

    #[error("key_count is {declared} but {actual} keys are listed")]
    KeyCountMismatch { declared: u32, actual: usize },

    #[error("key `{name}` index {index} is not an instruction of the root stream")]
    KeyOutOfRange { name: String, index: u32 },

    #[error("key `{name}` index {index} references an instruction without the key flag")]
    KeyNotFlagged { name: String, index: u32 },

    #[error("key `{name}` index {index} references a sequence")]
    KeyOnSequence { name: String, index: u32 },

    #[error("key `{name}` listed twice")]
    DuplicateKey { name: String },

    #[error("descriptor is marked optimizable but has variable-size members")]
    NotFixedSize,

    #[error("descriptor is marked FIXED_KEY but its key is unbounded or over 16 bytes")]
    KeyNotFixed,

    #[error("field {field}: stream expects {expected}, instance provides {found}")]
    LayoutMismatch {
        field: FieldPath,
        expected: String,
        found: &'static str,
    },

    #[error("field {field}: instance has no such field")]
    MissingField { field: FieldPath },

    #[error("field {field}: array declares {declared} elements, instance holds {found}")]
    ArrayCountMismatch {
        field: FieldPath,
        declared: u32,
        found: usize,
    },

    #[error("member `{name}` is not declared")]
    UnknownMember { name: String },

    #[error("member `{name}` declared twice")]
    DuplicateMember { name: String },

    #[error("type `{name}` is already registered")]
    DuplicateType { name: String },

    #[error("unsupported member type: {reason}")]
    UnsupportedMember { reason: &'static str },

    #[error("metadata: {0}")]
    Metadata(#[from] MetaError),

    #[error("no encapsulation identifier for max_align {max_align}")]
    NoEncapsulation { max_align: usize },
}

/// Marshalling failure.
///
/// Only [`MarshalError::Configuration`] is fatal; the wire variants leave the
/// engine untouched and the call may be retried with corrected input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    #[error("configuration error in `{type_name}`: {source}")]
    Configuration {
        type_name: String,
        #[source]
        source: ConfigError,
    },

    #[error("truncated input at byte {offset} reading {field}: need {needed} bytes, {available} left")]
    TruncatedInput {
        field: FieldPath,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("malformed length {length} at byte {offset} for {field}: {reason}")]
    MalformedLength {
        field: FieldPath,
        offset: usize,
        length: u64,
        reason: &'static str,
    },

    #[error("invalid encoding at byte {offset} for {field}: {reason}")]
    InvalidEncoding {
        field: FieldPath,
        offset: usize,
        reason: String,
    },
}

impl MarshalError {
    pub fn config(type_name: impl Into<String>, source: ConfigError) -> Self {
        Self::Configuration {
            type_name: type_name.into(),
            source,
        }
    }

    /// True for wire-format failures; false for descriptor defects.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Configuration { .. })
    }

    /// Field the failure is attributed to, if any.
    pub fn field(&self) -> Option<&FieldPath> {
        match self {
            Self::Configuration { .. } => None,
            Self::TruncatedInput { field, .. }
            | Self::MalformedLength { field, .. }
            | Self::InvalidEncoding { field, .. } => Some(field),
        }
    }
}

pub type Result<T> = std::result::Result<T, MarshalError>;
