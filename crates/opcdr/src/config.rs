// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire format configuration - single source of truth for encoding constants.
//!
//! Every constant that shapes the bytes on the wire lives here. The interpreter
//! never hardcodes a prefix width, byte order or alignment cap; it reads them from
//! a [`WireConfig`].
//!
//! # Wire format
//!
//! | Item      | Encoding                                                   |
//! |-----------|------------------------------------------------------------|
//! | primitive | aligned to `min(width, max_align)` from body start         |
//! | bool      | one byte, `0` or `1`                                       |
//! | string    | `u32` length incl. NUL, bytes, NUL                         |
//! | sequence  | `u32` element count, then elements                         |
//! | array     | elements only, count is static                             |
//!
//! # Example
//!
//! ```
//! use opcdr::config::{ByteOrder, WireConfig};
//!
//! let wire = WireConfig::cdr_be();
//! assert_eq!(wire.byte_order, ByteOrder::Big);
//! assert_eq!(wire.max_align, 8);
//! ```

use serde::{Deserialize, Serialize};

// =======================================================================
// Encoding constants
// =======================================================================

/// Width of string and sequence length prefixes, in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Alignment cap of classic CDR (XCDR1): 8-byte primitives align to 8.
pub const DEFAULT_MAX_ALIGN: usize = 8;

/// Alignment cap of XCDR2: nothing aligns beyond 4.
pub const XCDR2_MAX_ALIGN: usize = 4;

/// Default upper bound on a decoded string length (NUL included).
pub const DEFAULT_MAX_STRING_LEN: u32 = 16 * 1024 * 1024;

/// Default upper bound on a decoded sequence element count.
pub const DEFAULT_MAX_SEQUENCE_LEN: u32 = 16 * 1024 * 1024;

/// Size of a DDS key hash.
pub const KEY_HASH_SIZE: usize = 16;

// =======================================================================
// Encapsulation identifiers (RTPS serialized payload header)
// =======================================================================

/// Size of the serialized payload header.
pub const ENCAPSULATION_HEADER_SIZE: usize = 4;

/// Classic CDR, big-endian.
pub const CDR_BE: u16 = 0x0000;

/// Classic CDR, little-endian.
pub const CDR_LE: u16 = 0x0001;

/// Plain XCDR2, big-endian.
pub const CDR2_BE: u16 = 0x0006;

/// Plain XCDR2, little-endian.
pub const CDR2_LE: u16 = 0x0007;

/// Byte order of multi-byte primitives and length prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Runtime wire configuration.
///
/// Loaded from YAML by tooling, or built from one of the presets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    pub byte_order: ByteOrder,
    /// Alignment cap in bytes: 1 disables padding, 4 is XCDR2, 8 is classic CDR.
    pub max_align: usize,
    /// Reject decoded strings whose length prefix exceeds this.
    pub max_string_len: u32,
    /// Reject decoded sequences whose element count exceeds this.
    pub max_sequence_len: u32,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self::cdr_le()
    }
}

impl WireConfig {
    /// Classic CDR, little-endian (the default).
    pub const fn cdr_le() -> Self {
        Self {
            byte_order: ByteOrder::Little,
            max_align: DEFAULT_MAX_ALIGN,
            max_string_len: DEFAULT_MAX_STRING_LEN,
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
        }
    }

    /// Classic CDR, big-endian.
    pub const fn cdr_be() -> Self {
        Self {
            byte_order: ByteOrder::Big,
            ..Self::cdr_le()
        }
    }

    /// Plain XCDR2, little-endian.
    pub const fn xcdr2_le() -> Self {
        Self {
            max_align: XCDR2_MAX_ALIGN,
            ..Self::cdr_le()
        }
    }

    /// Encoding used for key hashes: big-endian classic CDR.
    pub const fn key_hash() -> Self {
        Self::cdr_be()
    }

    /// Configuration matching an encapsulation identifier, if known.
    pub fn from_encapsulation(kind: u16) -> Option<Self> {
        match kind {
            CDR_BE => Some(Self::cdr_be()),
            CDR_LE => Some(Self::cdr_le()),
            CDR2_BE => Some(Self {
                byte_order: ByteOrder::Big,
                ..Self::xcdr2_le()
            }),
            CDR2_LE => Some(Self::xcdr2_le()),
            _ => None,
        }
    }

    /// Encapsulation identifier describing this configuration.
    ///
    /// Only alignment caps of 4 and 8 have an identifier.
    pub fn encapsulation(&self) -> Option<u16> {
        match (self.max_align, self.byte_order) {
            (DEFAULT_MAX_ALIGN, ByteOrder::Big) => Some(CDR_BE),
            (DEFAULT_MAX_ALIGN, ByteOrder::Little) => Some(CDR_LE),
            (XCDR2_MAX_ALIGN, ByteOrder::Big) => Some(CDR2_BE),
            (XCDR2_MAX_ALIGN, ByteOrder::Little) => Some(CDR2_LE),
            _ => None,
        }
    }

    /// Effective alignment of a primitive of `width` bytes.
    #[inline]
    pub fn align_for(&self, width: usize) -> usize {
        width.min(self.max_align).max(1)
    }
}
