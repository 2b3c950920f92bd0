// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CDR byte-level helpers: cursors and the serialized payload header.

pub mod cursor;

pub use cursor::{CdrReader, CdrWriter, Shortfall, SizeCounter, Sink};

use crate::config::ENCAPSULATION_HEADER_SIZE;

/// Append the 4-byte encapsulation header for `kind`.
///
/// The identifier is big-endian; the two option bytes are zero.
pub fn write_header(out: &mut Vec<u8>, kind: u16) {
    out.extend_from_slice(&kind.to_be_bytes());
    out.extend_from_slice(&[0, 0]);
}

/// Split a payload into its encapsulation identifier and body.
pub fn split_header(payload: &[u8]) -> Result<(u16, &[u8]), Shortfall> {
    if payload.len() < ENCAPSULATION_HEADER_SIZE {
        return Err(Shortfall {
            offset: 0,
            needed: ENCAPSULATION_HEADER_SIZE,
            available: payload.len(),
        });
    }
    let kind = u16::from_be_bytes([payload[0], payload[1]]);
    Ok((kind, &payload[ENCAPSULATION_HEADER_SIZE..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CDR2_LE, CDR_LE};

    #[test]
    fn test_header_layout() {
        let mut out = Vec::new();
        write_header(&mut out, CDR_LE);
        assert_eq!(out, vec![0x00, 0x01, 0x00, 0x00]);

        out.push(42);
        assert_eq!(split_header(&out), Ok((CDR_LE, &[42u8][..])));
    }

    #[test]
    fn test_split_header_short_input() {
        assert_eq!(
            split_header(&[0x00, 0x07]),
            Err(Shortfall {
                offset: 0,
                needed: 4,
                available: 2
            })
        );
        let mut out = Vec::new();
        write_header(&mut out, CDR2_LE);
        assert_eq!(split_header(&out), Ok((CDR2_LE, &[][..])));
    }
}
