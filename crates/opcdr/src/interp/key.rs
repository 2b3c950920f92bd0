// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DDS key hash.
//!
//! The key fields are encoded as big-endian classic CDR. If the descriptor's key
//! can never exceed 16 bytes the hash is that encoding zero-padded to 16;
//! otherwise it is the MD5 digest of the encoding.

use md5::{Digest, Md5};

use super::Codec;
use crate::config::{WireConfig, KEY_HASH_SIZE};
use crate::descriptor::TopicDescriptor;
use crate::error::Result;
use crate::reflect::Reflect;

pub(super) fn key_hash(desc: &TopicDescriptor, instance: &dyn Reflect) -> Result<[u8; KEY_HASH_SIZE]> {
    let key = Codec::new(WireConfig::key_hash()).extract_key(desc, instance)?;
    let mut hash = [0u8; KEY_HASH_SIZE];
    match desc.max_key_size() {
        Some(max) if max <= KEY_HASH_SIZE && key.len() <= KEY_HASH_SIZE => {
            hash[..key.len()].copy_from_slice(&key);
        }
        _ => {
            let mut hasher = Md5::new();
            hasher.update(&key);
            hash.copy_from_slice(&hasher.finalize());
        }
    }
    Ok(hash)
}
