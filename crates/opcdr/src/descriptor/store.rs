// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Name-indexed registry of validated descriptors.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::TopicDescriptor;
use crate::error::ConfigError;
use crate::meta::canonical_name;

#[inline]
fn recover_write<'a, T>(lock: &'a RwLock<T>, context: &str) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::debug!("[store] WARNING: {} poisoned, recovering", context);
            poisoned.into_inner()
        }
    }
}

#[inline]
fn recover_read<'a, T>(lock: &'a RwLock<T>, context: &str) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::debug!("[store] WARNING: {} poisoned, recovering", context);
            poisoned.into_inner()
        }
    }
}

/// Validated descriptors by fully-qualified name.
///
/// `a.b.C` and `a::b::C` name the same entry. Registration validates; lookup
/// never does. Readers never block each other.
#[derive(Default)]
pub struct DescriptorStore {
    types: RwLock<HashMap<String, Arc<TopicDescriptor>>>,
}

impl DescriptorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `descriptor` and add it under its canonical name.
    pub fn register(&self, descriptor: TopicDescriptor) -> Result<Arc<TopicDescriptor>, ConfigError> {
        let name = descriptor.canonical_name();
        if let Err(err) = descriptor.validate() {
            log::warn!("[store] rejected type='{}': {}", name, err);
            return Err(err);
        }

        let mut types = recover_write(&self.types, "DescriptorStore::types.write()");
        if types.contains_key(&name) {
            log::warn!("[store] rejected type='{}': already registered", name);
            return Err(ConfigError::DuplicateType { name });
        }
        let descriptor = Arc::new(descriptor);
        types.insert(name.clone(), Arc::clone(&descriptor));
        log::debug!(
            "[store] registered type='{}' streams={} keys={}",
            name,
            descriptor.ops.len(),
            descriptor.key_count
        );
        Ok(descriptor)
    }

    pub fn get(&self, name: &str) -> Option<Arc<TopicDescriptor>> {
        recover_read(&self.types, "DescriptorStore::types.read()")
            .get(&canonical_name(name))
            .cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = recover_read(&self.types, "DescriptorStore::types.read()")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        recover_read(&self.types, "DescriptorStore::types.read()").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
