// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type metadata markup carried by every descriptor.
//!
//! The markup names what the instruction stream only numbers: modules, structs
//! and members, in declaration order. Format:
//!
//! ```text
//! <MetaData version="1.0.0">
//!   <Module name="TestData">
//!     <Struct name="Msg">
//!       <Member name="short_field"><Short/></Member>
//!       <Member name="array_field"><Array size="25"><Short/></Array></Member>
//!     </Struct>
//!   </Module>
//! </MetaData>
//! ```
//!
//! (rendered without whitespace). Within a module, structs come before
//! sub-modules, each in insertion order.

mod xml;

use thiserror::Error;

use crate::ops::{instructions, Leaf, OpArena, PrimKind, Shape, StreamId, ROOT_STREAM};

/// Markup version emitted and accepted.
pub const META_VERSION: &str = "1.0.0";

/// Metadata parse or consistency failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaError {
    #[error("malformed markup: {0}")]
    Xml(String),

    #[error("unsupported metadata version `{0}`")]
    UnsupportedVersion(String),

    #[error("unexpected element <{element}> in {context}")]
    UnexpectedElement {
        element: String,
        context: &'static str,
    },

    #[error("<{element}> is missing attribute `{attribute}`")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("<{element}> has invalid {attribute}=\"{value}\"")]
    InvalidAttribute {
        element: String,
        attribute: &'static str,
        value: String,
    },

    #[error("struct `{name}` is not described")]
    StructNotFound { name: String },

    #[error("type reference `{name}` does not resolve from `{scope}`")]
    UnresolvedType { name: String, scope: String },

    #[error("{path}: {reason}")]
    Mismatch { path: String, reason: String },
}

/// Split a `::` or `.` scoped name into its components.
pub fn scoped_parts(name: &str) -> Vec<&str> {
    name.split("::")
        .flat_map(|part| part.split('.'))
        .filter(|part| !part.is_empty())
        .collect()
}

/// Canonical `::` spelling of a scoped name.
pub fn canonical_name(name: &str) -> String {
    scoped_parts(name).join("::")
}

// =======================================================================
// Model
// =======================================================================

/// Type of one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaType {
    Prim(PrimKind),
    Boolean,
    /// `length` is the maximum character count of a bounded string.
    String { length: Option<u32> },
    Sequence(Box<MetaType>),
    Array { size: u32, elem: Box<MetaType> },
    /// Reference to a struct, relative to the enclosing module.
    Type { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub ty: MetaType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct {
    pub name: String,
    pub members: Vec<Member>,
}

impl Struct {
    pub fn member(&self, name: &str) -> Option<(usize, &Member)> {
        self.members.iter().enumerate().find(|(_, m)| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Module {
    pub name: String,
    pub structs: Vec<Struct>,
    pub modules: Vec<Module>,
}

impl Module {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    fn module_entry(&mut self, name: &str) -> &mut Module {
        let pos = match self.modules.iter().position(|m| m.name == name) {
            Some(pos) => pos,
            None => {
                self.modules.push(Module::named(name));
                self.modules.len() - 1
            }
        };
        &mut self.modules[pos]
    }

    fn merge(&mut self, other: &Module) {
        for def in &other.structs {
            if !self.structs.iter().any(|s| s.name == def.name) {
                self.structs.push(def.clone());
            }
        }
        for sub in &other.modules {
            self.module_entry(&sub.name).merge(sub);
        }
    }
}

/// Parsed metadata document.
///
/// The root module is unnamed; its structs are global.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetaData {
    pub root: Module,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse markup.
    pub fn parse(text: &str) -> Result<Self, MetaError> {
        xml::parse(text)
    }

    /// Render markup, byte-compatible with the producer.
    pub fn render(&self) -> String {
        xml::render(self)
    }

    pub fn is_empty(&self) -> bool {
        self.root.structs.is_empty() && self.root.modules.is_empty()
    }

    /// Module at `path`, created (with its parents) if missing.
    pub fn module_mut(&mut self, path: &[&str]) -> &mut Module {
        let mut module = &mut self.root;
        for name in path {
            module = module.module_entry(name);
        }
        module
    }

    /// Add a struct to the module at `path` unless one with the same name exists.
    ///
    /// Returns false when the name was already taken.
    pub fn insert_struct(&mut self, path: &[&str], def: Struct) -> bool {
        let module = self.module_mut(path);
        if module.structs.iter().any(|s| s.name == def.name) {
            return false;
        }
        module.structs.push(def);
        true
    }

    /// Fold `other` into `self`. Structs already present keep their definition.
    pub fn merge(&mut self, other: &MetaData) {
        self.root.merge(&other.root);
    }

    /// Find a struct by fully-qualified name (`::` or `.` separated).
    pub fn find_struct(&self, name: &str) -> Option<(Vec<String>, &Struct)> {
        let parts = scoped_parts(name);
        let (last, path) = parts.split_last()?;
        let mut module = &self.root;
        for part in path {
            module = module.module(part)?;
        }
        let def = module.structs.iter().find(|s| s.name == *last)?;
        Some((path.iter().map(|p| (*p).to_owned()).collect(), def))
    }

    /// Resolve a type reference made from within module `scope`.
    ///
    /// Follows IDL scoping: the innermost enclosing module is searched first,
    /// then each outer one. A leading `::` anchors at the root.
    pub fn resolve(&self, scope: &[String], name: &str) -> Option<(Vec<String>, &Struct)> {
        let parts = scoped_parts(name);
        if name.starts_with("::") {
            return self.find_struct(&parts.join("::"));
        }
        for depth in (0..=scope.len()).rev() {
            let mut candidate: Vec<&str> = scope[..depth].iter().map(String::as_str).collect();
            candidate.extend(parts.iter().copied());
            if let Some(found) = self.find_struct(&candidate.join("::")) {
                return Some(found);
            }
        }
        None
    }

    /// Verify that `ops` and the description of `type_name` agree: same member
    /// count and order, same types, same nesting.
    pub fn check_consistency(&self, type_name: &str, ops: &OpArena) -> Result<(), MetaError> {
        let (scope, def) = self
            .find_struct(type_name)
            .ok_or_else(|| MetaError::StructNotFound {
                name: canonical_name(type_name),
            })?;
        let mut path = canonical_name(type_name);
        let mut active = Vec::new();
        check_struct(self, ops, ROOT_STREAM, &scope, def, &mut path, &mut active)
    }
}

fn mismatch(path: &str, reason: impl Into<String>) -> MetaError {
    MetaError::Mismatch {
        path: path.to_owned(),
        reason: reason.into(),
    }
}

fn check_struct(
    meta: &MetaData,
    ops: &OpArena,
    stream: StreamId,
    scope: &[String],
    def: &Struct,
    path: &mut String,
    active: &mut Vec<StreamId>,
) -> Result<(), MetaError> {
    // A stream reachable through a sequence may recurse; checking it once suffices.
    if active.contains(&stream) {
        return Ok(());
    }
    let words = ops
        .stream(stream)
        .ok_or_else(|| mismatch(path, format!("stream {} does not exist", stream)))?;
    active.push(stream);

    let mut seen = 0usize;
    for insn in instructions(stream, words) {
        let insn = insn.map_err(|err| mismatch(path, err.to_string()))?;
        let member = def.members.get(seen).ok_or_else(|| {
            mismatch(
                path,
                format!("stream has more fields than the {} described", def.members.len()),
            )
        })?;
        let mark = path.len();
        path.push('.');
        path.push_str(&member.name);

        if insn.field as usize != seen {
            return Err(mismatch(
                path,
                format!("instruction addresses field {}, member is #{}", insn.field, seen),
            ));
        }
        check_shape(meta, ops, &insn.shape, &member.ty, scope, path, active)?;

        path.truncate(mark);
        seen += 1;
    }
    if seen != def.members.len() {
        return Err(mismatch(
            path,
            format!("{} members described, stream has {}", def.members.len(), seen),
        ));
    }
    active.pop();
    Ok(())
}

fn check_shape(
    meta: &MetaData,
    ops: &OpArena,
    shape: &Shape,
    ty: &MetaType,
    scope: &[String],
    path: &mut String,
    active: &mut Vec<StreamId>,
) -> Result<(), MetaError> {
    match (shape, ty) {
        (Shape::Single(leaf), ty) => check_leaf(meta, ops, leaf, ty, scope, path, active),
        (Shape::Sequence(leaf), MetaType::Sequence(elem)) => {
            check_leaf(meta, ops, leaf, elem, scope, path, active)
        }
        (Shape::Array { leaf, count }, MetaType::Array { .. }) => {
            let mut total: u64 = 1;
            let mut inner = ty;
            while let MetaType::Array { size, elem } = inner {
                total = total.checked_mul(u64::from(*size)).ok_or_else(|| {
                    mismatch(path.as_str(), "array dimensions overflow the element count".to_owned())
                })?;
                inner = elem;
            }
            if total != u64::from(*count) {
                return Err(mismatch(
                    path,
                    format!("array holds {} elements, stream declares {}", total, count),
                ));
            }
            check_leaf(meta, ops, leaf, inner, scope, path, active)
        }
        (shape, ty) => Err(mismatch(
            path,
            format!("stream has {}, markup has {}", shape, describe(ty)),
        )),
    }
}

fn check_leaf(
    meta: &MetaData,
    ops: &OpArena,
    leaf: &Leaf,
    ty: &MetaType,
    scope: &[String],
    path: &mut String,
    active: &mut Vec<StreamId>,
) -> Result<(), MetaError> {
    match (leaf, ty) {
        (Leaf::Prim(a), MetaType::Prim(b)) if a == b => Ok(()),
        (Leaf::Bool, MetaType::Boolean) => Ok(()),
        (Leaf::String { bound }, MetaType::String { length }) if bound == length => Ok(()),
        (Leaf::Struct(stream), MetaType::Type { name }) => {
            let (inner_scope, def) =
                meta.resolve(scope, name)
                    .ok_or_else(|| MetaError::UnresolvedType {
                        name: name.clone(),
                        scope: scope.join("::"),
                    })?;
            check_struct(meta, ops, *stream, &inner_scope, def, path, active)
        }
        (leaf, ty) => Err(mismatch(
            path,
            format!("stream has {}, markup has {}", leaf, describe(ty)),
        )),
    }
}

fn describe(ty: &MetaType) -> String {
    match ty {
        MetaType::Prim(kind) => kind.name().to_owned(),
        MetaType::Boolean => "bool".to_owned(),
        MetaType::String { length: None } => "string".to_owned(),
        MetaType::String { length: Some(n) } => format!("string<{}>", n),
        MetaType::Sequence(elem) => format!("sequence<{}>", describe(elem)),
        MetaType::Array { size, elem } => format!("{}[{}]", describe(elem), size),
        MetaType::Type { name } => format!("struct {}", name),
    }
}
