// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Indexed field access into host structures.
//!
//! The interpreter never computes addresses. An instruction names a field by its
//! index within the enclosing structure, and the structure hands out a typed view
//! of that field through [`Reflect`]. A view that does not match what the
//! instruction expects is a layout mismatch, reported as an error.
//!
//! `#[derive(Topic)]` implements these traits for plain structs; [`DynamicSample`]
//! implements them for schema-less values built from a descriptor.

mod dynamic;

pub use dynamic::{DynSequence, DynValue, DynamicSample};

use std::sync::Arc;

use crate::descriptor::TopicDescriptor;
use crate::error::ConfigError;
pub use crate::ops::PrimKind;

/// A scalar value read out of an instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Primitive {
    /// Zero value of a numeric kind.
    pub const fn zero(kind: PrimKind) -> Self {
        match kind {
            PrimKind::U8 => Self::U8(0),
            PrimKind::I8 => Self::I8(0),
            PrimKind::U16 => Self::U16(0),
            PrimKind::I16 => Self::I16(0),
            PrimKind::U32 => Self::U32(0),
            PrimKind::I32 => Self::I32(0),
            PrimKind::U64 => Self::U64(0),
            PrimKind::I64 => Self::I64(0),
            PrimKind::F32 => Self::F32(0.0),
            PrimKind::F64 => Self::F64(0.0),
        }
    }

    /// Numeric kind; `None` for booleans.
    pub const fn kind(&self) -> Option<PrimKind> {
        match self {
            Self::Bool(_) => None,
            Self::U8(_) => Some(PrimKind::U8),
            Self::I8(_) => Some(PrimKind::I8),
            Self::U16(_) => Some(PrimKind::U16),
            Self::I16(_) => Some(PrimKind::I16),
            Self::U32(_) => Some(PrimKind::U32),
            Self::I32(_) => Some(PrimKind::I32),
            Self::U64(_) => Some(PrimKind::U64),
            Self::I64(_) => Some(PrimKind::I64),
            Self::F32(_) => Some(PrimKind::F32),
            Self::F64(_) => Some(PrimKind::F64),
        }
    }

    pub const fn name(&self) -> &'static str {
        match self.kind() {
            Some(kind) => kind.name(),
            None => "bool",
        }
    }

    /// Writable view of the value.
    pub fn as_mut(&mut self) -> PrimMut<'_> {
        match self {
            Self::Bool(v) => PrimMut::Bool(v),
            Self::U8(v) => PrimMut::U8(v),
            Self::I8(v) => PrimMut::I8(v),
            Self::U16(v) => PrimMut::U16(v),
            Self::I16(v) => PrimMut::I16(v),
            Self::U32(v) => PrimMut::U32(v),
            Self::I32(v) => PrimMut::I32(v),
            Self::U64(v) => PrimMut::U64(v),
            Self::I64(v) => PrimMut::I64(v),
            Self::F32(v) => PrimMut::F32(v),
            Self::F64(v) => PrimMut::F64(v),
        }
    }
}

/// A writable scalar slot inside an instance.
#[derive(Debug)]
pub enum PrimMut<'a> {
    Bool(&'a mut bool),
    U8(&'a mut u8),
    I8(&'a mut i8),
    U16(&'a mut u16),
    I16(&'a mut i16),
    U32(&'a mut u32),
    I32(&'a mut i32),
    U64(&'a mut u64),
    I64(&'a mut i64),
    F32(&'a mut f32),
    F64(&'a mut f64),
}

impl PrimMut<'_> {
    pub fn name(&self) -> &'static str {
        self.get().name()
    }

    pub fn get(&self) -> Primitive {
        match self {
            Self::Bool(v) => Primitive::Bool(**v),
            Self::U8(v) => Primitive::U8(**v),
            Self::I8(v) => Primitive::I8(**v),
            Self::U16(v) => Primitive::U16(**v),
            Self::I16(v) => Primitive::I16(**v),
            Self::U32(v) => Primitive::U32(**v),
            Self::I32(v) => Primitive::I32(**v),
            Self::U64(v) => Primitive::U64(**v),
            Self::I64(v) => Primitive::I64(**v),
            Self::F32(v) => Primitive::F32(**v),
            Self::F64(v) => Primitive::F64(**v),
        }
    }

    /// Store `value` if its kind matches the slot. Returns false otherwise.
    pub fn set(self, value: Primitive) -> bool {
        match (self, value) {
            (Self::Bool(slot), Primitive::Bool(v)) => *slot = v,
            (Self::U8(slot), Primitive::U8(v)) => *slot = v,
            (Self::I8(slot), Primitive::I8(v)) => *slot = v,
            (Self::U16(slot), Primitive::U16(v)) => *slot = v,
            (Self::I16(slot), Primitive::I16(v)) => *slot = v,
            (Self::U32(slot), Primitive::U32(v)) => *slot = v,
            (Self::I32(slot), Primitive::I32(v)) => *slot = v,
            (Self::U64(slot), Primitive::U64(v)) => *slot = v,
            (Self::I64(slot), Primitive::I64(v)) => *slot = v,
            (Self::F32(slot), Primitive::F32(v)) => *slot = v,
            (Self::F64(slot), Primitive::F64(v)) => *slot = v,
            _ => return false,
        }
        true
    }
}

/// Read-only view of one field.
pub enum FieldRef<'a> {
    Prim(Primitive),
    Str(&'a str),
    Struct(&'a dyn Reflect),
    /// Fixed array; elements may themselves be arrays.
    Array(&'a dyn Elements),
    Sequence(&'a dyn Elements),
}

impl FieldRef<'_> {
    /// What the field is, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Prim(p) => p.name(),
            Self::Str(_) => "string",
            Self::Struct(_) => "struct",
            Self::Array(_) => "array",
            Self::Sequence(_) => "sequence",
        }
    }
}

/// Writable view of one field.
pub enum FieldMut<'a> {
    Prim(PrimMut<'a>),
    Str(&'a mut String),
    Struct(&'a mut dyn Reflect),
    Array(&'a mut dyn ElementsMut),
    Sequence(&'a mut dyn SequenceMut),
}

impl FieldMut<'_> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Prim(p) => p.name(),
            Self::Str(_) => "string",
            Self::Struct(_) => "struct",
            Self::Array(_) => "array",
            Self::Sequence(_) => "sequence",
        }
    }
}

/// A structure whose fields are addressable by index.
pub trait Reflect {
    fn field(&self, index: u32) -> Option<FieldRef<'_>>;
    fn field_mut(&mut self, index: u32) -> Option<FieldMut<'_>>;
}

/// A value usable as a structure field or a collection element.
pub trait Element {
    fn as_field(&self) -> FieldRef<'_>;
    fn as_field_mut(&mut self) -> FieldMut<'_>;
}

/// Read access to the elements of an array or sequence.
pub trait Elements {
    fn len(&self) -> usize;
    fn element(&self, index: usize) -> Option<FieldRef<'_>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write access to the elements of an array or sequence.
pub trait ElementsMut: Elements {
    fn element_mut(&mut self, index: usize) -> Option<FieldMut<'_>>;
}

/// A growable collection. `resize` is the only allocation the engine requests.
pub trait SequenceMut: ElementsMut {
    fn resize(&mut self, len: usize) -> Result<(), ConfigError>;
}

/// A derived topic type.
pub trait Topic: Reflect + Default {
    /// Descriptor built from the type declaration.
    fn descriptor() -> &'static TopicDescriptor;
}

// =======================================================================
// Static member description
// =======================================================================

/// How a Rust type appears as a descriptor member.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberType {
    Prim(PrimKind),
    Bool,
    String { bound: Option<u32> },
    Struct(Arc<TopicDescriptor>),
    Sequence(Box<MemberType>),
    /// Outermost dimension first.
    Array { dims: Vec<u32>, elem: Box<MemberType> },
}

impl MemberType {
    /// Bound every string reachable through collections to `bound` characters.
    pub fn with_string_bound(self, bound: u32) -> Self {
        match self {
            Self::String { .. } => Self::String { bound: Some(bound) },
            Self::Sequence(elem) => Self::Sequence(Box::new(elem.with_string_bound(bound))),
            Self::Array { dims, elem } => Self::Array {
                dims,
                elem: Box::new(elem.with_string_bound(bound)),
            },
            other => other,
        }
    }
}

/// Static description of a Rust type as a member.
pub trait WireType {
    fn member_type() -> MemberType;
}

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident, $member:expr;)*) => {$(
        impl Element for $ty {
            fn as_field(&self) -> FieldRef<'_> {
                FieldRef::Prim(Primitive::$variant(*self))
            }

            fn as_field_mut(&mut self) -> FieldMut<'_> {
                FieldMut::Prim(PrimMut::$variant(self))
            }
        }

        impl WireType for $ty {
            fn member_type() -> MemberType {
                $member
            }
        }
    )*};
}

impl_scalar! {
    bool => Bool, MemberType::Bool;
    u8 => U8, MemberType::Prim(PrimKind::U8);
    i8 => I8, MemberType::Prim(PrimKind::I8);
    u16 => U16, MemberType::Prim(PrimKind::U16);
    i16 => I16, MemberType::Prim(PrimKind::I16);
    u32 => U32, MemberType::Prim(PrimKind::U32);
    i32 => I32, MemberType::Prim(PrimKind::I32);
    u64 => U64, MemberType::Prim(PrimKind::U64);
    i64 => I64, MemberType::Prim(PrimKind::I64);
    f32 => F32, MemberType::Prim(PrimKind::F32);
    f64 => F64, MemberType::Prim(PrimKind::F64);
}

impl Element for String {
    fn as_field(&self) -> FieldRef<'_> {
        FieldRef::Str(self)
    }

    fn as_field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Str(self)
    }
}

impl WireType for String {
    fn member_type() -> MemberType {
        MemberType::String { bound: None }
    }
}

impl<T: Element, const N: usize> Elements for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn element(&self, index: usize) -> Option<FieldRef<'_>> {
        self.get(index).map(Element::as_field)
    }
}

impl<T: Element, const N: usize> ElementsMut for [T; N] {
    fn element_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
        self.get_mut(index).map(Element::as_field_mut)
    }
}

impl<T: Element, const N: usize> Element for [T; N] {
    fn as_field(&self) -> FieldRef<'_> {
        FieldRef::Array(self)
    }

    fn as_field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Array(self)
    }
}

impl<T: WireType, const N: usize> WireType for [T; N] {
    fn member_type() -> MemberType {
        match T::member_type() {
            MemberType::Array { mut dims, elem } => {
                dims.insert(0, N as u32);
                MemberType::Array { dims, elem }
            }
            elem => MemberType::Array {
                dims: vec![N as u32],
                elem: Box::new(elem),
            },
        }
    }
}

impl<T: Element> Elements for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn element(&self, index: usize) -> Option<FieldRef<'_>> {
        self.get(index).map(Element::as_field)
    }
}

impl<T: Element> ElementsMut for Vec<T> {
    fn element_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
        self.get_mut(index).map(Element::as_field_mut)
    }
}

impl<T: Element + Default> SequenceMut for Vec<T> {
    fn resize(&mut self, len: usize) -> Result<(), ConfigError> {
        self.resize_with(len, T::default);
        Ok(())
    }
}

impl<T: Element + Default> Element for Vec<T> {
    fn as_field(&self) -> FieldRef<'_> {
        FieldRef::Sequence(self)
    }

    fn as_field_mut(&mut self) -> FieldMut<'_> {
        FieldMut::Sequence(self)
    }
}

impl<T: WireType> WireType for Vec<T> {
    fn member_type() -> MemberType {
        MemberType::Sequence(Box::new(T::member_type()))
    }
}
