// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Aligned, byte-order aware CDR cursors.
//!
//! Alignment is relative to the cursor's start, which is the start of the body
//! (after any encapsulation header).

use crate::config::{ByteOrder, WireConfig};
use crate::reflect::{PrimKind, Primitive};

/// Destination of encoded bytes.
pub trait Sink {
    fn len(&self) -> usize;
    fn put(&mut self, bytes: &[u8]);
    fn put_zeros(&mut self, count: usize);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Sink for Vec<u8> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    fn put_zeros(&mut self, count: usize) {
        self.resize(Vec::len(self) + count, 0);
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn put(&mut self, bytes: &[u8]) {
        (**self).put(bytes);
    }

    fn put_zeros(&mut self, count: usize) {
        (**self).put_zeros(count);
    }
}

/// Sink that only counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeCounter(usize);

impl Sink for SizeCounter {
    fn len(&self) -> usize {
        self.0
    }

    fn put(&mut self, bytes: &[u8]) {
        self.0 += bytes.len();
    }

    fn put_zeros(&mut self, count: usize) {
        self.0 += count;
    }
}

/// Generate byte-order aware write methods for primitive types
macro_rules! impl_write {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.align(std::mem::size_of::<$type>());
            match self.order {
                ByteOrder::Little => self.sink.put(&value.to_le_bytes()),
                ByteOrder::Big => self.sink.put(&value.to_be_bytes()),
            }
        }
    };
}

/// Generate byte-order aware read methods for primitive types
macro_rules! impl_read {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self) -> Result<$type, Shortfall> {
            const SIZE: usize = std::mem::size_of::<$type>();
            self.align(SIZE)?;
            let raw = self.take(SIZE)?;
            let mut bytes = [0u8; SIZE];
            bytes.copy_from_slice(raw);
            Ok(match self.order {
                ByteOrder::Little => <$type>::from_le_bytes(bytes),
                ByteOrder::Big => <$type>::from_be_bytes(bytes),
            })
        }
    };
}

/// Encoding cursor over any [`Sink`].
pub struct CdrWriter<S> {
    sink: S,
    base: usize,
    order: ByteOrder,
    max_align: usize,
}

impl<S: Sink> CdrWriter<S> {
    /// Body starts at the sink's current length.
    pub fn new(sink: S, config: &WireConfig) -> Self {
        Self {
            base: sink.len(),
            sink,
            order: config.byte_order,
            max_align: config.max_align.max(1),
        }
    }

    /// Bytes written since the body start.
    pub fn position(&self) -> usize {
        self.sink.len() - self.base
    }

    /// Pad with zeros to `min(width, max_align)`.
    pub fn align(&mut self, width: usize) {
        let align = width.min(self.max_align).max(1);
        let rem = self.position() % align;
        if rem != 0 {
            self.sink.put_zeros(align - rem);
        }
    }

    impl_write!(write_u16, u16);
    impl_write!(write_u32, u32);
    impl_write!(write_u64, u64);
    impl_write!(write_i16, i16);
    impl_write!(write_i32, i32);
    impl_write!(write_i64, i64);
    impl_write!(write_f32, f32);
    impl_write!(write_f64, f64);

    pub fn write_u8(&mut self, value: u8) {
        self.sink.put(&[value]);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.sink.put(&value.to_ne_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.sink.put(bytes);
    }

    pub fn write_prim(&mut self, value: Primitive) {
        match value {
            Primitive::Bool(v) => self.write_u8(u8::from(v)),
            Primitive::U8(v) => self.write_u8(v),
            Primitive::I8(v) => self.write_i8(v),
            Primitive::U16(v) => self.write_u16(v),
            Primitive::I16(v) => self.write_i16(v),
            Primitive::U32(v) => self.write_u32(v),
            Primitive::I32(v) => self.write_i32(v),
            Primitive::U64(v) => self.write_u64(v),
            Primitive::I64(v) => self.write_i64(v),
            Primitive::F32(v) => self.write_f32(v),
            Primitive::F64(v) => self.write_f64(v),
        }
    }

    /// Length prefix (NUL included), bytes, NUL. `len + 1` must fit a `u32`.
    pub fn write_string(&mut self, value: &str) {
        self.write_u32((value.len() + 1) as u32);
        self.sink.put(value.as_bytes());
        self.sink.put(&[0]);
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}

/// A read ran past the end of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub offset: usize,
    pub needed: usize,
    pub available: usize,
}

/// Decoding cursor.
pub struct CdrReader<'a> {
    buffer: &'a [u8],
    offset: usize,
    order: ByteOrder,
    max_align: usize,
}

impl<'a> CdrReader<'a> {
    /// `buffer` is the body, without encapsulation header.
    pub fn new(buffer: &'a [u8], config: &WireConfig) -> Self {
        Self {
            buffer,
            offset: 0,
            order: config.byte_order,
            max_align: config.max_align.max(1),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    /// Skip padding up to `min(width, max_align)`.
    pub fn align(&mut self, width: usize) -> Result<(), Shortfall> {
        let align = width.min(self.max_align).max(1);
        let rem = self.offset % align;
        if rem != 0 {
            self.take(align - rem)?;
        }
        Ok(())
    }

    /// Padding the next read of `width` bytes would skip.
    pub fn padding_for(&self, width: usize) -> usize {
        let align = width.min(self.max_align).max(1);
        (align - self.offset % align) % align
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], Shortfall> {
        if len > self.remaining() {
            return Err(Shortfall {
                offset: self.offset,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    impl_read!(read_u16, u16);
    impl_read!(read_u32, u32);
    impl_read!(read_u64, u64);
    impl_read!(read_i16, i16);
    impl_read!(read_i32, i32);
    impl_read!(read_i64, i64);
    impl_read!(read_f32, f32);
    impl_read!(read_f64, f64);

    pub fn read_u8(&mut self) -> Result<u8, Shortfall> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, Shortfall> {
        Ok(i8::from_ne_bytes([self.read_u8()?]))
    }

    /// Read a numeric primitive. Booleans are validated by the caller.
    pub fn read_prim(&mut self, kind: PrimKind) -> Result<Primitive, Shortfall> {
        Ok(match kind {
            PrimKind::U8 => Primitive::U8(self.read_u8()?),
            PrimKind::I8 => Primitive::I8(self.read_i8()?),
            PrimKind::U16 => Primitive::U16(self.read_u16()?),
            PrimKind::I16 => Primitive::I16(self.read_i16()?),
            PrimKind::U32 => Primitive::U32(self.read_u32()?),
            PrimKind::I32 => Primitive::I32(self.read_i32()?),
            PrimKind::U64 => Primitive::U64(self.read_u64()?),
            PrimKind::I64 => Primitive::I64(self.read_i64()?),
            PrimKind::F32 => Primitive::F32(self.read_f32()?),
            PrimKind::F64 => Primitive::F64(self.read_f64()?),
        })
    }

    /// Read a string or sequence length prefix.
    pub fn read_length(&mut self) -> Result<u32, Shortfall> {
        self.read_u32()
    }
}
