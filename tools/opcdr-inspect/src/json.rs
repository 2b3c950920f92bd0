// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON view of dynamic samples.
//!
//! Members are named from the descriptor's metadata when it has any, otherwise
//! by field index. Fixed arrays nest by their declared dimensions on output and
//! accept any nesting on input.

use anyhow::{anyhow, bail, Context, Result};
use opcdr::meta::{MetaData, MetaType, Struct};
use opcdr::ops::{instructions, Instruction, Leaf, Shape, StreamId, ROOT_STREAM};
use opcdr::reflect::{DynValue, DynamicSample, Primitive, SequenceMut};
use opcdr::TopicDescriptor;
use serde_json::{Map, Number, Value};

/// Member names of one structure level and the module it lives in.
struct Level<'m> {
    path: Vec<String>,
    def: &'m Struct,
}

pub struct JsonView<'d> {
    desc: &'d TopicDescriptor,
    meta: Option<MetaData>,
}

impl<'d> JsonView<'d> {
    pub fn new(desc: &'d TopicDescriptor) -> Result<Self> {
        let meta = if desc.meta.is_empty() {
            None
        } else {
            Some(MetaData::parse(&desc.meta).context("descriptor metadata")?)
        };
        Ok(Self { desc, meta })
    }

    pub fn to_json(&self, sample: &DynamicSample) -> Result<Value> {
        self.struct_to_json(ROOT_STREAM, sample, self.root_level().as_ref())
    }

    /// Build a sample from `value`; members missing from the object keep defaults.
    pub fn from_json(&self, value: &Value) -> Result<DynamicSample> {
        let mut sample = DynamicSample::new(self.desc)?;
        self.struct_from_json(ROOT_STREAM, value, &mut sample, self.root_level().as_ref(), "")?;
        Ok(sample)
    }

    fn root_level(&self) -> Option<Level<'_>> {
        let (path, def) = self.meta.as_ref()?.find_struct(&self.desc.type_name)?;
        Some(Level { path, def })
    }

    fn nested_level(&self, outer: Option<&Level<'_>>, ty: Option<&MetaType>) -> Option<Level<'_>> {
        let MetaType::Type { name } = element_type(ty?) else {
            return None;
        };
        let (path, def) = self.meta.as_ref()?.resolve(&outer?.path, name)?;
        Some(Level { path, def })
    }

    fn stream(&self, id: StreamId) -> Result<Vec<Instruction>> {
        let words = self
            .desc
            .ops
            .stream(id)
            .ok_or_else(|| anyhow!("stream {} is out of range", id))?;
        Ok(instructions(id, words).collect::<Result<Vec<_>, _>>()?)
    }

    fn struct_to_json(
        &self,
        stream: StreamId,
        sample: &DynamicSample,
        level: Option<&Level<'_>>,
    ) -> Result<Value> {
        let mut map = Map::new();
        for (pos, insn) in self.stream(stream)?.into_iter().enumerate() {
            let member = level.and_then(|l| l.def.members.get(pos));
            let ty = member.map(|m| &m.ty);
            let name = member.map_or_else(|| insn.field.to_string(), |m| m.name.clone());
            let value = sample
                .get(insn.field)
                .ok_or_else(|| anyhow!("{}: sample has no field {}", name, insn.field))?;

            let json = match (&insn.shape, value) {
                (Shape::Single(leaf), value) => self.leaf_to_json(leaf, value, level, ty)?,
                (Shape::Sequence(leaf), DynValue::Sequence(seq)) => Value::Array(
                    seq.items()
                        .iter()
                        .map(|item| self.leaf_to_json(leaf, item, level, ty))
                        .collect::<Result<_>>()?,
                ),
                (Shape::Array { leaf, .. }, DynValue::Array(items)) => {
                    let flat = items
                        .iter()
                        .map(|item| self.leaf_to_json(leaf, item, level, ty))
                        .collect::<Result<Vec<_>>>()?;
                    nest(flat, &dims(ty))
                }
                (shape, _) => bail!("{}: sample does not hold a `{}`", name, shape),
            };
            map.insert(name, json);
        }
        Ok(Value::Object(map))
    }

    fn leaf_to_json(
        &self,
        leaf: &Leaf,
        value: &DynValue,
        level: Option<&Level<'_>>,
        ty: Option<&MetaType>,
    ) -> Result<Value> {
        Ok(match (leaf, value) {
            (Leaf::Prim(_) | Leaf::Bool, DynValue::Prim(prim)) => prim_to_json(*prim),
            (Leaf::String { .. }, DynValue::Str(text)) => Value::String(text.clone()),
            (Leaf::Struct(stream), DynValue::Struct(inner)) => {
                let nested = self.nested_level(level, ty);
                self.struct_to_json(*stream, inner, nested.as_ref())?
            }
            (leaf, _) => bail!("sample does not hold a `{}`", leaf),
        })
    }

    fn struct_from_json(
        &self,
        stream: StreamId,
        value: &Value,
        sample: &mut DynamicSample,
        level: Option<&Level<'_>>,
        path: &str,
    ) -> Result<()> {
        let Value::Object(map) = value else {
            bail!("{}: expected an object", shown(path));
        };
        let insns = self.stream(stream)?;
        let names: Vec<String> = insns
            .iter()
            .enumerate()
            .map(|(pos, insn)| {
                level
                    .and_then(|l| l.def.members.get(pos))
                    .map_or_else(|| insn.field.to_string(), |m| m.name.clone())
            })
            .collect();
        if let Some(unknown) = map.keys().find(|key| !names.contains(*key)) {
            bail!("{}: unknown member `{}`", shown(path), unknown);
        }

        for (pos, (insn, name)) in insns.iter().zip(&names).enumerate() {
            let Some(json) = map.get(name) else {
                continue;
            };
            let here = format!("{}.{}", path, name);
            let ty = level.and_then(|l| l.def.members.get(pos)).map(|m| &m.ty);
            let slot = sample
                .get_mut(insn.field)
                .ok_or_else(|| anyhow!("{}: sample has no field {}", here, insn.field))?;

            match (&insn.shape, slot) {
                (Shape::Single(leaf), slot) => self.leaf_from_json(leaf, json, slot, level, ty, &here)?,
                (Shape::Sequence(leaf), DynValue::Sequence(seq)) => {
                    let Value::Array(items) = json else {
                        bail!("{}: expected an array", here);
                    };
                    seq.resize(items.len())?;
                    for (idx, (item, slot)) in items.iter().zip(seq.items_mut()).enumerate() {
                        let at = format!("{}[{}]", here, idx);
                        self.leaf_from_json(leaf, item, slot, level, ty, &at)?;
                    }
                }
                (Shape::Array { leaf, count }, DynValue::Array(slots)) => {
                    if !json.is_array() {
                        bail!("{}: expected an array", here);
                    }
                    let mut flat = Vec::with_capacity(slots.len());
                    flatten(json, &mut flat);
                    if flat.len() != *count as usize {
                        bail!("{}: expected {} elements, found {}", here, count, flat.len());
                    }
                    for (idx, (item, slot)) in flat.into_iter().zip(slots.iter_mut()).enumerate() {
                        let at = format!("{}[{}]", here, idx);
                        self.leaf_from_json(leaf, item, slot, level, ty, &at)?;
                    }
                }
                (shape, _) => bail!("{}: sample does not hold a `{}`", here, shape),
            }
        }
        Ok(())
    }

    fn leaf_from_json(
        &self,
        leaf: &Leaf,
        json: &Value,
        slot: &mut DynValue,
        level: Option<&Level<'_>>,
        ty: Option<&MetaType>,
        path: &str,
    ) -> Result<()> {
        match (leaf, slot) {
            (Leaf::Prim(_) | Leaf::Bool, DynValue::Prim(prim)) => {
                *prim = prim_from_json(*prim, json).with_context(|| path.to_owned())?;
            }
            (Leaf::String { .. }, DynValue::Str(text)) => {
                let Value::String(value) = json else {
                    bail!("{}: expected a string, found {}", path, json);
                };
                text.clone_from(value);
            }
            (Leaf::Struct(stream), DynValue::Struct(inner)) => {
                let nested = self.nested_level(level, ty);
                self.struct_from_json(*stream, json, inner, nested.as_ref(), path)?;
            }
            (leaf, _) => bail!("{}: sample does not hold a `{}`", path, leaf),
        }
        Ok(())
    }
}

fn shown(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

/// Element type behind sequence and array wrappers.
fn element_type(ty: &MetaType) -> &MetaType {
    match ty {
        MetaType::Sequence(elem) | MetaType::Array { elem, .. } => element_type(elem),
        other => other,
    }
}

/// Declared array dimensions, outermost first.
fn dims(ty: Option<&MetaType>) -> Vec<u32> {
    let mut dims = Vec::new();
    let mut cur = ty;
    while let Some(MetaType::Array { size, elem }) = cur {
        dims.push(*size);
        cur = Some(elem.as_ref());
    }
    dims
}

fn nest(flat: Vec<Value>, dims: &[u32]) -> Value {
    let [_, inner @ ..] = dims else {
        return Value::Array(flat);
    };
    let row: usize = inner.iter().map(|d| *d as usize).product();
    if inner.is_empty() || row == 0 {
        return Value::Array(flat);
    }
    Value::Array(
        flat.chunks(row)
            .map(|chunk| nest(chunk.to_vec(), inner))
            .collect(),
    )
}

fn flatten<'v>(json: &'v Value, out: &mut Vec<&'v Value>) {
    match json {
        Value::Array(items) => items.iter().for_each(|item| flatten(item, out)),
        other => out.push(other),
    }
}

fn prim_to_json(prim: Primitive) -> Value {
    match prim {
        Primitive::Bool(v) => Value::Bool(v),
        Primitive::U8(v) => v.into(),
        Primitive::I8(v) => v.into(),
        Primitive::U16(v) => v.into(),
        Primitive::I16(v) => v.into(),
        Primitive::U32(v) => v.into(),
        Primitive::I32(v) => v.into(),
        Primitive::U64(v) => v.into(),
        Primitive::I64(v) => v.into(),
        Primitive::F32(v) => float(f64::from(v)),
        Primitive::F64(v) => float(v),
    }
}

// NaN and infinities have no JSON form.
fn float(v: f64) -> Value {
    Number::from_f64(v).map_or(Value::Null, Value::Number)
}

fn integer<T: TryFrom<i128>>(json: &Value) -> Option<T> {
    json.as_i64()
        .map(i128::from)
        .or_else(|| json.as_u64().map(i128::from))
        .and_then(|v| T::try_from(v).ok())
}

/// Parse `json` as the same kind as `proto`.
#[allow(clippy::cast_possible_truncation)]
fn prim_from_json(proto: Primitive, json: &Value) -> Result<Primitive> {
    let mismatch = || anyhow!("expected {}, found {}", proto.name(), json);
    Ok(match proto {
        Primitive::Bool(_) => Primitive::Bool(json.as_bool().ok_or_else(mismatch)?),
        Primitive::U8(_) => Primitive::U8(integer(json).ok_or_else(mismatch)?),
        Primitive::I8(_) => Primitive::I8(integer(json).ok_or_else(mismatch)?),
        Primitive::U16(_) => Primitive::U16(integer(json).ok_or_else(mismatch)?),
        Primitive::I16(_) => Primitive::I16(integer(json).ok_or_else(mismatch)?),
        Primitive::U32(_) => Primitive::U32(integer(json).ok_or_else(mismatch)?),
        Primitive::I32(_) => Primitive::I32(integer(json).ok_or_else(mismatch)?),
        Primitive::U64(_) => Primitive::U64(integer(json).ok_or_else(mismatch)?),
        Primitive::I64(_) => Primitive::I64(integer(json).ok_or_else(mismatch)?),
        Primitive::F32(_) => Primitive::F32(json.as_f64().ok_or_else(mismatch)? as f32),
        Primitive::F64(_) => Primitive::F64(json.as_f64().ok_or_else(mismatch)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use opcdr::reflect::{MemberType, PrimKind};
    use opcdr::TypeBuilder;
    use serde_json::json;
    use std::sync::Arc;

    fn outer() -> TopicDescriptor {
        let inner = TypeBuilder::new("Demo::Inner")
            .member("a", MemberType::Prim(PrimKind::I16))
            .member("b", MemberType::String { bound: None })
            .build()
            .expect("inner");
        let inner = MemberType::Struct(Arc::new(inner));
        TypeBuilder::new("Demo::Sub::Outer")
            .key("id", MemberType::Prim(PrimKind::U32))
            .member("inner", inner.clone())
            .member(
                "grid",
                MemberType::Array {
                    dims: vec![2, 3],
                    elem: Box::new(MemberType::Prim(PrimKind::U8)),
                },
            )
            .member("tags", MemberType::Sequence(Box::new(MemberType::String { bound: None })))
            .member("items", MemberType::Sequence(Box::new(inner)))
            .member("ok", MemberType::Bool)
            .build()
            .expect("outer")
    }

    fn sample_json() -> Value {
        json!({
            "id": 7,
            "inner": { "a": -2, "b": "x" },
            "grid": [[1, 2, 3], [4, 5, 6]],
            "tags": ["t1", "t2"],
            "items": [{ "a": 1, "b": "" }],
            "ok": true
        })
    }

    #[test]
    fn test_json_survives_the_wire() {
        let desc = outer();
        let view = JsonView::new(&desc).expect("view");
        let sample = view.from_json(&sample_json()).expect("from json");

        let bytes = opcdr::serialize(&desc, &sample).expect("serialize");
        let back = opcdr::deserialize_dynamic(&desc, &bytes).expect("deserialize");
        assert_eq!(view.to_json(&back).expect("to json"), sample_json());
    }

    #[test]
    fn test_missing_members_keep_defaults() {
        let desc = outer();
        let view = JsonView::new(&desc).expect("view");
        let sample = view.from_json(&json!({ "id": 1 })).expect("from json");
        let out = view.to_json(&sample).expect("to json");
        assert_eq!(out["grid"], json!([[0, 0, 0], [0, 0, 0]]));
        assert_eq!(out["inner"], json!({ "a": 0, "b": "" }));
        assert_eq!(out["items"], json!([]));
    }

    #[test]
    fn test_flat_array_input_is_accepted() {
        let desc = outer();
        let view = JsonView::new(&desc).expect("view");
        let sample = view
            .from_json(&json!({ "grid": [1, 2, 3, 4, 5, 6] }))
            .expect("from json");
        let out = view.to_json(&sample).expect("to json");
        assert_eq!(out["grid"], json!([[1, 2, 3], [4, 5, 6]]));
    }

    #[test]
    fn test_rejects_bad_input() {
        let desc = outer();
        let view = JsonView::new(&desc).expect("view");

        let err = view.from_json(&json!({ "nope": 1 })).expect_err("unknown");
        assert!(err.to_string().contains("unknown member `nope`"));

        let err = view.from_json(&json!({ "inner": { "a": 70000 } })).expect_err("range");
        assert!(format!("{:#}", err).contains(".inner.a"));

        let err = view.from_json(&json!({ "grid": [1, 2] })).expect_err("count");
        assert!(err.to_string().contains("expected 6 elements, found 2"));
    }

    #[test]
    fn test_names_fall_back_to_field_indices() {
        let mut desc = outer();
        desc.meta.clear();
        let view = JsonView::new(&desc).expect("view");
        let sample = view
            .from_json(&json!({ "0": 5, "1": { "1": "y" } }))
            .expect("from json");
        let out = view.to_json(&sample).expect("to json");
        assert_eq!(out["0"], json!(5));
        assert_eq!(out["1"], json!({ "0": 0, "1": "y" }));
    }
}
