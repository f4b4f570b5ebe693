// CABI - cabi-canon
// Module: CABI Lifting Engine
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Lifting: guest memory into host values.

use cabi_error::{codes, kinds, Error, ErrorCategory, Result};
use cabi_memory::{CanonicalMemory, GuestRegion};

use crate::types::{Descriptor, ElemType, Value, MAX_LIST_ELEMENTS, MAX_STRING_BYTES};

/// Converts (pointer, length) descriptors into fully host-owned values
///
/// Reads never mutate guest memory, bounds are validated before any byte is
/// touched, and the result holds no reference into the view, so guest memory
/// may be resized or repurposed the moment this returns. Malformed UTF-8 is
/// a boundary-contract violation and is surfaced, never repaired.
#[derive(Debug)]
pub struct LiftingEngine<'a, M> {
    memory: &'a M,
}

impl<'a, M: CanonicalMemory> LiftingEngine<'a, M> {
    /// Create an engine reading from `memory`
    pub fn new(memory: &'a M) -> Self {
        Self { memory }
    }

    /// Lift the value `descriptor` refers to, decoding per `ty`
    pub fn lift(&self, descriptor: Descriptor, ty: &ElemType) -> Result<Value> {
        match ty {
            ElemType::Str => self.lift_str(descriptor),
            ElemType::List(elem) => self.lift_list(descriptor, elem),
            _ => Err(Error::new(
                ErrorCategory::Type,
                codes::UNSUPPORTED_TYPE,
                "Only lists and strings are marshalled",
            )),
        }
    }

    fn lift_str(&self, descriptor: Descriptor) -> Result<Value> {
        if descriptor.len > MAX_STRING_BYTES {
            return Err(Error::new(
                ErrorCategory::Validation,
                codes::LENGTH_LIMIT_EXCEEDED,
                "String exceeds the marshalling length limit",
            ));
        }
        if descriptor.len == 0 {
            // Zero-length: valid empty value, sentinel never dereferenced.
            return Ok(Value::Str(String::new()));
        }
        let bytes = self.memory.read_bytes(descriptor.ptr, descriptor.len)?;
        let s = String::from_utf8(bytes)
            .map_err(|_| kinds::invalid_utf8("Lifted string is not valid UTF-8"))?;
        Ok(Value::Str(s))
    }

    fn lift_list(&self, descriptor: Descriptor, elem: &ElemType) -> Result<Value> {
        if descriptor.len > MAX_LIST_ELEMENTS {
            return Err(Error::new(
                ErrorCategory::Validation,
                codes::LENGTH_LIMIT_EXCEEDED,
                "List exceeds the marshalling element limit",
            ));
        }
        if descriptor.len == 0 {
            return Ok(Value::List(Vec::new()));
        }

        if elem.is_fixed_size() {
            let size = elem.byte_size();
            let byte_len = descriptor.len.checked_mul(size).ok_or(Error::new(
                ErrorCategory::Memory,
                codes::ADDRESS_OVERFLOW,
                "List byte size overflows the address space",
            ))?;
            let bytes = self.memory.read_bytes(descriptor.ptr, byte_len)?;
            let items = bytes
                .chunks_exact(size as usize)
                .map(|chunk| read_fixed(chunk, elem))
                .collect();
            return Ok(Value::List(items));
        }

        let mut items = Vec::with_capacity(descriptor.len as usize);
        for i in 0..descriptor.len {
            let at = descriptor
                .ptr
                .checked_add(i * 8)
                .ok_or(kinds::bounds_error("Descriptor array overflows the address space"))?;
            let child = Descriptor::new(
                self.memory.read_u32_le(at)?,
                self.memory.read_u32_le(at + 4)?,
            );
            items.push(self.lift(child, elem)?);
        }
        Ok(Value::List(items))
    }
}

// Element codec, read direction. `chunk` is exactly one element wide.
fn read_fixed(chunk: &[u8], ty: &ElemType) -> Value {
    match ty {
        ElemType::U8 => Value::U8(chunk[0]),
        ElemType::S8 => Value::S8(chunk[0] as i8),
        ElemType::U16 => Value::U16(u16::from_le_bytes([chunk[0], chunk[1]])),
        ElemType::S16 => Value::S16(i16::from_le_bytes([chunk[0], chunk[1]])),
        ElemType::U32 => Value::U32(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
        ElemType::S32 => Value::S32(i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
        ElemType::F32 => Value::F32(f32::from_bits(u32::from_le_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3],
        ]))),
        ElemType::U64 => Value::U64(u64::from_le_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ])),
        ElemType::S64 => Value::S64(i64::from_le_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ])),
        ElemType::F64 => Value::F64(f64::from_bits(u64::from_le_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ]))),
        // Guarded by is_fixed_size before dispatch.
        ElemType::Str | ElemType::List(_) => unreachable!("variable-size element in fixed codec"),
    }
}

/// Collect every region backing a guest-lowered value, children first
///
/// Mirrors the lowering layout exactly: the regions and alignments pushed
/// here are the triples the guest's own lowering allocated, so replaying
/// them to the allocator adapter frees the value without corrupting its
/// bookkeeping. Zero-length descriptors contribute nothing.
pub fn collect_value_regions<M: CanonicalMemory>(
    memory: &M,
    descriptor: Descriptor,
    ty: &ElemType,
    out: &mut Vec<GuestRegion>,
) -> Result<()> {
    if descriptor.len == 0 {
        return Ok(());
    }
    match ty {
        ElemType::Str => {
            out.push(GuestRegion::new(descriptor.ptr, descriptor.len, 1));
            Ok(())
        }
        ElemType::List(elem) if elem.is_fixed_size() => {
            let byte_len = descriptor
                .len
                .checked_mul(elem.byte_size())
                .ok_or(kinds::bounds_error("List byte size overflows the address space"))?;
            out.push(GuestRegion::new(descriptor.ptr, byte_len, elem.align()));
            Ok(())
        }
        ElemType::List(elem) => {
            let byte_len = descriptor
                .len
                .checked_mul(8)
                .ok_or(kinds::bounds_error("Descriptor array overflows the address space"))?;
            for i in 0..descriptor.len {
                let at = descriptor
                    .ptr
                    .checked_add(i * 8)
                    .ok_or(kinds::bounds_error("Descriptor array overflows the address space"))?;
                let child = Descriptor::new(
                    memory.read_u32_le(at)?,
                    memory.read_u32_le(at + 4)?,
                );
                collect_value_regions(memory, child, elem, out)?;
            }
            out.push(GuestRegion::new(descriptor.ptr, byte_len, elem.align()));
            Ok(())
        }
        _ => Err(Error::new(
            ErrorCategory::Type,
            codes::UNSUPPORTED_TYPE,
            "Only lists and strings are marshalled",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lower::LoweringEngine;
    use cabi_memory::{BumpAllocator, GuestAllocator, LinearMemory, TrackingAllocator};

    fn roundtrip(value: &Value, ty: &ElemType) -> Value {
        let mut memory = LinearMemory::new(1);
        let mut alloc = TrackingAllocator::new(BumpAllocator::new(16));
        let mut engine = LoweringEngine::new(&mut memory, &mut alloc);
        let desc = engine.lower(value, ty).unwrap();
        LiftingEngine::new(&memory).lift(desc, ty).unwrap()
    }

    #[test]
    fn test_string_roundtrip_identity() {
        let ty = ElemType::Str;
        for s in ["x", "", "hello ⚑ world"] {
            assert_eq!(roundtrip(&Value::from(s), &ty), Value::from(s));
        }
    }

    #[test]
    fn test_numeric_boundary_roundtrips() {
        let cases: Vec<(Value, ElemType)> = vec![
            (
                Value::List(vec![Value::U8(0), Value::U8(u8::MAX)]),
                ElemType::List(Box::new(ElemType::U8)),
            ),
            (
                Value::List(vec![Value::S8(i8::MIN), Value::S8(i8::MAX)]),
                ElemType::List(Box::new(ElemType::S8)),
            ),
            (
                Value::List(vec![Value::U16(0), Value::U16(u16::MAX)]),
                ElemType::List(Box::new(ElemType::U16)),
            ),
            (
                Value::List(vec![Value::S16(i16::MIN), Value::S16(i16::MAX)]),
                ElemType::List(Box::new(ElemType::S16)),
            ),
            (
                Value::List(vec![Value::U32(0), Value::U32(u32::MAX)]),
                ElemType::List(Box::new(ElemType::U32)),
            ),
            (
                Value::List(vec![Value::S32(i32::MIN), Value::S32(i32::MAX)]),
                ElemType::List(Box::new(ElemType::S32)),
            ),
            (
                Value::List(vec![Value::U64(0), Value::U64(u64::MAX)]),
                ElemType::List(Box::new(ElemType::U64)),
            ),
            (
                Value::List(vec![Value::S64(i64::MIN), Value::S64(i64::MAX)]),
                ElemType::List(Box::new(ElemType::S64)),
            ),
            (
                Value::List(vec![
                    Value::F32(f32::MIN),
                    Value::F32(f32::MAX),
                    Value::F32(f32::NEG_INFINITY),
                    Value::F32(f32::INFINITY),
                ]),
                ElemType::List(Box::new(ElemType::F32)),
            ),
            (
                Value::List(vec![
                    Value::F64(f64::MIN),
                    Value::F64(f64::MAX),
                    Value::F64(f64::NEG_INFINITY),
                    Value::F64(f64::INFINITY),
                ]),
                ElemType::List(Box::new(ElemType::F64)),
            ),
        ];
        for (value, ty) in cases {
            assert_eq!(roundtrip(&value, &ty), value);
        }
    }

    #[test]
    fn test_nested_list_shape_preserved() {
        let value = Value::List(vec![
            Value::strings(&["foo", "bar"]),
            Value::strings(&["baz"]),
        ]);
        let ty = ElemType::List(Box::new(ElemType::List(Box::new(ElemType::Str))));
        assert_eq!(roundtrip(&value, &ty), value);
    }

    #[test]
    fn test_empty_values_distinct_and_valid() {
        let empty_list = Value::List(vec![]);
        let empty_str = Value::Str(String::new());
        assert_eq!(
            roundtrip(&empty_list, &ElemType::List(Box::new(ElemType::U8))),
            empty_list
        );
        assert_eq!(roundtrip(&empty_str, &ElemType::Str), empty_str);
        assert_ne!(empty_list, empty_str);
    }

    #[test]
    fn test_invalid_utf8_surfaced() {
        let mut memory = LinearMemory::new(1);
        memory.write_bytes(64, &[0xff, 0xfe, 0xfd]).unwrap();

        let err = LiftingEngine::new(&memory)
            .lift(Descriptor::new(64, 3), &ElemType::Str)
            .unwrap_err();
        assert_eq!(err.code, codes::INVALID_UTF8);
    }

    #[test]
    fn test_out_of_bounds_descriptor() {
        let memory = LinearMemory::new(1);
        let err = LiftingEngine::new(&memory)
            .lift(
                Descriptor::new(memory.size() - 2, 4),
                &ElemType::List(Box::new(ElemType::U8)),
            )
            .unwrap_err();
        assert_eq!(err.code, codes::MEMORY_OUT_OF_BOUNDS);
    }

    #[test]
    fn test_collect_regions_matches_lowering() {
        let mut memory = LinearMemory::new(1);
        let mut alloc = TrackingAllocator::new(BumpAllocator::new(16));
        let value = Value::List(vec![
            Value::strings(&["foo", "bar"]),
            Value::strings(&["baz"]),
        ]);
        let ty = ElemType::List(Box::new(ElemType::List(Box::new(ElemType::Str))));

        let mut engine = LoweringEngine::new(&mut memory, &mut alloc);
        let desc = engine.lower(&value, &ty).unwrap();
        let mut lowered = engine.into_owned_regions();

        let mut collected = Vec::new();
        collect_value_regions(&memory, desc, &ty, &mut collected).unwrap();

        lowered.sort_by_key(|r| r.ptr);
        collected.sort_by_key(|r| r.ptr);
        assert_eq!(lowered, collected);

        // Freeing the collected regions drains the probe to zero.
        for region in &collected {
            alloc
                .deallocate(&mut memory, region.ptr, region.len, region.align)
                .unwrap();
        }
        assert_eq!(alloc.allocated_bytes(), 0);
    }
}
