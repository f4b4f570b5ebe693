// CABI - cabi-canon
// Module: CABI Lowering Engine
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Lowering: host values into guest memory.

use cabi_error::{codes, kinds, Error, ErrorCategory, Result};
use cabi_memory::{CanonicalMemory, GuestAllocator, GuestRegion};

use crate::types::{Descriptor, ElemType, Value, MAX_LIST_ELEMENTS, MAX_STRING_BYTES};

/// Converts host list/string values into (pointer, length) descriptors
/// backed by guest memory
///
/// Every region the engine allocates is recorded; the call adapter drains
/// the record in its Freeing phase and replays each exact triple to the
/// allocator adapter. On failure the record still holds whatever was
/// allocated before the error, so the caller can free it rather than leak.
#[derive(Debug)]
pub struct LoweringEngine<'a, M, A> {
    memory: &'a mut M,
    allocator: &'a mut A,
    owned: Vec<GuestRegion>,
}

impl<'a, M: CanonicalMemory, A: GuestAllocator> LoweringEngine<'a, M, A> {
    /// Create an engine writing through `allocator` into `memory`
    pub fn new(memory: &'a mut M, allocator: &'a mut A) -> Self {
        Self {
            memory,
            allocator,
            owned: Vec::new(),
        }
    }

    /// Lower a list or string value, producing its wire descriptor
    pub fn lower(&mut self, value: &Value, ty: &ElemType) -> Result<Descriptor> {
        match ty {
            ElemType::Str => {
                let s = value
                    .as_str()
                    .ok_or(kinds::type_mismatch("Expected a string value"))?;
                self.lower_str(s)
            }
            ElemType::List(elem) => {
                let items = value
                    .as_list()
                    .ok_or(kinds::type_mismatch("Expected a list value"))?;
                self.lower_list(items, elem)
            }
            _ => Err(Error::new(
                ErrorCategory::Type,
                codes::UNSUPPORTED_TYPE,
                "Only lists and strings are marshalled",
            )),
        }
    }

    /// Regions allocated so far, in allocation order
    #[must_use]
    pub fn owned_regions(&self) -> &[GuestRegion] {
        &self.owned
    }

    /// Consume the engine, yielding the regions it allocated
    #[must_use]
    pub fn into_owned_regions(self) -> Vec<GuestRegion> {
        self.owned
    }

    fn alloc_region(&mut self, size: u32, align: u32) -> Result<u32> {
        let ptr = self.allocator.allocate(self.memory, size, align)?;
        self.owned.push(GuestRegion::new(ptr, size, align));
        Ok(ptr)
    }

    fn lower_str(&mut self, s: &str) -> Result<Descriptor> {
        let bytes = s.as_bytes();
        let len = u32::try_from(bytes.len())
            .ok()
            .filter(|&len| len <= MAX_STRING_BYTES)
            .ok_or(Error::new(
                ErrorCategory::Validation,
                codes::LENGTH_LIMIT_EXCEEDED,
                "String exceeds the marshalling length limit",
            ))?;
        if len == 0 {
            // Sentinel pointer, never dereferenced.
            return Ok(Descriptor::new(ElemType::Str.payload_align(), 0));
        }
        let ptr = self.alloc_region(len, ElemType::Str.payload_align())?;
        self.memory.write_bytes(ptr, bytes)?;
        Ok(Descriptor::new(ptr, len))
    }

    fn lower_list(&mut self, items: &[Value], elem: &ElemType) -> Result<Descriptor> {
        let count = u32::try_from(items.len())
            .ok()
            .filter(|&count| count <= MAX_LIST_ELEMENTS)
            .ok_or(Error::new(
                ErrorCategory::Validation,
                codes::LENGTH_LIMIT_EXCEEDED,
                "List exceeds the marshalling element limit",
            ))?;
        if count == 0 {
            return Ok(Descriptor::new(elem.align(), 0));
        }

        if elem.is_fixed_size() {
            let size = elem.byte_size();
            let byte_len = count.checked_mul(size).ok_or(Error::new(
                ErrorCategory::Memory,
                codes::ADDRESS_OVERFLOW,
                "List byte size overflows the address space",
            ))?;
            let ptr = self.alloc_region(byte_len, elem.align())?;
            for (i, item) in items.iter().enumerate() {
                self.write_fixed(ptr + i as u32 * size, item, elem)?;
            }
            return Ok(Descriptor::new(ptr, count));
        }

        // Variable-size elements: lower every child first, then write the
        // array of descriptor pairs into the outer region.
        let mut descriptors = Vec::with_capacity(items.len());
        for item in items {
            descriptors.push(self.lower(item, elem)?);
        }
        let byte_len = count.checked_mul(elem.byte_size()).ok_or(Error::new(
            ErrorCategory::Memory,
            codes::ADDRESS_OVERFLOW,
            "Descriptor array size overflows the address space",
        ))?;
        let ptr = self.alloc_region(byte_len, elem.align())?;
        for (i, desc) in descriptors.iter().enumerate() {
            let at = ptr + i as u32 * 8;
            self.memory.write_u32_le(at, desc.ptr)?;
            self.memory.write_u32_le(at + 4, desc.len)?;
        }
        Ok(Descriptor::new(ptr, count))
    }

    // Element codec, write direction. Little-endian, exact widths;
    // floats go through their bit patterns.
    fn write_fixed(&mut self, offset: u32, value: &Value, ty: &ElemType) -> Result<()> {
        match (ty, value) {
            (ElemType::U8, Value::U8(v)) => self.memory.write_u8(offset, *v),
            (ElemType::U16, Value::U16(v)) => self.memory.write_u16_le(offset, *v),
            (ElemType::U32, Value::U32(v)) => self.memory.write_u32_le(offset, *v),
            (ElemType::U64, Value::U64(v)) => self.memory.write_u64_le(offset, *v),
            (ElemType::S8, Value::S8(v)) => self.memory.write_u8(offset, *v as u8),
            (ElemType::S16, Value::S16(v)) => self.memory.write_u16_le(offset, *v as u16),
            (ElemType::S32, Value::S32(v)) => self.memory.write_u32_le(offset, *v as u32),
            (ElemType::S64, Value::S64(v)) => self.memory.write_u64_le(offset, *v as u64),
            (ElemType::F32, Value::F32(v)) => self.memory.write_u32_le(offset, v.to_bits()),
            (ElemType::F64, Value::F64(v)) => self.memory.write_u64_le(offset, v.to_bits()),
            _ => Err(kinds::type_mismatch(
                "List element does not match the declared element type",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabi_memory::{BumpAllocator, LinearMemory, TrackingAllocator};

    fn setup() -> (LinearMemory, TrackingAllocator<BumpAllocator>) {
        (LinearMemory::new(1), TrackingAllocator::new(BumpAllocator::new(16)))
    }

    #[test]
    fn test_lower_string_bytes() {
        let (mut memory, mut alloc) = setup();
        let mut engine = LoweringEngine::new(&mut memory, &mut alloc);

        let desc = engine
            .lower(&Value::from("hello"), &ElemType::Str)
            .unwrap();
        assert_eq!(desc.len, 5);
        assert_eq!(engine.owned_regions().len(), 1);

        assert_eq!(memory.read_bytes(desc.ptr, 5).unwrap(), b"hello".to_vec());
    }

    #[test]
    fn test_lower_empty_string_does_not_allocate() {
        let (mut memory, mut alloc) = setup();
        let mut engine = LoweringEngine::new(&mut memory, &mut alloc);

        let desc = engine.lower(&Value::from(""), &ElemType::Str).unwrap();
        assert_eq!(desc.len, 0);
        assert!(engine.owned_regions().is_empty());
        assert_eq!(alloc.allocated_bytes(), 0);
    }

    #[test]
    fn test_lower_fixed_list_layout() {
        let (mut memory, mut alloc) = setup();
        let mut engine = LoweringEngine::new(&mut memory, &mut alloc);

        let value = Value::List(vec![Value::U32(1), Value::U32(0xdead_beef)]);
        let ty = ElemType::List(Box::new(ElemType::U32));
        let desc = engine.lower(&value, &ty).unwrap();

        assert_eq!(desc.len, 2);
        assert_eq!(desc.ptr % 4, 0);
        assert_eq!(memory.read_u32_le(desc.ptr).unwrap(), 1);
        assert_eq!(memory.read_u32_le(desc.ptr + 4).unwrap(), 0xdead_beef);
    }

    #[test]
    fn test_lower_nested_list_descriptor_array() {
        let (mut memory, mut alloc) = setup();
        let mut engine = LoweringEngine::new(&mut memory, &mut alloc);

        let value = Value::strings(&["foo", "bar"]);
        let ty = ElemType::List(Box::new(ElemType::Str));
        let desc = engine.lower(&value, &ty).unwrap();

        assert_eq!(desc.len, 2);
        // Two string regions plus the descriptor array.
        assert_eq!(engine.owned_regions().len(), 3);

        let p0 = memory.read_u32_le(desc.ptr).unwrap();
        let l0 = memory.read_u32_le(desc.ptr + 4).unwrap();
        let p1 = memory.read_u32_le(desc.ptr + 8).unwrap();
        let l1 = memory.read_u32_le(desc.ptr + 12).unwrap();
        assert_eq!(memory.read_bytes(p0, l0).unwrap(), b"foo".to_vec());
        assert_eq!(memory.read_bytes(p1, l1).unwrap(), b"bar".to_vec());
    }

    #[test]
    fn test_lower_type_mismatch() {
        let (mut memory, mut alloc) = setup();
        let mut engine = LoweringEngine::new(&mut memory, &mut alloc);

        let err = engine
            .lower(&Value::from("oops"), &ElemType::List(Box::new(ElemType::U8)))
            .unwrap_err();
        assert_eq!(err.code, codes::TYPE_MISMATCH);

        let mixed = Value::List(vec![Value::U8(1), Value::U16(2)]);
        let err = engine
            .lower(&mixed, &ElemType::List(Box::new(ElemType::U8)))
            .unwrap_err();
        assert_eq!(err.code, codes::TYPE_MISMATCH);
    }

    #[test]
    fn test_lower_scalar_rejected_at_top_level() {
        let (mut memory, mut alloc) = setup();
        let mut engine = LoweringEngine::new(&mut memory, &mut alloc);

        let err = engine.lower(&Value::U32(7), &ElemType::U32).unwrap_err();
        assert_eq!(err.code, codes::UNSUPPORTED_TYPE);
    }

    #[test]
    fn test_partial_failure_keeps_allocated_regions() {
        let (mut memory, mut alloc) = setup();
        let mut engine = LoweringEngine::new(&mut memory, &mut alloc);

        // Second element has the wrong type; the first string was already
        // lowered and its region must be reported for freeing.
        let value = Value::List(vec![Value::from("kept"), Value::U8(1)]);
        let ty = ElemType::List(Box::new(ElemType::Str));
        assert!(engine.lower(&value, &ty).is_err());
        assert_eq!(engine.owned_regions().len(), 1);
    }
}
