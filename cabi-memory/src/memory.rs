// CABI - cabi-memory
// Module: CABI Linear Memory View
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Bounds-checked access to a guest instance's linear memory.

use cabi_error::{codes, kinds, Error, ErrorCategory, Result};

/// WebAssembly page size (64 KiB)
pub const PAGE_SIZE: u32 = 65536;

/// Maximum page count a view may grow to
///
/// One page short of the 4 GiB wasm32 ceiling: byte offsets and sizes are
/// `u32` throughout, so the view itself must stay below 2^32 bytes.
pub const MAX_PAGES: u32 = 65535;

/// Memory interface for canonical marshalling operations
///
/// All offsets are byte offsets from the start of the view. Every access is
/// bounds-checked; reads and writes past the current size fail with a
/// `Memory` category error and never touch the buffer.
pub trait CanonicalMemory {
    /// Read `len` bytes starting at `offset`
    fn read_bytes(&self, offset: u32, len: u32) -> Result<Vec<u8>>;

    /// Write `data` starting at `offset`
    fn write_bytes(&mut self, offset: u32, data: &[u8]) -> Result<()>;

    /// Get memory size in bytes
    fn size(&self) -> u32;

    /// Grow the memory by `pages` pages, returning the previous size in pages
    fn grow(&mut self, pages: u32) -> Result<u32>;

    /// Read a single byte
    fn read_u8(&self, offset: u32) -> Result<u8> {
        let bytes = self.read_bytes(offset, 1)?;
        Ok(bytes[0])
    }

    /// Write a single byte
    fn write_u8(&mut self, offset: u32, value: u8) -> Result<()> {
        self.write_bytes(offset, &[value])
    }

    /// Read little-endian u16
    fn read_u16_le(&self, offset: u32) -> Result<u16> {
        let bytes = self.read_bytes(offset, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Write little-endian u16
    fn write_u16_le(&mut self, offset: u32, value: u16) -> Result<()> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Read little-endian u32
    fn read_u32_le(&self, offset: u32) -> Result<u32> {
        let bytes = self.read_bytes(offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Write little-endian u32
    fn write_u32_le(&mut self, offset: u32, value: u32) -> Result<()> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Read little-endian u64
    fn read_u64_le(&self, offset: u32) -> Result<u64> {
        let bytes = self.read_bytes(offset, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Write little-endian u64
    fn write_u64_le(&mut self, offset: u32, value: u64) -> Result<()> {
        self.write_bytes(offset, &value.to_le_bytes())
    }
}

/// A resizable linear memory view owned by a guest instance
///
/// Backed by a `Vec<u8>`, sized in whole pages, optionally capped at a
/// maximum page count. This is the only storage lists and strings may occupy
/// while crossing the boundary.
#[derive(Debug, Clone)]
pub struct LinearMemory {
    data: Vec<u8>,
    maximum_pages: Option<u32>,
}

impl LinearMemory {
    /// Create a memory with `initial_pages` pages, unbounded growth
    #[must_use]
    pub fn new(initial_pages: u32) -> Self {
        Self {
            data: vec![0; initial_pages as usize * PAGE_SIZE as usize],
            maximum_pages: None,
        }
    }

    /// Create a memory with an initial and maximum page count
    #[must_use]
    pub fn with_maximum(initial_pages: u32, maximum_pages: u32) -> Self {
        Self {
            data: vec![0; initial_pages as usize * PAGE_SIZE as usize],
            maximum_pages: Some(maximum_pages),
        }
    }

    /// Current size in pages
    #[must_use]
    pub fn size_in_pages(&self) -> u32 {
        (self.data.len() / PAGE_SIZE as usize) as u32
    }

    /// Get a reference to the underlying bytes
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn checked_range(&self, offset: u32, len: u32) -> Result<core::ops::Range<usize>> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| Error::new(
                ErrorCategory::Memory,
                codes::ADDRESS_OVERFLOW,
                "Memory address computation overflowed",
            ))?;
        if end as usize > self.data.len() {
            return Err(kinds::bounds_error("Memory access out of bounds"));
        }
        Ok(offset as usize..end as usize)
    }
}

impl CanonicalMemory for LinearMemory {
    fn read_bytes(&self, offset: u32, len: u32) -> Result<Vec<u8>> {
        let range = self.checked_range(offset, len)?;
        Ok(self.data[range].to_vec())
    }

    fn write_bytes(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| {
            Error::new(
                ErrorCategory::Memory,
                codes::ADDRESS_OVERFLOW,
                "Write larger than the 32-bit address space",
            )
        })?;
        let range = self.checked_range(offset, len)?;
        self.data[range].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn grow(&mut self, pages: u32) -> Result<u32> {
        let old_pages = self.size_in_pages();
        let new_pages = old_pages
            .checked_add(pages)
            .filter(|&new_pages| new_pages <= MAX_PAGES)
            .ok_or_else(|| {
                Error::new(
                    ErrorCategory::Memory,
                    codes::MEMORY_GROW_FAILED,
                    "Memory growth exceeds the addressable page limit",
                )
            })?;
        if let Some(max) = self.maximum_pages {
            if new_pages > max {
                return Err(Error::new(
                    ErrorCategory::Memory,
                    codes::MEMORY_GROW_FAILED,
                    "Memory growth exceeds maximum",
                ));
            }
        }
        log::trace!("growing linear memory from {old_pages} to {new_pages} pages");
        self.data
            .resize(new_pages as usize * PAGE_SIZE as usize, 0);
        Ok(old_pages)
    }
}
