// CABI - cabi-memory
// Module: CABI Guest Regions
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Guest regions and alignment arithmetic.

use cabi_error::{codes, Error, ErrorCategory, Result};

/// A span inside a linear memory view
///
/// Identifies `len` bytes at `ptr`, allocated at `align`. Whoever allocates
/// a region is solely responsible for freeing it, and must replay the exact
/// triple to the allocator adapter when doing so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestRegion {
    /// Byte offset of the first byte
    pub ptr: u32,
    /// Byte length of the span
    pub len: u32,
    /// Alignment used at allocation
    pub align: u32,
}

impl GuestRegion {
    /// Create a region from its allocation triple
    #[must_use]
    pub const fn new(ptr: u32, len: u32, align: u32) -> Self {
        Self { ptr, len, align }
    }
}

/// Round `value` up to the next multiple of `align`
///
/// `align` must be a power of two. Fails on address-space overflow.
pub fn align_up(value: u32, align: u32) -> Result<u32> {
    debug_assert!(align.is_power_of_two());
    value
        .checked_add(align - 1)
        .map(|v| v & !(align - 1))
        .ok_or_else(|| {
            Error::new(
                ErrorCategory::Memory,
                codes::ADDRESS_OVERFLOW,
                "Alignment rounding overflowed",
            )
        })
}

/// Whether `ptr` is aligned to `align` (a power of two)
#[must_use]
pub fn is_aligned(ptr: u32, align: u32) -> bool {
    ptr & (align - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(10, 8).unwrap(), 16);
        assert_eq!(align_up(16, 8).unwrap(), 16);
        assert_eq!(align_up(17, 8).unwrap(), 24);
        assert_eq!(align_up(0, 4).unwrap(), 0);
    }

    #[test]
    fn test_align_up_overflow() {
        assert!(align_up(u32::MAX, 8).is_err());
    }

    #[test]
    fn test_is_aligned() {
        assert!(is_aligned(16, 8));
        assert!(!is_aligned(17, 8));
        assert!(is_aligned(0, 1));
    }
}
