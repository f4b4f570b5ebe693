// CABI - cabi-error
// Module: CABI Error Codes
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Stable error codes, grouped by category range.
//!
//! Memory errors occupy 1000-1099, resource errors 2000-2099, validation
//! errors 3000-3099, type errors 4000-4099, component errors 5000-5099 and
//! runtime errors 6000-6099.

// Memory errors (1000-1099)

/// A read or write fell outside the linear memory view
pub const MEMORY_OUT_OF_BOUNDS: u16 = 1000;
/// Growing linear memory would exceed its configured maximum
pub const MEMORY_GROW_FAILED: u16 = 1001;
/// Pointer/length arithmetic overflowed the address space
pub const ADDRESS_OVERFLOW: u16 = 1002;

// Resource errors (2000-2099)

/// The allocator adapter could not satisfy an allocation request
pub const ALLOCATION_FAILED: u16 = 2000;
/// A deallocation did not match any live allocation triple
pub const DEALLOCATION_MISMATCH: u16 = 2001;
/// A zero-sized allocation was requested
pub const ZERO_SIZE_ALLOCATION: u16 = 2002;

// Validation errors (3000-3099)

/// Lifted string bytes were not valid UTF-8
pub const INVALID_UTF8: u16 = 3000;
/// An alignment was zero or not a power of two
pub const INVALID_ALIGNMENT: u16 = 3001;
/// A descriptor's length exceeds the configured limit
pub const LENGTH_LIMIT_EXCEEDED: u16 = 3002;

// Type errors (4000-4099)

/// A value does not match the declared element type
pub const TYPE_MISMATCH: u16 = 4000;
/// A signature names a type the marshalling layer does not carry
pub const UNSUPPORTED_TYPE: u16 = 4001;

// Component errors (5000-5099)

/// No import is registered under the requested name
pub const IMPORT_NOT_FOUND: u16 = 5000;
/// No export signature is registered under the requested name
pub const EXPORT_NOT_FOUND: u16 = 5001;
/// Declared and registered signatures disagree
pub const SIGNATURE_MISMATCH: u16 = 5002;
/// A flat argument or result vector has the wrong arity
pub const BAD_FLAT_ARITY: u16 = 5003;

// Runtime errors (6000-6099)

/// The call adapter observed a phase transition it does not permit
pub const INVALID_CALL_STATE: u16 = 6000;
