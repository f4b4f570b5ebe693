// CABI - cabi-memory
// Module: CABI Linear Memory and Allocators
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Linear memory view and guest allocator adapters for the CABI
//! marshalling runtime.
//!
//! This crate provides the storage side of the boundary contract:
//!
//! - [`CanonicalMemory`] — bounds-checked byte access to a guest's linear
//!   memory, with little-endian accessors for the fixed-width codecs.
//! - [`LinearMemory`] — a resizable, page-granular memory view owned by a
//!   guest instance.
//! - [`GuestRegion`] — a (pointer, byte-length, alignment) span; the exact
//!   triple used at allocation must be replayed when freeing.
//! - [`GuestAllocator`] — the guest-exported allocate/deallocate entry
//!   points the call adapter routes every region through.
//! - [`TrackingAllocator`] — the leak/accounting probe: wraps any allocator
//!   and records net bytes outstanding plus allocation metrics.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod allocator;
mod memory;
mod region;

pub use allocator::{AllocationMetrics, BumpAllocator, GuestAllocator, TrackingAllocator};
pub use memory::{CanonicalMemory, LinearMemory, MAX_PAGES, PAGE_SIZE};
pub use region::{align_up, is_aligned, GuestRegion};
