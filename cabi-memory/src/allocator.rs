// CABI - cabi-memory
// Module: CABI Guest Allocator Adapters
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Guest allocator entry points and the leak/accounting probe.

use std::collections::BTreeMap;

use cabi_error::{codes, kinds, Result};

use crate::memory::{CanonicalMemory, PAGE_SIZE};
use crate::region::align_up;

/// The guest-exported allocate/deallocate entry points
///
/// The call adapter obtains and releases every transient marshalling region
/// through this pair; it never writes to guest memory out of band. A free
/// must replay the exact (pointer, size, alignment) triple used at
/// allocation or the adapter's internal bookkeeping is corrupted.
pub trait GuestAllocator {
    /// Allocate `size` bytes at `align`, growing `memory` if needed
    fn allocate<M: CanonicalMemory>(
        &mut self,
        memory: &mut M,
        size: u32,
        align: u32,
    ) -> Result<u32>;

    /// Release `size` bytes at `ptr`, previously allocated at `align`
    fn deallocate<M: CanonicalMemory>(
        &mut self,
        memory: &mut M,
        ptr: u32,
        size: u32,
        align: u32,
    ) -> Result<()>;
}

fn validate_request(size: u32, align: u32) -> Result<()> {
    if align == 0 || !align.is_power_of_two() {
        return Err(kinds::invalid_alignment(
            "Allocation alignment must be a power of two",
        ));
    }
    if size == 0 {
        return Err(cabi_error::Error::new(
            cabi_error::ErrorCategory::Resource,
            codes::ZERO_SIZE_ALLOCATION,
            "Zero-size allocation requested",
        ));
    }
    Ok(())
}

/// Bump allocator over a linear memory view
///
/// Hands out monotonically increasing offsets from a base, growing the
/// memory a page at a time when the high-water mark passes its current
/// size. `deallocate` validates its arguments but does not recycle; the
/// allocate/free symmetry the boundary contract requires is enforced by
/// [`TrackingAllocator`], not by address reuse.
#[derive(Debug, Clone)]
pub struct BumpAllocator {
    next: u32,
}

impl BumpAllocator {
    /// Create an allocator bumping from `base`
    ///
    /// `base` reserves the low span for the guest's static data.
    #[must_use]
    pub const fn new(base: u32) -> Self {
        Self { next: base }
    }

    /// Current high-water mark
    #[must_use]
    pub const fn high_water_mark(&self) -> u32 {
        self.next
    }
}

impl GuestAllocator for BumpAllocator {
    fn allocate<M: CanonicalMemory>(
        &mut self,
        memory: &mut M,
        size: u32,
        align: u32,
    ) -> Result<u32> {
        validate_request(size, align)?;
        let ptr = align_up(self.next, align)?;
        let end = ptr
            .checked_add(size)
            .ok_or(kinds::allocation_failure("Allocation overflows the address space"))?;
        while end > memory.size() {
            let needed = end - memory.size();
            let pages = needed.div_ceil(PAGE_SIZE);
            memory
                .grow(pages)
                .map_err(|_| kinds::allocation_failure("Guest memory exhausted"))?;
        }
        self.next = end;
        log::trace!("bump allocate: {size} bytes at {ptr} (align {align})");
        Ok(ptr)
    }

    fn deallocate<M: CanonicalMemory>(
        &mut self,
        memory: &mut M,
        ptr: u32,
        size: u32,
        align: u32,
    ) -> Result<()> {
        validate_request(size, align)?;
        let end = ptr
            .checked_add(size)
            .ok_or(kinds::bounds_error("Freed region overflows the address space"))?;
        if end > memory.size() {
            return Err(kinds::bounds_error("Freed region outside linear memory"));
        }
        log::trace!("bump deallocate: {size} bytes at {ptr} (align {align})");
        Ok(())
    }
}

/// Running totals maintained by the accounting probe
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AllocationMetrics {
    /// Total allocations performed
    pub total_allocations: u64,
    /// Total deallocations performed
    pub total_deallocations: u64,
    /// Total bytes allocated
    pub total_bytes_allocated: u64,
    /// Total bytes deallocated
    pub total_bytes_deallocated: u64,
    /// Peak bytes outstanding at any point
    pub peak_outstanding: u64,
    /// Allocation requests that failed
    pub failed_allocations: u64,
}

/// Leak/accounting probe: an instrumented allocator adapter
///
/// Wraps any [`GuestAllocator`], recording net bytes outstanding and a
/// per-pointer table of live allocations. A deallocation that does not
/// match a live (pointer, size, alignment) triple bit-exactly is rejected
/// before it reaches the inner allocator. Used by tests to verify the call
/// adapter's allocate/free symmetry; carries no marshalling logic.
#[derive(Debug, Clone)]
pub struct TrackingAllocator<A> {
    inner: A,
    live: BTreeMap<u32, (u32, u32)>,
    outstanding: u64,
    metrics: AllocationMetrics,
}

impl<A: GuestAllocator> TrackingAllocator<A> {
    /// Wrap an allocator with accounting
    #[must_use]
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            live: BTreeMap::new(),
            outstanding: 0,
            metrics: AllocationMetrics::default(),
        }
    }

    /// Net bytes currently outstanding
    #[must_use]
    pub fn allocated_bytes(&self) -> u64 {
        self.outstanding
    }

    /// Number of live allocations
    #[must_use]
    pub fn live_allocations(&self) -> usize {
        self.live.len()
    }

    /// Allocation metrics accumulated since construction
    #[must_use]
    pub fn metrics(&self) -> &AllocationMetrics {
        &self.metrics
    }
}

impl<A: GuestAllocator> GuestAllocator for TrackingAllocator<A> {
    fn allocate<M: CanonicalMemory>(
        &mut self,
        memory: &mut M,
        size: u32,
        align: u32,
    ) -> Result<u32> {
        let ptr = match self.inner.allocate(memory, size, align) {
            Ok(ptr) => ptr,
            Err(err) => {
                self.metrics.failed_allocations += 1;
                return Err(err);
            }
        };
        self.live.insert(ptr, (size, align));
        self.outstanding += u64::from(size);
        self.metrics.total_allocations += 1;
        self.metrics.total_bytes_allocated += u64::from(size);
        self.metrics.peak_outstanding = self.metrics.peak_outstanding.max(self.outstanding);
        Ok(ptr)
    }

    fn deallocate<M: CanonicalMemory>(
        &mut self,
        memory: &mut M,
        ptr: u32,
        size: u32,
        align: u32,
    ) -> Result<()> {
        match self.live.get(&ptr) {
            Some(&(live_size, live_align)) if live_size == size && live_align == align => {}
            Some(_) => {
                return Err(kinds::deallocation_mismatch(
                    "Free does not replay the allocation's size/alignment",
                ));
            }
            None => {
                return Err(kinds::deallocation_mismatch(
                    "Free of a pointer with no live allocation",
                ));
            }
        }
        self.inner.deallocate(memory, ptr, size, align)?;
        self.live.remove(&ptr);
        self.outstanding -= u64::from(size);
        self.metrics.total_deallocations += 1;
        self.metrics.total_bytes_deallocated += u64::from(size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::LinearMemory;

    #[test]
    fn test_bump_allocation_is_aligned() {
        let mut memory = LinearMemory::new(1);
        let mut alloc = BumpAllocator::new(16);

        let a = alloc.allocate(&mut memory, 3, 1).unwrap();
        let b = alloc.allocate(&mut memory, 8, 8).unwrap();
        assert_eq!(a, 16);
        assert_eq!(b % 8, 0);
        assert!(b >= a + 3);
    }

    #[test]
    fn test_bump_grows_memory() {
        let mut memory = LinearMemory::new(1);
        let mut alloc = BumpAllocator::new(0);

        let ptr = alloc.allocate(&mut memory, PAGE_SIZE + 100, 4).unwrap();
        assert_eq!(ptr, 0);
        assert!(memory.size() >= PAGE_SIZE + 100);
    }

    #[test]
    fn test_bump_respects_memory_maximum() {
        let mut memory = LinearMemory::with_maximum(1, 1);
        let mut alloc = BumpAllocator::new(0);

        let err = alloc.allocate(&mut memory, PAGE_SIZE + 1, 4).unwrap_err();
        assert_eq!(err.code, codes::ALLOCATION_FAILED);
    }

    #[test]
    fn test_invalid_alignment_rejected() {
        let mut memory = LinearMemory::new(1);
        let mut alloc = BumpAllocator::new(0);

        assert!(alloc.allocate(&mut memory, 8, 3).is_err());
        assert!(alloc.allocate(&mut memory, 8, 0).is_err());
    }

    #[test]
    fn test_zero_size_rejected() {
        let mut memory = LinearMemory::new(1);
        let mut alloc = BumpAllocator::new(0);

        let err = alloc.allocate(&mut memory, 0, 4).unwrap_err();
        assert_eq!(err.code, codes::ZERO_SIZE_ALLOCATION);
    }

    #[test]
    fn test_tracking_outstanding_bytes() {
        let mut memory = LinearMemory::new(1);
        let mut alloc = TrackingAllocator::new(BumpAllocator::new(0));

        let a = alloc.allocate(&mut memory, 64, 8).unwrap();
        let b = alloc.allocate(&mut memory, 16, 4).unwrap();
        assert_eq!(alloc.allocated_bytes(), 80);
        assert_eq!(alloc.live_allocations(), 2);

        alloc.deallocate(&mut memory, a, 64, 8).unwrap();
        assert_eq!(alloc.allocated_bytes(), 16);
        alloc.deallocate(&mut memory, b, 16, 4).unwrap();
        assert_eq!(alloc.allocated_bytes(), 0);
        assert_eq!(alloc.live_allocations(), 0);

        let metrics = alloc.metrics();
        assert_eq!(metrics.total_allocations, 2);
        assert_eq!(metrics.total_deallocations, 2);
        assert_eq!(metrics.total_bytes_allocated, 80);
        assert_eq!(metrics.total_bytes_deallocated, 80);
        assert_eq!(metrics.peak_outstanding, 80);
    }

    #[test]
    fn test_tracking_rejects_mismatched_free() {
        let mut memory = LinearMemory::new(1);
        let mut alloc = TrackingAllocator::new(BumpAllocator::new(0));

        let ptr = alloc.allocate(&mut memory, 64, 8).unwrap();

        let err = alloc.deallocate(&mut memory, ptr, 32, 8).unwrap_err();
        assert_eq!(err.code, codes::DEALLOCATION_MISMATCH);
        let err = alloc.deallocate(&mut memory, ptr, 64, 4).unwrap_err();
        assert_eq!(err.code, codes::DEALLOCATION_MISMATCH);
        let err = alloc.deallocate(&mut memory, ptr + 1, 64, 8).unwrap_err();
        assert_eq!(err.code, codes::DEALLOCATION_MISMATCH);

        // The exact triple still frees cleanly.
        alloc.deallocate(&mut memory, ptr, 64, 8).unwrap();
        assert_eq!(alloc.allocated_bytes(), 0);
    }

    #[test]
    fn test_tracking_counts_failed_allocations() {
        let mut memory = LinearMemory::with_maximum(1, 1);
        let mut alloc = TrackingAllocator::new(BumpAllocator::new(0));

        assert!(alloc.allocate(&mut memory, PAGE_SIZE * 2, 4).is_err());
        assert_eq!(alloc.metrics().failed_allocations, 1);
        assert_eq!(alloc.allocated_bytes(), 0);
    }
}
