// CABI - cabi-canon
// Module: CABI Guest Instance Contract
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The contract an instantiated guest module presents to the call adapter.

use cabi_error::Result;
use cabi_memory::{CanonicalMemory, GuestAllocator};

/// An instantiated guest module, as produced by an external loader
///
/// The marshalling core never instantiates or resolves modules itself; the
/// loader hands it an object exposing exactly what the boundary contract
/// needs: the raw linear memory view, the guest's exported allocator entry
/// points, and export invocation over flat u32 arguments (a pointer slot
/// and a length slot per list or string value).
///
/// Each instance owns its memory and allocator state outright; nothing is
/// shared between instances.
pub trait GuestInstance {
    /// The instance's linear memory view
    type Memory: CanonicalMemory;
    /// The instance's exported allocator
    type Allocator: GuestAllocator;

    /// Borrow the linear memory for reading
    fn memory(&self) -> &Self::Memory;

    /// Borrow the memory and allocator together for lowering and freeing
    fn memory_and_allocator(&mut self) -> (&mut Self::Memory, &mut Self::Allocator);

    /// Invoke an export with flat descriptor arguments
    fn invoke_export(&mut self, name: &str, args: &[u32]) -> Result<Vec<u32>>;

    /// Net bytes currently outstanding in the instance's allocator
    ///
    /// The verification surface for allocate/free symmetry. Instances
    /// without an instrumented allocator may report 0.
    fn allocated_bytes(&self) -> u64;
}
