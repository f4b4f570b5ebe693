// CABI - cabi-host
// Module: CABI Guest-to-Host Dispatch
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The reverse marshalling direction: guest calling host.

use cabi_canon::{Descriptor, LiftingEngine, LoweringEngine, Value};
use cabi_error::{codes, Error, ErrorCategory, Result};
use cabi_memory::{CanonicalMemory, GuestAllocator};

use crate::table::ImportTable;

/// Handle an import call arriving from the guest
///
/// Lifts the flat descriptor arguments out of guest memory, invokes the
/// registered host function with host-owned values, lowers its result back
/// into guest memory through the guest's own allocator, and returns the
/// flat result descriptors. Regions lowered here are handed to the guest,
/// which frees them once it has copied the result out; they are not the
/// host's to release.
pub fn dispatch_import<M: CanonicalMemory, A: GuestAllocator>(
    table: &ImportTable,
    memory: &mut M,
    allocator: &mut A,
    name: &str,
    flat_args: &[u32],
) -> Result<Vec<u32>> {
    let (sig, func) = table.lookup(name)?;
    if flat_args.len() != sig.flat_param_arity() {
        return Err(Error::new(
            ErrorCategory::Component,
            codes::BAD_FLAT_ARITY,
            "Import called with the wrong number of flat arguments",
        ));
    }
    log::debug!("import {name}: lifting {} argument(s)", sig.params.len());

    let mut args = Vec::with_capacity(sig.params.len());
    {
        let lifter = LiftingEngine::new(&*memory);
        for (i, ty) in sig.params.iter().enumerate() {
            let desc = Descriptor::new(flat_args[i * 2], flat_args[i * 2 + 1]);
            args.push(lifter.lift(desc, ty)?);
        }
    }

    let result = func.call(&args)?;

    match (&sig.result, result) {
        (Some(ret_ty), Some(value)) => {
            let mut engine = LoweringEngine::new(&mut *memory, &mut *allocator);
            match engine.lower(&value, ret_ty) {
                Ok(desc) => Ok(vec![desc.ptr, desc.len]),
                Err(err) => {
                    // A partially lowered result is never handed to the
                    // guest; return its regions before surfacing the error.
                    let owned = engine.into_owned_regions();
                    for region in &owned {
                        if let Err(free_err) =
                            allocator.deallocate(memory, region.ptr, region.len, region.align)
                        {
                            log::debug!(
                                "freeing after a failed result lowering also failed: {free_err}"
                            );
                        }
                    }
                    Err(err)
                }
            }
        }
        (None, None) => Ok(Vec::new()),
        (Some(_), None) => Err(Error::new(
            ErrorCategory::Component,
            codes::SIGNATURE_MISMATCH,
            "Host function returned nothing but its signature has a result",
        )),
        (None, Some(_)) => Err(Error::new(
            ErrorCategory::Component,
            codes::SIGNATURE_MISMATCH,
            "Host function returned a value but its signature has none",
        )),
    }
}
