// CABI - cabi-canon
// Module: CABI Call Adapter
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The per-call state machine wrapping guest exports.

use std::collections::BTreeMap;

use cabi_error::{codes, kinds, Error, ErrorCategory, Result};
use cabi_memory::{GuestAllocator, GuestRegion};

use crate::guest::GuestInstance;
use crate::lift::{collect_value_regions, LiftingEngine};
use crate::lower::LoweringEngine;
use crate::types::{Descriptor, FuncSig, Value};

/// Phases of a boundary-crossing call
///
/// Every call runs `Idle → LoweringArgs → Invoking → LiftingResult →
/// Freeing → Idle` to completion before the next call may begin; there are
/// no overlapping in-flight regions for a given memory view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// No call in progress
    Idle,
    /// Arguments are being lowered into guest memory
    LoweringArgs,
    /// Control is with the callee
    Invoking,
    /// The callee's results are being lifted out
    LiftingResult,
    /// Transient regions are being returned to the allocator
    Freeing,
}

/// Wraps a guest instance's exports in lower → invoke → lift → free calls
///
/// Constructed with the export signature set, validated up front so only
/// list/string types appear. The adapter is the only actor that allocates
/// or frees in the guest's memory from outside, and it does so exclusively
/// through the allocator entry points: every region it allocates while
/// lowering arguments is freed with the exact allocation triple once the
/// call completes, and every region the guest lowered for its result is
/// released after lifting. A failed call still frees whatever had been
/// allocated before the failure, so a leak never masks the real error.
#[derive(Debug)]
pub struct CallAdapter<G> {
    guest: G,
    exports: BTreeMap<String, FuncSig>,
    state: CallState,
}

impl<G: GuestInstance> CallAdapter<G> {
    /// Wrap `guest`, declaring its exports
    pub fn new(guest: G, exports: impl IntoIterator<Item = (String, FuncSig)>) -> Result<Self> {
        let exports: BTreeMap<String, FuncSig> = exports.into_iter().collect();
        for sig in exports.values() {
            sig.validate()?;
        }
        Ok(Self {
            guest,
            exports,
            state: CallState::Idle,
        })
    }

    /// Current phase of the state machine
    #[must_use]
    pub fn state(&self) -> CallState {
        self.state
    }

    /// Borrow the wrapped guest
    #[must_use]
    pub fn guest(&self) -> &G {
        &self.guest
    }

    /// Mutably borrow the wrapped guest
    pub fn guest_mut(&mut self) -> &mut G {
        &mut self.guest
    }

    /// Net bytes outstanding in the guest's allocator
    #[must_use]
    pub fn allocated_bytes(&self) -> u64 {
        self.guest.allocated_bytes()
    }

    /// Call the export `name` with `args`, returning its lifted result
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        if self.state != CallState::Idle {
            return Err(kinds::invalid_call_state("A call is already in progress"));
        }
        let sig = self
            .exports
            .get(name)
            .cloned()
            .ok_or(kinds::export_not_found("No such export"))?;
        if args.len() != sig.params.len() {
            return Err(kinds::signature_mismatch(
                "Argument count does not match the export signature",
            ));
        }
        let result = self.run_call(name, &sig, args);
        self.state = CallState::Idle;
        result
    }

    fn run_call(&mut self, name: &str, sig: &FuncSig, args: &[Value]) -> Result<Option<Value>> {
        self.state = CallState::LoweringArgs;
        log::debug!("call {name}: lowering {} argument(s)", args.len());

        let (memory, allocator) = self.guest.memory_and_allocator();
        let mut engine = LoweringEngine::new(memory, allocator);
        let mut flat = Vec::with_capacity(sig.flat_param_arity());
        for (value, ty) in args.iter().zip(&sig.params) {
            match engine.lower(value, ty) {
                Ok(desc) => {
                    flat.push(desc.ptr);
                    flat.push(desc.len);
                }
                Err(err) => {
                    // Never partially apply a lowering: drop what was
                    // already placed before surfacing the error.
                    let owned = engine.into_owned_regions();
                    self.free_best_effort(&owned);
                    return Err(err);
                }
            }
        }
        let owned = engine.into_owned_regions();

        self.state = CallState::Invoking;
        let flat_result = match self.guest.invoke_export(name, &flat) {
            Ok(flat_result) => flat_result,
            Err(err) => {
                self.free_best_effort(&owned);
                return Err(err);
            }
        };

        self.state = CallState::LiftingResult;
        let lifted = match self.lift_result(sig, &flat_result) {
            Ok(lifted) => lifted,
            Err(err) => {
                self.free_best_effort(&owned);
                return Err(err);
            }
        };

        self.state = CallState::Freeing;
        log::trace!("call {name}: freeing {} argument region(s)", owned.len());
        self.free_regions(&owned)?;
        if let (Some(ret_ty), Some((desc, _))) = (&sig.result, &lifted) {
            let mut result_regions = Vec::new();
            collect_value_regions(self.guest.memory(), *desc, ret_ty, &mut result_regions)?;
            self.free_regions(&result_regions)?;
        }

        Ok(lifted.map(|(_, value)| value))
    }

    fn lift_result(
        &self,
        sig: &FuncSig,
        flat_result: &[u32],
    ) -> Result<Option<(Descriptor, Value)>> {
        match &sig.result {
            Some(ret_ty) => {
                if flat_result.len() != sig.flat_result_arity() {
                    return Err(Error::new(
                        ErrorCategory::Component,
                        codes::BAD_FLAT_ARITY,
                        "Export returned the wrong number of flat results",
                    ));
                }
                let desc = Descriptor::new(flat_result[0], flat_result[1]);
                let value = LiftingEngine::new(self.guest.memory()).lift(desc, ret_ty)?;
                Ok(Some((desc, value)))
            }
            None => {
                if !flat_result.is_empty() {
                    return Err(Error::new(
                        ErrorCategory::Component,
                        codes::BAD_FLAT_ARITY,
                        "Export returned results but its signature has none",
                    ));
                }
                Ok(None)
            }
        }
    }

    fn free_regions(&mut self, regions: &[GuestRegion]) -> Result<()> {
        let (memory, allocator) = self.guest.memory_and_allocator();
        for region in regions {
            allocator.deallocate(memory, region.ptr, region.len, region.align)?;
        }
        Ok(())
    }

    // Freeing on a failure path must not mask the original error.
    fn free_best_effort(&mut self, regions: &[GuestRegion]) {
        let (memory, allocator) = self.guest.memory_and_allocator();
        for region in regions {
            if let Err(err) = allocator.deallocate(memory, region.ptr, region.len, region.align) {
                log::debug!("freeing after a failed call also failed: {err}");
            }
        }
    }
}
