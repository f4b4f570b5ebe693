// CABI - cabi-canon
// Module: CABI Canonical Marshalling
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Canonical ABI list/string marshalling between a guest module's linear
//! memory and host-native values.
//!
//! The canonical ABI stores a list or string as a (pointer, length)
//! descriptor pair whose storage lives inside the guest's linear memory.
//! This crate provides both directions of the boundary crossing:
//!
//! - [`LoweringEngine`] writes a host value into guest memory through the
//!   guest's exported allocator, producing a descriptor and remembering
//!   every region it allocated.
//! - [`LiftingEngine`] reads a descriptor back into a fully host-owned
//!   value, validating bounds and UTF-8 on the way.
//! - [`CallAdapter`] wraps guest exports in the per-call state machine
//!   `Idle → LoweringArgs → Invoking → LiftingResult → Freeing → Idle`,
//!   guaranteeing that every transient region is freed with the exact
//!   allocation triple once both sides are done with it.
//!
//! The guest itself is opaque: the module loader hands the adapter an
//! object implementing [`GuestInstance`], which exposes the linear memory,
//! the allocator entry points and export invocation. Nothing here
//! instantiates modules.
//!
//! Fixed-width elements are encoded little-endian at their natural size and
//! alignment; strings are unterminated UTF-8 byte runs; nested lists are
//! arrays of 8-byte descriptor pairs referring to independently allocated
//! child regions. Zero-length values never allocate and never dereference
//! their sentinel pointer.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod call;
mod guest;
mod lift;
mod lower;
mod types;

pub use call::{CallAdapter, CallState};
pub use guest::GuestInstance;
pub use lift::{collect_value_regions, LiftingEngine};
pub use lower::LoweringEngine;
pub use types::{Descriptor, ElemType, FuncSig, Value, MAX_LIST_ELEMENTS, MAX_STRING_BYTES};
