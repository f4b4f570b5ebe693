// CABI - cabi-host
// Module: CABI Host Imports
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Host import infrastructure for the CABI marshalling runtime.
//!
//! When the guest calls out, the lowering/lifting flow reverses: the host
//! receives lifted arguments and returns a value that is lowered back into
//! guest memory for the guest to consume. This crate provides:
//!
//! - [`HostFunction`] — a cloneable, thread-safe wrapper around a host
//!   closure operating on lifted values;
//! - [`ImportTable`] — a static name → (signature, function) mapping,
//!   resolved and signature-checked once at instantiation via
//!   [`ImportTable::link`] rather than on every call;
//! - [`dispatch_import`] — the guest → host call path: lift arguments from
//!   guest memory, invoke the host function, lower its result back through
//!   the guest's allocator (those regions become guest-owned).

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod dispatch;
mod function;
mod table;

pub use dispatch::dispatch_import;
pub use function::HostFunction;
pub use table::ImportTable;
