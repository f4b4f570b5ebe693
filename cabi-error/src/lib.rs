// CABI - cabi-error
// Module: CABI Error Handling
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Error handling for the CABI marshalling runtime.
//!
//! Errors are categorized and carry a stable `u16` code plus a static
//! message. Categories map onto the boundary-contract taxonomy:
//!
//! - `Memory` — a descriptor's pointer/length falls outside the current
//!   linear memory view (bounds violations).
//! - `Resource` — the allocator adapter could not satisfy a request.
//! - `Validation` — malformed data crossing the boundary (invalid UTF-8,
//!   bad alignment, descriptor corruption).
//! - `Type` — a host value does not match the declared element type.
//! - `Component` — import/export resolution and signature failures.
//! - `Runtime` — call-adapter state machine violations.
//!
//! ```
//! use cabi_error::{codes, Error, ErrorCategory};
//!
//! let err = Error::new(
//!     ErrorCategory::Memory,
//!     codes::MEMORY_OUT_OF_BOUNDS,
//!     "Memory read out of bounds",
//! );
//! assert_eq!(err.category, ErrorCategory::Memory);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Error codes for CABI operations
pub mod codes;
/// Error and error-category types
pub mod errors;
/// Helper constructors for common errors
pub mod kinds;

pub use errors::{Error, ErrorCategory};

/// A specialized `Result` type for CABI operations.
pub type Result<T> = core::result::Result<T, Error>;
