// CABI - cabi-error
// Module: CABI Error Kinds
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Helper constructors for the errors the marshalling layer raises.

use crate::{codes, Error, ErrorCategory};

/// A descriptor's pointer+length falls outside the linear memory view.
#[must_use]
pub const fn bounds_error(message: &'static str) -> Error {
    Error::new(ErrorCategory::Memory, codes::MEMORY_OUT_OF_BOUNDS, message)
}

/// The allocator adapter could not satisfy a byte/alignment request.
#[must_use]
pub const fn allocation_failure(message: &'static str) -> Error {
    Error::new(ErrorCategory::Resource, codes::ALLOCATION_FAILED, message)
}

/// A free did not replay the exact (pointer, length, alignment) triple.
#[must_use]
pub const fn deallocation_mismatch(message: &'static str) -> Error {
    Error::new(
        ErrorCategory::Resource,
        codes::DEALLOCATION_MISMATCH,
        message,
    )
}

/// Lifted string bytes were not valid UTF-8.
#[must_use]
pub const fn invalid_utf8(message: &'static str) -> Error {
    Error::new(ErrorCategory::Validation, codes::INVALID_UTF8, message)
}

/// An alignment was zero or not a power of two.
#[must_use]
pub const fn invalid_alignment(message: &'static str) -> Error {
    Error::new(ErrorCategory::Validation, codes::INVALID_ALIGNMENT, message)
}

/// A host value does not match the declared element type.
#[must_use]
pub const fn type_mismatch(message: &'static str) -> Error {
    Error::new(ErrorCategory::Type, codes::TYPE_MISMATCH, message)
}

/// No import is registered under the requested name.
#[must_use]
pub const fn import_not_found(message: &'static str) -> Error {
    Error::new(ErrorCategory::Component, codes::IMPORT_NOT_FOUND, message)
}

/// No export signature is registered under the requested name.
#[must_use]
pub const fn export_not_found(message: &'static str) -> Error {
    Error::new(ErrorCategory::Component, codes::EXPORT_NOT_FOUND, message)
}

/// Declared and registered signatures disagree.
#[must_use]
pub const fn signature_mismatch(message: &'static str) -> Error {
    Error::new(ErrorCategory::Component, codes::SIGNATURE_MISMATCH, message)
}

/// The call adapter observed a phase transition it does not permit.
#[must_use]
pub const fn invalid_call_state(message: &'static str) -> Error {
    Error::new(ErrorCategory::Runtime, codes::INVALID_CALL_STATE, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_constructors() {
        assert_eq!(bounds_error("x").category, ErrorCategory::Memory);
        assert_eq!(allocation_failure("x").code, codes::ALLOCATION_FAILED);
        assert_eq!(invalid_utf8("x").category, ErrorCategory::Validation);
        assert_eq!(type_mismatch("x").code, codes::TYPE_MISMATCH);
        assert_eq!(invalid_call_state("x").category, ErrorCategory::Runtime);
    }
}
