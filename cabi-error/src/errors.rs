// CABI - cabi-error
// Module: CABI Error Types
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

use core::fmt;

/// `Error` categories for CABI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// Linear-memory access errors
    Memory = 1,
    /// Allocator adapter errors
    Resource = 2,
    /// Boundary-contract validation errors
    Validation = 3,
    /// Host-value type errors
    Type = 4,
    /// Import/export resolution errors
    Component = 5,
    /// Call-adapter runtime errors
    Runtime = 6,
}

/// CABI `Error` type
///
/// Categorized error with a stable code and a static message. Kept `Copy`
/// and allocation-free so it can be constructed on any failure path,
/// including allocator exhaustion.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Error {
    /// `Error` category
    pub category: ErrorCategory,
    /// `Error` code
    pub code: u16,
    /// `Error` message
    pub message: &'static str,
}

impl Error {
    /// Create a new error.
    #[must_use]
    pub const fn new(category: ErrorCategory, code: u16, message: &'static str) -> Self {
        Self {
            category,
            code,
            message,
        }
    }

    /// Get the error category
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Get the error code
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Get the error message
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}:{}] {}", self.category, self.code, self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;

    #[test]
    fn test_error_display() {
        let err = Error::new(
            ErrorCategory::Memory,
            codes::MEMORY_OUT_OF_BOUNDS,
            "Memory read out of bounds",
        );
        let rendered = format!("{err}");
        assert!(rendered.contains("Memory"));
        assert!(rendered.contains("1000"));
        assert!(rendered.contains("out of bounds"));
    }

    #[test]
    fn test_error_accessors() {
        let err = Error::new(
            ErrorCategory::Validation,
            codes::INVALID_UTF8,
            "Invalid UTF-8 string",
        );
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.code(), codes::INVALID_UTF8);
        assert_eq!(err.message(), "Invalid UTF-8 string");
    }
}
