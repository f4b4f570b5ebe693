// CABI - cabi-canon
// Module: CABI Value and Type Model
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Element types, host values and export/import signatures.

use cabi_error::{codes, kinds, Error, ErrorCategory, Result};

/// Maximum string length accepted on lift or lower (4 MiB)
pub const MAX_STRING_BYTES: u32 = 4 * 1024 * 1024;

/// Maximum list element count accepted on lift or lower
pub const MAX_LIST_ELEMENTS: u32 = 1024 * 1024;

/// Element types carried by the list/string marshalling layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElemType {
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer
    U16,
    /// Unsigned 32-bit integer
    U32,
    /// Unsigned 64-bit integer
    U64,
    /// Signed 8-bit integer
    S8,
    /// Signed 16-bit integer
    S16,
    /// Signed 32-bit integer
    S32,
    /// Signed 64-bit integer
    S64,
    /// IEEE-754 32-bit float
    F32,
    /// IEEE-754 64-bit float
    F64,
    /// UTF-8 string
    Str,
    /// List with a single element type
    List(Box<ElemType>),
}

impl ElemType {
    /// Size in bytes of one element in guest memory
    ///
    /// Strings and lists occupy an 8-byte (ptr, len) descriptor pair when
    /// they appear as elements of an outer list.
    #[must_use]
    pub fn byte_size(&self) -> u32 {
        match self {
            Self::U8 | Self::S8 => 1,
            Self::U16 | Self::S16 => 2,
            Self::U32 | Self::S32 | Self::F32 => 4,
            Self::U64 | Self::S64 | Self::F64 => 8,
            Self::Str | Self::List(_) => 8,
        }
    }

    /// Alignment of one element in guest memory
    #[must_use]
    pub fn align(&self) -> u32 {
        match self {
            Self::U8 | Self::S8 => 1,
            Self::U16 | Self::S16 => 2,
            Self::U32 | Self::S32 | Self::F32 => 4,
            Self::U64 | Self::S64 | Self::F64 => 8,
            Self::Str | Self::List(_) => 4,
        }
    }

    /// Alignment of the payload buffer this type's descriptor points at
    ///
    /// For a string that is the byte run (1); for a list it is the element
    /// alignment. Doubles as the sentinel pointer for zero-length values.
    #[must_use]
    pub fn payload_align(&self) -> u32 {
        match self {
            Self::Str => 1,
            Self::List(elem) => elem.align(),
            _ => self.align(),
        }
    }

    /// Whether elements of this type have a fixed-size guest encoding
    #[must_use]
    pub fn is_fixed_size(&self) -> bool {
        !matches!(self, Self::Str | Self::List(_))
    }

    /// Whether this type crosses the boundary as a descriptor
    #[must_use]
    pub fn is_marshalled(&self) -> bool {
        matches!(self, Self::Str | Self::List(_))
    }
}

/// A host-native value crossing the boundary
///
/// Numeric variants carry exact native widths; 64-bit integers never route
/// through floating point, so the extremes survive both directions.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unsigned 8-bit integer
    U8(u8),
    /// Unsigned 16-bit integer
    U16(u16),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Unsigned 64-bit integer
    U64(u64),
    /// Signed 8-bit integer
    S8(i8),
    /// Signed 16-bit integer
    S16(i16),
    /// Signed 32-bit integer
    S32(i32),
    /// Signed 64-bit integer
    S64(i64),
    /// IEEE-754 32-bit float
    F32(f32),
    /// IEEE-754 64-bit float
    F64(f64),
    /// UTF-8 string
    Str(String),
    /// Homogeneous list
    List(Vec<Value>),
}

impl Value {
    /// Build a byte list from a slice
    #[must_use]
    pub fn bytes(data: &[u8]) -> Self {
        Self::List(data.iter().copied().map(Value::U8).collect())
    }

    /// Build a string list from string slices
    #[must_use]
    pub fn strings(items: &[&str]) -> Self {
        Self::List(items.iter().map(|s| Value::Str((*s).to_string())).collect())
    }

    /// Borrow the string payload, if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the list payload, if this is a list
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this value inhabits `ty`, recursively
    #[must_use]
    pub fn matches_type(&self, ty: &ElemType) -> bool {
        match (self, ty) {
            (Self::U8(_), ElemType::U8)
            | (Self::U16(_), ElemType::U16)
            | (Self::U32(_), ElemType::U32)
            | (Self::U64(_), ElemType::U64)
            | (Self::S8(_), ElemType::S8)
            | (Self::S16(_), ElemType::S16)
            | (Self::S32(_), ElemType::S32)
            | (Self::S64(_), ElemType::S64)
            | (Self::F32(_), ElemType::F32)
            | (Self::F64(_), ElemType::F64)
            | (Self::Str(_), ElemType::Str) => true,
            (Self::List(items), ElemType::List(elem)) => {
                items.iter().all(|item| item.matches_type(elem))
            }
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// A (pointer, length) descriptor pair as it crosses the boundary
///
/// `len` counts elements for lists and bytes for strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Pointer into linear memory (a sentinel when `len` is zero)
    pub ptr: u32,
    /// Logical length
    pub len: u32,
}

impl Descriptor {
    /// Create a descriptor
    #[must_use]
    pub const fn new(ptr: u32, len: u32) -> Self {
        Self { ptr, len }
    }
}

/// Signature of an export or import carrying list/string values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncSig {
    /// Parameter types, in call order
    pub params: Vec<ElemType>,
    /// Result type, if any
    pub result: Option<ElemType>,
}

impl FuncSig {
    /// Create a signature
    #[must_use]
    pub fn new(params: Vec<ElemType>, result: Option<ElemType>) -> Self {
        Self { params, result }
    }

    /// Number of flat u32 slots the parameters occupy (two per value)
    #[must_use]
    pub fn flat_param_arity(&self) -> usize {
        self.params.len() * 2
    }

    /// Number of flat u32 slots the result occupies
    #[must_use]
    pub fn flat_result_arity(&self) -> usize {
        if self.result.is_some() {
            2
        } else {
            0
        }
    }

    /// Reject signatures naming types this layer does not marshal
    ///
    /// Only lists and strings cross through the adapter; bare scalars
    /// belong to the core value ABI, which is out of scope here.
    pub fn validate(&self) -> Result<()> {
        let supported = self
            .params
            .iter()
            .chain(self.result.as_ref())
            .all(ElemType::is_marshalled);
        if supported {
            Ok(())
        } else {
            Err(Error::new(
                ErrorCategory::Type,
                codes::UNSUPPORTED_TYPE,
                "Signature names a non-list, non-string type",
            ))
        }
    }

    /// Check a declared signature against this one
    pub fn check_matches(&self, declared: &FuncSig) -> Result<()> {
        if self == declared {
            Ok(())
        } else {
            Err(kinds::signature_mismatch(
                "Declared and registered signatures disagree",
            ))
        }
    }
}
