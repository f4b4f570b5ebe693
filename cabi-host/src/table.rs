// CABI - cabi-host
// Module: CABI Import Table
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The static import mapping.

use std::collections::BTreeMap;

use cabi_canon::FuncSig;
use cabi_error::{kinds, Result};

use crate::function::HostFunction;

/// Name → (signature, function) mapping for host imports
///
/// Built once by the harness and validated against the guest's expected
/// import set at instantiation time ([`ImportTable::link`]); per-call
/// lookups then cannot fail on shape, only on name.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    funcs: BTreeMap<String, (FuncSig, HostFunction)>,
}

impl ImportTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host function under `name`
    ///
    /// The signature may name only list/string types; duplicate names are
    /// rejected.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        sig: FuncSig,
        func: HostFunction,
    ) -> Result<()> {
        sig.validate()?;
        let name = name.into();
        if self.funcs.contains_key(&name) {
            return Err(kinds::signature_mismatch("Import registered twice"));
        }
        self.funcs.insert(name, (sig, func));
        Ok(())
    }

    /// Look up an import by name
    pub fn lookup(&self, name: &str) -> Result<(&FuncSig, &HostFunction)> {
        self.funcs
            .get(name)
            .map(|(sig, func)| (sig, func))
            .ok_or(kinds::import_not_found("No import registered under this name"))
    }

    /// Validate this table against a guest's expected import set
    ///
    /// Called once at instantiation. Every expected name must be present
    /// with an identical signature; extra registered imports are permitted.
    pub fn link(&self, expected: &[(&str, FuncSig)]) -> Result<()> {
        for (name, declared) in expected {
            let (sig, _) = self.lookup(name)?;
            sig.check_matches(declared)?;
        }
        Ok(())
    }

    /// Number of registered imports
    #[must_use]
    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}
