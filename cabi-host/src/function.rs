// CABI - cabi-host
// Module: CABI Host Function Wrapper
//
// Copyright (c) 2025 The CABI Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Cloneable host function wrappers.

use cabi_canon::Value;
use cabi_error::Result;

/// A trait for host closures operating on lifted values.
///
/// Exists so boxed functions can be cloned; import tables are cheap to
/// copy between instances that share a host environment.
trait FnWithValues: Send + Sync {
    /// Calls the function with the given lifted arguments.
    fn call(&self, args: &[Value]) -> Result<Option<Value>>;

    /// Clones the function into a `Box`.
    fn clone_box(&self) -> Box<dyn FnWithValues>;
}

impl<F> FnWithValues for F
where
    F: Fn(&[Value]) -> Result<Option<Value>> + Send + Sync + Clone + 'static,
{
    fn call(&self, args: &[Value]) -> Result<Option<Value>> {
        self(args)
    }

    fn clone_box(&self) -> Box<dyn FnWithValues> {
        Box::new(self.clone())
    }
}

/// A host function callable from the guest
///
/// Receives fully lifted, host-owned argument values and returns the value
/// to lower back for the guest (or `None` for a void import).
pub struct HostFunction(Box<dyn FnWithValues>);

impl HostFunction {
    /// Wrap a closure.
    ///
    /// The closure must be `Send`, `Sync`, `Clone`, and `'static`.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Option<Value>> + Send + Sync + Clone + 'static,
    {
        Self(Box::new(f))
    }

    /// Call the wrapped function.
    pub fn call(&self, args: &[Value]) -> Result<Option<Value>> {
        self.0.call(args)
    }
}

impl Clone for HostFunction {
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl core::fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("HostFunction")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_function_call_and_clone() {
        let f = HostFunction::new(|args: &[Value]| Ok(Some(args[0].clone())));
        let f2 = f.clone();

        let args = [Value::from("ping")];
        assert_eq!(f.call(&args).unwrap(), Some(Value::from("ping")));
        assert_eq!(f2.call(&args).unwrap(), Some(Value::from("ping")));
    }

    #[test]
    fn test_void_host_function() {
        let f = HostFunction::new(|_: &[Value]| Ok(None));
        assert_eq!(f.call(&[]).unwrap(), None);
    }
}
