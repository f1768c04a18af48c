//! External object bridge.
//!
//! An `External` value lets a host expose native state as a scriptable
//! object without going through the arena: the descriptor is host-owned and
//! referenced by `Rc`. A trait object stands in for a C-style callback
//! struct of raw function pointers — the idiomatic Rust rendering of the
//! same narrow contract.

use std::fmt;
use std::rc::Rc;

use crate::error::VmResult;
use crate::value::Value;

bitflags::bitflags! {
    /// Describes how key lookups and calls behave for an external object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExternalFlags: u8 {
        /// Key lookups compare case-sensitively (plain djb hash).
        const OBJECT = 0b001;
        /// Key lookups compare case-insensitively (lower-cased djb hash).
        const CASELESS_OBJECT = 0b010;
        /// The external additionally exposes a callable `method`.
        const METHOD = 0b100;
    }
}

/// The result of a [`ExternalOps::find`] lookup.
pub enum FindResult {
    /// A matching descriptor exists and is itself a value (e.g. a nested
    /// external object) — returned directly without invoking a callback.
    Value(Value),
    /// No embedded value; the caller should use `get`/`set`/`each`.
    NotFound,
}

/// Callbacks a host implements to expose native state as a scriptable
/// object. `get` and `each` return owned [`crate::string_ref::JsString`]
/// values — `Rc` cloning is how refcounting happens here.
pub trait ExternalOps: fmt::Debug {
    fn flags(&self) -> ExternalFlags;

    /// Looks up `key`; `remove` requests deletion semantics.
    fn find(&self, key: &str, remove: bool) -> VmResult<FindResult>;

    fn get(&self, key: &str) -> VmResult<Option<Value>> {
        let _ = key;
        Ok(None)
    }

    fn set(&self, key: &str, value: &Value) -> VmResult<()> {
        let _ = (key, value);
        Ok(())
    }

    /// Enumerates `(key, value)` pairs, e.g. for a `for..in` walk.
    fn each(&self) -> Vec<(String, Value)> {
        Vec::new()
    }

    /// Invokes the external's callable method, if `METHOD` is set.
    fn method(&self, _vm: &mut crate::vm::Vm, _args: &[Value]) -> VmResult<Value> {
        Err(crate::error::VmError::type_error(
            "external object is not callable",
        ))
    }
}

/// A host-registered external object: the `External` value tag's payload.
#[derive(Debug, Clone)]
pub struct ExternalObject {
    pub ops: Rc<dyn ExternalOps>,
}

impl ExternalObject {
    pub fn new(ops: Rc<dyn ExternalOps>) -> Self {
        Self { ops }
    }
}

/// Plain djb2 hash, used for case-sensitive external key lookup.
pub fn djb_hash(s: &str) -> u32 {
    let mut hash: u32 = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b as u32);
    }
    hash
}

/// Lower-case djb2 hash, used for `CASELESS_OBJECT` externals.
pub fn djb_hash_lower(s: &str) -> u32 {
    let mut hash: u32 = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b.to_ascii_lowercase() as u32);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caseless_hash_ignores_case() {
        assert_eq!(djb_hash_lower("Foo"), djb_hash_lower("foo"));
        assert_ne!(djb_hash("Foo"), djb_hash("foo"));
    }
}
