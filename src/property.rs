//! The unified get/set/in/delete/enumerate protocol across every receiver
//! kind: primitives, strings, arrays, generic objects/functions/regexps,
//! and host-provided external objects.
//!
//! Receivers that hold a heap record walk own table → shared table → proto,
//! repeating at each link. GET additionally clones a `Method` hit found on a
//! prototype's shared table into the receiver's own table (copy-on-first-
//! access), so later writes to that method (e.g. attaching a property to it)
//! are per-instance rather than shared.

use crate::arena::HeapRecord;
use crate::error::{VmError, VmResult};
use crate::external::{ExternalObject, FindResult};
use crate::object::{Attributes, PropertyKind, PropertyRecord};
use crate::string_ref::JsString;
use crate::value::{ObjectId, Value};
use crate::vm::Vm;

/// A property name, pre-classified as an array index when its string form
/// round-trips exactly (so `"01"` is a name, not index 1).
#[derive(Debug, Clone)]
pub struct PropertyKey {
    name: JsString,
    index: Option<u32>,
}

impl PropertyKey {
    pub fn new(name: JsString) -> Self {
        let index = array_index_of(&name);
        Self { name, index }
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::new(s.clone()),
            Value::Number(n) => Self::new(JsString::from_owned(format_number_key(*n))),
            _ => Self::new(JsString::from_owned(value.type_of())),
        }
    }

    pub fn name(&self) -> &JsString {
        &self.name
    }

    pub fn as_index(&self) -> Option<u32> {
        self.index
    }
}

fn format_number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn array_index_of(name: &JsString) -> Option<u32> {
    let s = name.as_str_lossy();
    if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
        return None;
    }
    let n: u32 = s.parse().ok()?;
    Some(n)
}

const LENGTH: &str = "length";

/// GET: read `key` off `receiver`.
pub fn get(vm: &mut Vm, receiver: &Value, key: &PropertyKey) -> VmResult<Value> {
    match receiver {
        Value::Null | Value::Undefined | Value::Invalid => Err(VmError::type_error(
            "cannot read property of null or undefined",
        )),
        Value::Boolean(_) => read_only_chain(vm, Some(vm.prototypes.boolean), key),
        Value::Number(_) => read_only_chain(vm, Some(vm.prototypes.number), key),
        Value::String(s) => {
            if let Some(idx) = key.as_index() {
                return Ok(s.char_at(idx).map(Value::String).unwrap_or(Value::Undefined));
            }
            if key.name().as_bytes() == LENGTH.as_bytes() {
                return Ok(Value::Number(s.char_len() as f64));
            }
            read_only_chain(vm, Some(vm.prototypes.string), key)
        }
        Value::Array(id) => array_get(vm, *id, key),
        Value::Object(id) | Value::Function(id) | Value::RegExp(id) | Value::NativeFunction(id) => {
            object_get(vm, *id, key)
        }
        Value::External(ext) => external_get(ext, key),
    }
}

/// SET: write `value` at `key` on `receiver`.
pub fn set(vm: &mut Vm, receiver: &Value, key: &PropertyKey, value: Value) -> VmResult<()> {
    match receiver {
        Value::Null | Value::Undefined | Value::Invalid => {
            Err(VmError::type_error("cannot set property of null or undefined"))
        }
        Value::Boolean(_) | Value::Number(_) | Value::String(_) => Ok(()),
        Value::Array(id) => array_set(vm, *id, key, value),
        Value::Object(id) | Value::Function(id) | Value::RegExp(id) | Value::NativeFunction(id) => {
            object_set(vm, *id, key, value)
        }
        Value::External(ext) => ext.ops.set(&key.name().as_str_lossy(), &value),
    }
}

/// IN: does `receiver` (own or inherited) have `key`?
pub fn has(vm: &Vm, receiver: &Value, key: &PropertyKey) -> VmResult<bool> {
    match receiver {
        Value::Null | Value::Undefined | Value::Invalid => {
            Err(VmError::type_error("cannot use 'in' on null or undefined"))
        }
        Value::Boolean(_) => Ok(read_only_chain_has(vm, Some(vm.prototypes.boolean), key)?),
        Value::Number(_) => Ok(read_only_chain_has(vm, Some(vm.prototypes.number), key)?),
        Value::String(s) => {
            if key.as_index().is_some_and(|i| i < s.char_len()) {
                return Ok(true);
            }
            if key.name().as_bytes() == LENGTH.as_bytes() {
                return Ok(true);
            }
            read_only_chain_has(vm, Some(vm.prototypes.string), key)
        }
        Value::Array(id) => array_has(vm, *id, key),
        Value::Object(id) | Value::Function(id) | Value::RegExp(id) | Value::NativeFunction(id) => {
            object_has(vm, *id, key)
        }
        Value::External(ext) => external_has(ext, key),
    }
}

/// DELETE: remove `key` from `receiver`. Returns the operation's success bit.
pub fn delete(vm: &mut Vm, receiver: &Value, key: &PropertyKey) -> VmResult<bool> {
    match receiver {
        Value::Null | Value::Undefined | Value::Invalid => Ok(true),
        Value::Boolean(_) | Value::Number(_) | Value::String(_) => Ok(true),
        Value::Array(id) => array_delete(vm, *id, key),
        Value::Object(id) | Value::Function(id) | Value::RegExp(id) | Value::NativeFunction(id) => {
            object_delete(vm, *id, key)
        }
        Value::External(ext) => {
            ext.ops.find(&key.name().as_str_lossy(), true)?;
            Ok(true)
        }
    }
}

/// Enumerable own keys of `receiver`, for `for..in`-style iteration.
pub fn enumerate(vm: &Vm, receiver: &Value) -> VmResult<Vec<JsString>> {
    match receiver {
        Value::Array(id) => {
            let record = vm.arena.get(*id)?;
            match record {
                HeapRecord::Array(_, storage) => Ok(storage
                    .iter_present()
                    .map(|(i, _)| JsString::from_owned(i.to_string()))
                    .collect()),
                _ => Ok(Vec::new()),
            }
        }
        Value::Object(id) | Value::Function(id) | Value::RegExp(id) | Value::NativeFunction(id) => {
            let record = vm.arena.get(*id)?;
            Ok(record.object().own.enumerable_names())
        }
        Value::External(ext) => Ok(ext.ops.each().into_iter().map(|(k, _)| JsString::from_owned(k)).collect()),
        _ => Ok(Vec::new()),
    }
}

fn read_only_chain(vm: &Vm, start: Option<ObjectId>, key: &PropertyKey) -> VmResult<Value> {
    let mut current = start;
    while let Some(id) = current {
        let record = vm.arena.get(id)?;
        let object = record.object();
        if let Some(rec) = object.own.get(key.name()) {
            return Ok(if rec.is_whiteout() { Value::Undefined } else { rec.value.clone() });
        }
        if let Some(rec) = object.shared.as_ref().and_then(|s| s.get(key.name())) {
            return Ok(rec.value.clone());
        }
        current = object.proto;
    }
    Ok(Value::Undefined)
}

fn read_only_chain_has(vm: &Vm, start: Option<ObjectId>, key: &PropertyKey) -> VmResult<bool> {
    let mut current = start;
    while let Some(id) = current {
        let record = vm.arena.get(id)?;
        let object = record.object();
        if let Some(rec) = object.own.get(key.name()) {
            return Ok(!rec.is_whiteout());
        }
        if object.shared.as_ref().is_some_and(|s| s.contains_key(key.name())) {
            return Ok(true);
        }
        current = object.proto;
    }
    Ok(false)
}

fn object_get(vm: &mut Vm, receiver: ObjectId, key: &PropertyKey) -> VmResult<Value> {
    let mut current = Some(receiver);
    while let Some(id) = current {
        let (own, shared, proto) = {
            let record = vm.arena.get(id)?;
            let object = record.object();
            (
                object.own.get(key.name()).cloned(),
                object.shared.as_ref().and_then(|s| s.get(key.name()).cloned()),
                object.proto,
            )
        };

        if let Some(rec) = own {
            return Ok(if rec.is_whiteout() { Value::Undefined } else { rec.value.clone() });
        }

        if let Some(rec) = shared {
            if rec.kind == PropertyKind::Method {
                let record = vm.arena.get_mut(receiver)?;
                record.object_mut().own.insert(rec.clone());
            }
            return Ok(rec.value.clone());
        }

        current = proto;
    }
    Ok(Value::Undefined)
}

fn object_has(vm: &Vm, receiver: ObjectId, key: &PropertyKey) -> VmResult<bool> {
    read_only_chain_has(vm, Some(receiver), key)
}

fn object_set(vm: &mut Vm, receiver: ObjectId, key: &PropertyKey, value: Value) -> VmResult<()> {
    let max_properties = vm.limits.max_properties_per_object;
    let record = vm.arena.get_mut(receiver)?;
    let object = record.object_mut();

    let is_new = match object.own.get(key.name()) {
        Some(existing) => {
            if existing.kind == PropertyKind::NativeGetter || !existing.attributes.contains(Attributes::WRITABLE) {
                return Ok(());
            }
            false
        }
        None => {
            if !object.is_extensible() {
                return Ok(());
            }
            true
        }
    };

    if is_new && object.own.len() >= max_properties {
        return Err(VmError::LimitExceeded {
            what: "properties per object",
            used: object.own.len() + 1,
            limit: max_properties,
        });
    }

    object.own.insert(PropertyRecord::data(key.name().clone(), value));
    Ok(())
}

fn object_delete(vm: &mut Vm, receiver: ObjectId, key: &PropertyKey) -> VmResult<bool> {
    let (has_own, configurable, proto) = {
        let record = vm.arena.get(receiver)?;
        let object = record.object();
        match object.own.get(key.name()) {
            Some(rec) if rec.is_whiteout() => return Ok(true),
            Some(rec) => (true, rec.attributes.contains(Attributes::CONFIGURABLE), object.proto),
            None => (false, true, object.proto),
        }
    };

    if !has_own {
        return Ok(true);
    }
    if !configurable {
        return Ok(false);
    }

    let shadow_needed = match proto {
        Some(proto_id) => read_only_chain_has(vm, Some(proto_id), key)?,
        None => false,
    };

    let record = vm.arena.get_mut(receiver)?;
    let object = record.object_mut();
    if shadow_needed {
        object.own.insert(PropertyRecord::whiteout(key.name().clone()));
    } else {
        object.own.remove(key.name());
    }
    Ok(true)
}

fn array_get(vm: &mut Vm, id: ObjectId, key: &PropertyKey) -> VmResult<Value> {
    if key.name().as_bytes() == LENGTH.as_bytes() {
        if let HeapRecord::Array(_, storage) = vm.arena.get(id)? {
            return Ok(Value::Number(storage.length() as f64));
        }
    }
    if let Some(idx) = key.as_index() {
        if let HeapRecord::Array(_, storage) = vm.arena.get(id)? {
            if idx < storage.length() {
                let v = storage.get(idx);
                return Ok(if v.is_invalid() { Value::Undefined } else { v });
            }
            return Ok(Value::Undefined);
        }
    }
    object_get(vm, id, key)
}

fn array_has(vm: &Vm, id: ObjectId, key: &PropertyKey) -> VmResult<bool> {
    if key.name().as_bytes() == LENGTH.as_bytes() {
        return Ok(true);
    }
    if let Some(idx) = key.as_index() {
        if let HeapRecord::Array(_, storage) = vm.arena.get(id)? {
            return Ok(idx < storage.length() && !storage.get(idx).is_invalid());
        }
    }
    object_has(vm, id, key)
}

fn array_set(vm: &mut Vm, id: ObjectId, key: &PropertyKey, value: Value) -> VmResult<()> {
    if key.name().as_bytes() == LENGTH.as_bytes() {
        return match value.as_number() {
            Some(n) => {
                if let HeapRecord::Array(_, storage) = vm.arena.get_mut(id)? {
                    storage.set_length(n as u32);
                }
                Ok(())
            }
            None => Err(VmError::type_error("array length must be a number")),
        };
    }
    if let Some(idx) = key.as_index() {
        let max_length = vm.limits.max_array_length;
        if let HeapRecord::Array(_, storage) = vm.arena.get_mut(id)? {
            return storage.set(idx, value, max_length);
        }
    }
    object_set(vm, id, key, value)
}

fn array_delete(vm: &mut Vm, id: ObjectId, key: &PropertyKey) -> VmResult<bool> {
    if let Some(idx) = key.as_index() {
        if let HeapRecord::Array(_, storage) = vm.arena.get_mut(id)? {
            return Ok(storage.delete(idx));
        }
    }
    object_delete(vm, id, key)
}

fn external_get(ext: &ExternalObject, key: &PropertyKey) -> VmResult<Value> {
    let name = key.name().as_str_lossy();
    match ext.ops.find(&name, false)? {
        FindResult::Value(v) => Ok(v),
        FindResult::NotFound => Ok(ext.ops.get(&name)?.unwrap_or(Value::Undefined)),
    }
}

fn external_has(ext: &ExternalObject, key: &PropertyKey) -> VmResult<bool> {
    let name = key.name().as_str_lossy();
    match ext.ops.find(&name, false)? {
        FindResult::Value(_) => Ok(true),
        FindResult::NotFound => Ok(ext.ops.get(&name)?.is_some()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_index_of_rejects_leading_zero() {
        assert_eq!(array_index_of(&JsString::from_owned("01")), None);
        assert_eq!(array_index_of(&JsString::from_owned("0")), Some(0));
        assert_eq!(array_index_of(&JsString::from_owned("12")), Some(12));
        assert_eq!(array_index_of(&JsString::from_owned("x")), None);
    }
}
