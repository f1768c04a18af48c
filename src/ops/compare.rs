//! Equality and relational opcodes. All: `operand2` = left, `operand3` =
//! right, `retval_dest` = dest (always a `Boolean`).

use std::cmp::Ordering;

use crate::arena::HeapRecord;
use crate::error::{VmError, VmResult};
use crate::instruction::{Instruction, Location};
use crate::opcode::ControlCode;
use crate::string_ref::JsString;
use crate::trap::{coerce_to_primitive, primitive_to_number};
use crate::value::{ObjectId, Value};
use crate::vm::Vm;

fn operand(vm: &Vm, loc: Option<Location>) -> VmResult<Value> {
    match loc {
        Some(l) => vm.read_location(l),
        None => Ok(Value::Undefined),
    }
}

fn write_dest(vm: &mut Vm, instr: &Instruction, value: bool) -> VmResult<ControlCode> {
    if let Some(loc) = instr.retval_dest {
        vm.write_location(loc, Value::Boolean(value))?;
    }
    Ok(ControlCode::Advance(1))
}

fn is_object_like(v: &Value) -> bool {
    matches!(
        v,
        Value::Object(_) | Value::Array(_) | Value::Function(_) | Value::NativeFunction(_) | Value::RegExp(_) | Value::External(_)
    )
}

fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) | (Value::Invalid, Value::Invalid) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Object(x), Value::Object(y))
        | (Value::Array(x), Value::Array(y))
        | (Value::Function(x), Value::Function(y))
        | (Value::NativeFunction(x), Value::NativeFunction(y))
        | (Value::RegExp(x), Value::RegExp(y)) => x == y,
        _ => false,
    }
}

fn loose_equals(vm: &mut Vm, a: &Value, b: &Value) -> VmResult<bool> {
    if std::mem::discriminant(a) == std::mem::discriminant(b) {
        return Ok(strict_equals(a, b));
    }
    match (a, b) {
        (Value::Null, Value::Undefined) | (Value::Undefined, Value::Null) => Ok(true),
        (Value::Invalid, Value::Null) | (Value::Null, Value::Invalid) => Ok(true),
        (Value::Invalid, Value::Undefined) | (Value::Undefined, Value::Invalid) => Ok(true),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            Ok(primitive_to_number(a) == primitive_to_number(b))
        }
        (Value::Boolean(_), _) => {
            let n = primitive_to_number(a);
            loose_equals(vm, &Value::Number(n), b)
        }
        (_, Value::Boolean(_)) => {
            let n = primitive_to_number(b);
            loose_equals(vm, a, &Value::Number(n))
        }
        _ if is_object_like(a) && !is_object_like(b) => {
            let prim = coerce_to_primitive(vm, a, false)?;
            loose_equals(vm, &prim, b)
        }
        _ if is_object_like(b) && !is_object_like(a) => {
            let prim = coerce_to_primitive(vm, b, false)?;
            loose_equals(vm, a, &prim)
        }
        _ => Ok(false),
    }
}

pub fn eq(vm: &mut Vm, instr: &Instruction, strict: bool) -> VmResult<ControlCode> {
    let left = operand(vm, instr.operand2)?;
    let right = operand(vm, instr.operand3)?;
    let result = if strict { strict_equals(&left, &right) } else { loose_equals(vm, &left, &right)? };
    write_dest(vm, instr, result)
}

pub fn ne(vm: &mut Vm, instr: &Instruction, strict: bool) -> VmResult<ControlCode> {
    let left = operand(vm, instr.operand2)?;
    let right = operand(vm, instr.operand3)?;
    let result = if strict { strict_equals(&left, &right) } else { loose_equals(vm, &left, &right)? };
    write_dest(vm, instr, !result)
}

/// `<`/`<=`/`>`/`>=`: both operands go through `ToPrimitive` preferring
/// `valueOf`; if both results are strings, compare lexicographically by
/// byte order, otherwise numerically (`NaN` makes every relational op
/// `false`, represented here as `None` ordering).
pub fn relational(vm: &mut Vm, instr: &Instruction, test: impl Fn(Ordering) -> bool) -> VmResult<ControlCode> {
    let left = operand(vm, instr.operand2)?;
    let right = operand(vm, instr.operand3)?;
    let left_prim = coerce_to_primitive(vm, &left, false)?;
    let right_prim = coerce_to_primitive(vm, &right, false)?;

    let ordering = if let (Value::String(a), Value::String(b)) = (&left_prim, &right_prim) {
        Some(compare_strings(a, b))
    } else {
        let a = primitive_to_number(&left_prim);
        let b = primitive_to_number(&right_prim);
        a.partial_cmp(&b)
    };

    write_dest(vm, instr, ordering.is_some_and(test))
}

fn compare_strings(a: &JsString, b: &JsString) -> Ordering {
    a.as_bytes().cmp(b.as_bytes())
}

/// `instanceof`: `operand2` = object under test, `operand3` = constructor.
///
/// A non-callable right-hand side is a `TypeError`; a constructor-capable
/// native is eligible just like a scripted function (checked via
/// `NativeCallable::is_constructor`). A primitive left-hand side is simply
/// `false`, as is a constructor with no own/shared `prototype` property —
/// neither is an error.
pub fn instance_of(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let object = operand(vm, instr.operand2)?;
    let constructor = operand(vm, instr.operand3)?;

    let constructor_id = match &constructor {
        Value::Function(id) => *id,
        Value::NativeFunction(id) => {
            let native = match vm.arena.get(*id)? {
                HeapRecord::Native(_, f) => f.clone(),
                _ => return Err(VmError::type_error("right-hand side of 'instanceof' is not callable")),
            };
            if !native.is_constructor() {
                return Err(VmError::type_error("right-hand side of 'instanceof' is not callable"));
            }
            *id
        }
        _ => return Err(VmError::type_error("right-hand side of 'instanceof' is not callable")),
    };

    let object_id = match object {
        Value::Object(id) | Value::Array(id) | Value::Function(id) | Value::NativeFunction(id) | Value::RegExp(id) => Some(id),
        _ => None,
    };

    let Some(object_id) = object_id else {
        return write_dest(vm, instr, false);
    };

    let Some(prototype_id) = own_or_shared_prototype(vm, constructor_id)? else {
        return write_dest(vm, instr, false);
    };

    let mut current = vm.arena.get(object_id)?.object().proto;
    while let Some(id) = current {
        if id == prototype_id {
            return write_dest(vm, instr, true);
        }
        current = vm.arena.get(id)?.object().proto;
    }
    write_dest(vm, instr, false)
}

/// Looks up `prototype` directly on `constructor`'s own or shared table,
/// without walking further up `constructor`'s own prototype chain — a
/// constructor that inherits a `prototype` property from elsewhere still
/// counts as lacking one for `instanceof`'s purposes.
fn own_or_shared_prototype(vm: &Vm, constructor: ObjectId) -> VmResult<Option<ObjectId>> {
    let record = vm.arena.get(constructor)?;
    let object = record.object();
    let prop = object
        .own
        .get(&JsString::from_static("prototype"))
        .filter(|rec| !rec.is_whiteout())
        .or_else(|| object.shared.as_ref().and_then(|s| s.get(&JsString::from_static("prototype"))));
    Ok(prop.and_then(|rec| rec.value.as_object_id()))
}
