//! Arithmetic, bitwise, and increment/decrement opcodes.
//!
//! Binary ops: `operand2` = left, `operand3` = right, `retval_dest` = dest.
//! Unary ops: `operand2` = operand, `retval_dest` = dest.
//! `Inc`/`Dec`/`PostInc`/`PostDec`: `operand2` = the read-modify-write
//! location, `retval_dest` = dest (new value for prefix, old value for
//! postfix).

use crate::error::VmResult;
use crate::instruction::{Instruction, Location};
use crate::opcode::ControlCode;
use crate::string_ref::JsString;
use crate::trap::{coerce_to_number, coerce_to_primitive, primitive_to_number};
use crate::value::Value;
use crate::vm::Vm;

fn operand(vm: &Vm, loc: Option<Location>) -> VmResult<Value> {
    match loc {
        Some(l) => vm.read_location(l),
        None => Ok(Value::Undefined),
    }
}

fn write_dest(vm: &mut Vm, instr: &Instruction, value: Value) -> VmResult<ControlCode> {
    if let Some(loc) = instr.retval_dest {
        vm.write_location(loc, value)?;
    }
    Ok(ControlCode::Advance(1))
}

/// `+`: string concatenation if either coerced primitive is a string,
/// otherwise numeric addition. Both operands run through `ToPrimitive`
/// first, with no method preference (`valueOf` first, like every other
/// arithmetic op) — the classic ECMAScript `+` ambiguity resolved the same
/// way this engine resolves every other implicit conversion.
pub fn add(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let left = operand(vm, instr.operand2)?;
    let right = operand(vm, instr.operand3)?;
    let left_prim = coerce_to_primitive(vm, &left, false)?;
    let right_prim = coerce_to_primitive(vm, &right, false)?;

    if matches!(left_prim, Value::String(_)) || matches!(right_prim, Value::String(_)) {
        let left_str = vm.value_as_string(&left_prim)?;
        let right_str = vm.value_as_string(&right_prim)?;
        return write_dest(vm, instr, Value::String(JsString::concat(&left_str, &right_str)));
    }

    let result = primitive_to_number(&left_prim) + primitive_to_number(&right_prim);
    write_dest(vm, instr, Value::Number(result))
}

pub fn binary_numeric(vm: &mut Vm, instr: &Instruction, f: impl Fn(f64, f64) -> f64) -> VmResult<ControlCode> {
    let left = operand(vm, instr.operand2)?;
    let right = operand(vm, instr.operand3)?;
    let a = coerce_to_number(vm, &left)?;
    let b = coerce_to_number(vm, &right)?;
    write_dest(vm, instr, Value::Number(f(a, b)))
}

pub fn unary_numeric(vm: &mut Vm, instr: &Instruction, f: impl Fn(f64) -> f64) -> VmResult<ControlCode> {
    let value = operand(vm, instr.operand2)?;
    let a = coerce_to_number(vm, &value)?;
    write_dest(vm, instr, Value::Number(f(a)))
}

/// ToInt32-style truncation. Fast path: doubles in `[-2^53, 2^53]` cast to
/// `i64` and truncate directly. Outside that range `as i64` would saturate
/// instead of wrapping (e.g. `1e20 as i64` clamps to `i64::MAX`), so reduce
/// via `fmod(x, 2^32)` first — its result is always small enough for the
/// direct cast to be exact.
fn to_i32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    const FAST_PATH_LIMIT: f64 = 9007199254740992.0; // 2^53
    let reduced = if n.abs() <= FAST_PATH_LIMIT { n } else { n % 4294967296.0 };
    (reduced as i64 as u32) as i32
}

pub fn binary_integer(vm: &mut Vm, instr: &Instruction, f: impl Fn(i32, i32) -> i32) -> VmResult<ControlCode> {
    let left = operand(vm, instr.operand2)?;
    let right = operand(vm, instr.operand3)?;
    let a = to_i32(coerce_to_number(vm, &left)?);
    let b = to_i32(coerce_to_number(vm, &right)?);
    write_dest(vm, instr, Value::Number(f(a, b) as f64))
}

pub fn binary_integer_signed(vm: &mut Vm, instr: &Instruction, f: impl Fn(i32, i32) -> i32) -> VmResult<ControlCode> {
    binary_integer(vm, instr, f)
}

pub fn binary_unsigned_shift(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let left = operand(vm, instr.operand2)?;
    let right = operand(vm, instr.operand3)?;
    let a = to_i32(coerce_to_number(vm, &left)?) as u32;
    let b = to_i32(coerce_to_number(vm, &right)?) as u32;
    write_dest(vm, instr, Value::Number(a.wrapping_shr(b & 31) as f64))
}

pub fn bitwise_not(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let value = operand(vm, instr.operand2)?;
    let a = to_i32(coerce_to_number(vm, &value)?);
    write_dest(vm, instr, Value::Number(!a as f64))
}

pub fn inc_dec(vm: &mut Vm, instr: &Instruction, delta: f64, postfix: bool) -> VmResult<ControlCode> {
    let Some(loc) = instr.operand2 else {
        return write_dest(vm, instr, Value::Undefined);
    };
    let current = vm.read_location(loc)?;
    let old_number = coerce_to_number(vm, &current)?;
    let new_number = old_number + delta;
    vm.write_location(loc, Value::Number(new_number))?;
    write_dest(vm, instr, Value::Number(if postfix { old_number } else { new_number }))
}
