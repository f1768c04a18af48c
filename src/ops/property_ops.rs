//! The property-protocol opcodes: `GetProp`, `SetProp`, `PropIn`,
//! `DeleteProp`. All use `operand2` for the receiver location and resolve
//! the key the same way: `operand3` (a computed-key location) when present,
//! else `operand1` indexing the constant pool for a static name. The
//! remaining slot, `retval_dest`, holds the read result for `GetProp`/
//! `PropIn`/`DeleteProp`; `SetProp` has no result of its own, so it reuses
//! that slot as the value-source location instead.

use crate::error::VmResult;
use crate::instruction::Instruction;
use crate::opcode::ControlCode;
use crate::property;
use crate::value::Value;
use crate::vm::Vm;

use super::resolve_key;

fn receiver(vm: &Vm, instr: &Instruction) -> VmResult<Value> {
    match instr.operand2 {
        Some(loc) => vm.read_location(loc),
        None => Ok(Value::Undefined),
    }
}

pub fn get_prop(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let receiver = receiver(vm, instr)?;
    let key = resolve_key(vm, instr, instr.operand3)?;
    let value = property::get(vm, &receiver, &key)?;
    if let Some(loc) = instr.retval_dest {
        vm.write_location(loc, value)?;
    }
    Ok(ControlCode::Advance(1))
}

pub fn set_prop(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let receiver = receiver(vm, instr)?;
    let key = resolve_key(vm, instr, instr.operand3)?;
    let value = match instr.retval_dest {
        Some(loc) => vm.read_location(loc)?,
        None => Value::Undefined,
    };
    property::set(vm, &receiver, &key, value)?;
    Ok(ControlCode::Advance(1))
}

pub fn prop_in(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let receiver = receiver(vm, instr)?;
    let key = resolve_key(vm, instr, instr.operand3)?;
    let result = property::has(vm, &receiver, &key)?;
    if let Some(loc) = instr.retval_dest {
        vm.write_location(loc, Value::Boolean(result))?;
    }
    Ok(ControlCode::Advance(1))
}

pub fn delete_prop(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let receiver = receiver(vm, instr)?;
    let key = resolve_key(vm, instr, instr.operand3)?;
    let result = property::delete(vm, &receiver, &key)?;
    if let Some(loc) = instr.retval_dest {
        vm.write_location(loc, Value::Boolean(result))?;
    }
    Ok(ControlCode::Advance(1))
}
