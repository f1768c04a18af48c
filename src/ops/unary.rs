//! `LogicalNot` and `TypeOf`. Both: `operand2` = operand, `retval_dest` =
//! dest. Neither coerces to a primitive — truthiness and `typeof` are
//! defined over every value tag directly.

use crate::error::VmResult;
use crate::instruction::Instruction;
use crate::opcode::ControlCode;
use crate::string_ref::JsString;
use crate::value::Value;
use crate::vm::Vm;

fn operand(vm: &Vm, instr: &Instruction) -> VmResult<Value> {
    match instr.operand2 {
        Some(loc) => vm.read_location(loc),
        None => Ok(Value::Undefined),
    }
}

fn write_dest(vm: &mut Vm, instr: &Instruction, value: Value) -> VmResult<ControlCode> {
    if let Some(loc) = instr.retval_dest {
        vm.write_location(loc, value)?;
    }
    Ok(ControlCode::Advance(1))
}

pub fn logical_not(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let value = operand(vm, instr)?;
    write_dest(vm, instr, Value::Boolean(!value.truthy()))
}

pub fn type_of(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let value = operand(vm, instr)?;
    write_dest(vm, instr, Value::String(JsString::from_static(value.type_of())))
}
