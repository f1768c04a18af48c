//! Allocation and data-movement opcodes.
//!
//! `LoadConst`: `operand1` = constant index, `operand2` = dest.
//! `Move`: `operand2` = dest, `operand3` = src.
//! `NewObject`/`NewArray`: `operand2` = dest.
//! `NewFunction`/`NewRegExp`: `operand1` = constant index of a preallocated
//! template value, `operand2` = dest — functions close over nothing beyond
//! globals in this engine, so cloning the template's object id is enough;
//! a host that wants per-call identity allocates a fresh function object
//! from the template's `Lambda` at the call site instead.

use crate::arena::HeapRecord;
use crate::error::VmResult;
use crate::instruction::Instruction;
use crate::object::Object;
use crate::opcode::ControlCode;
use crate::value::Value;
use crate::vm::Vm;

fn write_dest(vm: &mut Vm, instr: &Instruction, value: Value) -> VmResult<ControlCode> {
    if let Some(loc) = instr.operand2 {
        vm.write_location(loc, value)?;
    }
    Ok(ControlCode::Advance(1))
}

pub fn load_const(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let value = vm
        .script
        .constants
        .get(instr.operand1 as usize)
        .cloned()
        .unwrap_or(Value::Undefined);
    write_dest(vm, instr, value)
}

pub fn move_value(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let src = instr.operand3.map(|loc| vm.read_location(loc)).transpose()?.unwrap_or(Value::Undefined);
    write_dest(vm, instr, src)
}

pub fn new_object(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let proto = vm.prototypes.object;
    let id = vm.arena.alloc(HeapRecord::Plain(Object::new(Some(proto))), &vm.limits)?;
    write_dest(vm, instr, Value::Object(id))
}

pub fn new_array(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let proto = vm.prototypes.array;
    let id = vm.arena.alloc(
        HeapRecord::Array(Object::new(Some(proto)), crate::array::ArrayStorage::new()),
        &vm.limits,
    )?;
    write_dest(vm, instr, Value::Array(id))
}

pub fn new_function(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let template = vm.script.constants.get(instr.operand1 as usize).cloned().unwrap_or(Value::Undefined);
    write_dest(vm, instr, template)
}

pub fn new_regexp(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let template = vm.script.constants.get(instr.operand1 as usize).cloned().unwrap_or(Value::Undefined);
    write_dest(vm, instr, template)
}
