//! Control-flow opcodes: jumps, calls/returns, and try/catch/finally/throw.
//!
//! `JumpIfTrue`/`JumpIfFalse`: `operand1` = offset, `operand2` = condition.
//! `CallPrepare`: `operand1` = argument count, reserving `CalleeArguments`
//! capacity (writes into that scope auto-grow it regardless, so this is a
//! hint, not a requirement).
//! `Call`: `operand2` = callee, `operand3` = `this` (optional), `nargs` =
//! argument count staged in the caller's `CalleeArguments` scope,
//! `retval_dest` = where the result lands in the *caller's* frame, `ctor` =
//! constructor call.
//! `Return`: `operand2` = value to return (optional, defaults to
//! `Undefined`).
//! `TryStart`: `operand1` = catch address (`-1` = none), `secondary` =
//! finally address (`-1` = none).
//! `Catch`: `operand2` = destination for the caught value (optional).
//! `Throw`: `operand2` = value to throw (optional, defaults to
//! `Undefined`).

use crate::arena::HeapRecord;
use crate::error::{VmError, VmResult};
use crate::exception;
use crate::frame::Frame;
use crate::function::{NativeOutcome, PendingNativeCall};
use crate::instruction::Instruction;
use crate::object::Object;
use crate::opcode::ControlCode;
use crate::value::{ObjectId, Value};
use crate::vm::Vm;

fn read_operand(vm: &Vm, loc: Option<crate::instruction::Location>) -> VmResult<Value> {
    match loc {
        Some(l) => vm.read_location(l),
        None => Ok(Value::Undefined),
    }
}

pub fn jump_if(vm: &mut Vm, instr: &Instruction, when_true: bool) -> VmResult<ControlCode> {
    let condition = read_operand(vm, instr.operand2)?;
    if condition.truthy() == when_true {
        Ok(ControlCode::Advance(instr.operand1))
    } else {
        Ok(ControlCode::Advance(1))
    }
}

pub fn call_prepare(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let nargs = instr.operand1.max(0) as u32;
    if let Some(frame) = vm.frames.last_mut() {
        if nargs > 0 {
            frame.set_callee_argument(nargs - 1, Value::Invalid);
        }
    }
    Ok(ControlCode::Advance(1))
}

pub fn call(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let callee = read_operand(vm, instr.operand2)?;
    let explicit_this = instr.operand3.map(|loc| vm.read_location(loc)).transpose()?;

    let args: Vec<Value> = {
        let frame = vm.frames.last_mut().ok_or_else(|| VmError::reference_error("no active frame"))?;
        let n = instr.nargs as usize;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            out.push(frame.callee_arguments.get(i).cloned().unwrap_or(Value::Invalid));
        }
        frame.callee_arguments.clear();
        out
    };

    {
        let frame = vm.frames.last_mut().ok_or_else(|| VmError::reference_error("no active frame"))?;
        frame.ip += 1;
    }

    dispatch_call(vm, callee, explicit_this, args, instr.ctor, instr.retval_dest)
}

fn dispatch_call(
    vm: &mut Vm,
    callee: Value,
    explicit_this: Option<Value>,
    args: Vec<Value>,
    ctor: bool,
    return_dest: Option<crate::instruction::Location>,
) -> VmResult<ControlCode> {
    match callee {
        Value::Function(id) => {
            if vm.frames.len() >= vm.limits.max_frame_depth {
                return Err(VmError::LimitExceeded {
                    what: "frame depth",
                    used: vm.frames.len() + 1,
                    limit: vm.limits.max_frame_depth,
                });
            }
            let lambda = match vm.arena.get(id)? {
                HeapRecord::Function(_, l) => l.clone(),
                _ => return Err(VmError::type_error("value is not callable")),
            };
            let this = if ctor {
                Value::Object(new_instance_object(vm, id)?)
            } else {
                explicit_this.unwrap_or(Value::Undefined)
            };
            let frame = Frame::new_scripted(lambda.entry, lambda.locals_count, args, this, return_dest, ctor);
            vm.frames.push(frame);
            Ok(ControlCode::Advance(0))
        }
        Value::NativeFunction(id) => {
            let native = match vm.arena.get(id)? {
                HeapRecord::Native(_, f) => f.clone(),
                _ => return Err(VmError::type_error("value is not callable")),
            };
            let this = if ctor {
                Value::Object(new_instance_object(vm, id)?)
            } else {
                explicit_this.unwrap_or(Value::Undefined)
            };
            match native.call(vm, this.clone(), &args)? {
                NativeOutcome::Return(value) => {
                    let result = apply_ctor_rule(ctor, value, &this);
                    write_return(vm, return_dest, result)?;
                    Ok(ControlCode::Advance(0))
                }
                NativeOutcome::Again => {
                    let frame = vm.frames.last_mut().ok_or_else(|| VmError::reference_error("no active frame"))?;
                    frame.pending_native_call = Some(PendingNativeCall {
                        native,
                        this,
                        args,
                        ctor,
                        return_dest,
                        reentry: 0,
                    });
                    Ok(ControlCode::Again)
                }
                NativeOutcome::TailCall { callee, args } => dispatch_call(vm, callee, Some(this), args, false, return_dest),
            }
        }
        _ => Err(VmError::type_error("value is not callable")),
    }
}

/// Re-drives a native call parked by a previous cooperative `Again`, rather
/// than stepping past it as if it had already returned. Called instead of
/// `step` whenever the top frame has a pending call.
pub fn drive_pending_native(vm: &mut Vm) -> VmResult<ControlCode> {
    let mut pending = {
        let frame = vm.frames.last_mut().ok_or_else(|| VmError::reference_error("no active frame"))?;
        pending_or_err(frame.pending_native_call.take())?
    };
    pending.reentry = pending.reentry.saturating_add(1);

    match pending.native.call(vm, pending.this.clone(), &pending.args)? {
        NativeOutcome::Return(value) => {
            let result = apply_ctor_rule(pending.ctor, value, &pending.this);
            write_return(vm, pending.return_dest, result)?;
            Ok(ControlCode::Advance(0))
        }
        NativeOutcome::Again => {
            let frame = vm.frames.last_mut().ok_or_else(|| VmError::reference_error("no active frame"))?;
            frame.pending_native_call = Some(pending);
            Ok(ControlCode::Again)
        }
        NativeOutcome::TailCall { callee, args } => {
            dispatch_call(vm, callee, Some(pending.this), args, false, pending.return_dest)
        }
    }
}

fn pending_or_err(call: Option<PendingNativeCall>) -> VmResult<PendingNativeCall> {
    call.ok_or_else(|| VmError::reference_error("no pending native call to resume"))
}

fn new_instance_object(vm: &mut Vm, callee: ObjectId) -> VmResult<ObjectId> {
    use crate::property::{get, PropertyKey};
    use crate::string_ref::JsString;
    let proto_value = get(vm, &Value::Function(callee), &PropertyKey::new(JsString::from_static("prototype")))?;
    let proto = proto_value.as_object_id().unwrap_or(vm.prototypes.object);
    vm.arena.alloc(HeapRecord::Plain(Object::new(Some(proto))), &vm.limits)
}

fn apply_ctor_rule(ctor: bool, returned: Value, this: &Value) -> Value {
    if !ctor {
        return returned;
    }
    let is_object_like = matches!(
        returned,
        Value::Object(_) | Value::Array(_) | Value::Function(_) | Value::NativeFunction(_) | Value::RegExp(_)
    );
    if is_object_like {
        returned
    } else {
        this.clone()
    }
}

fn write_return(vm: &mut Vm, dest: Option<crate::instruction::Location>, value: Value) -> VmResult<()> {
    vm.retval = value.clone();
    if let Some(loc) = dest {
        vm.write_location(loc, value)?;
    }
    Ok(())
}

pub fn return_op(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let value = read_operand(vm, instr.operand2)?;

    let (this_value, ctor, return_dest) = {
        let frame = vm.frames.last().ok_or_else(|| VmError::reference_error("no active frame"))?;
        (frame.this_value.clone(), frame.is_ctor(), frame.return_dest)
    };

    let result = apply_ctor_rule(ctor, value, &this_value);
    vm.frames.pop();
    write_return(vm, return_dest, result)?;

    if vm.frames.is_empty() {
        Ok(ControlCode::Done)
    } else {
        Ok(ControlCode::Advance(0))
    }
}

pub fn try_start(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let frame = vm.frames.last_mut().ok_or_else(|| VmError::reference_error("no active frame"))?;
    if frame.handlers.len() >= vm.limits.max_handler_depth {
        return Err(VmError::LimitExceeded {
            what: "try handler depth",
            used: frame.handlers.len() + 1,
            limit: vm.limits.max_handler_depth,
        });
    }
    let catch_address = if instr.operand1 >= 0 { Some(instr.operand1 as usize) } else { None };
    let finally_address = if instr.secondary >= 0 { Some(instr.secondary as usize) } else { None };
    exception::try_start(frame, catch_address, finally_address);
    Ok(ControlCode::Advance(1))
}

pub fn try_end(vm: &mut Vm, _instr: &Instruction) -> VmResult<ControlCode> {
    let frame = vm.frames.last_mut().ok_or_else(|| VmError::reference_error("no active frame"))?;
    exception::try_end(frame);
    if let Some(value) = frame.pending_rethrow.take() {
        vm.exception = Some(value);
        return Ok(ControlCode::Error);
    }
    Ok(ControlCode::Advance(1))
}

pub fn catch(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let exc = vm.exception.take().unwrap_or(Value::Undefined);
    if let Some(loc) = instr.operand2 {
        vm.write_location(loc, exc)?;
    }
    Ok(ControlCode::Advance(1))
}

pub fn finally(_vm: &mut Vm, _instr: &Instruction) -> VmResult<ControlCode> {
    Ok(ControlCode::Advance(1))
}

pub fn throw(vm: &mut Vm, instr: &Instruction) -> VmResult<ControlCode> {
    let value = read_operand(vm, instr.operand2)?;
    vm.exception = Some(value);
    Ok(ControlCode::Error)
}

pub fn restart(_vm: &mut Vm, _instr: &Instruction) -> VmResult<ControlCode> {
    Ok(ControlCode::Advance(1))
}

pub fn resume_conversion(_vm: &mut Vm, _instr: &Instruction) -> VmResult<ControlCode> {
    Ok(ControlCode::Advance(1))
}
