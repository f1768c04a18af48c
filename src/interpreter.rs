//! The dispatch loop: fetch-decode-execute, exception unwinding, and the
//! outer run/resume API.

use crate::error::{VmError, VmResult};
use crate::exception::{find_handler, HandlerTarget};
use crate::ops;
use crate::opcode::ControlCode;
use crate::value::Value;
use crate::vm::Vm;

/// What `run`/`resume` hands back to the embedder.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The top-level frame returned; its value is also readable via
    /// `Vm::retval`.
    Completed(Value),
    /// A native callee cooperatively suspended; call `Vm::resume` later.
    Again,
    /// No handler caught the exception before it reached the top-level
    /// frame.
    Uncaught(Value),
}

/// Runs until the frame stack empties, a native callee suspends, or an
/// exception escapes uncaught.
pub fn run(vm: &mut Vm) -> VmResult<RunOutcome> {
    loop {
        if vm.frames.is_empty() {
            return Ok(RunOutcome::Completed(vm.retval.clone()));
        }

        let has_pending_native = vm.frames.last().is_some_and(|f| f.pending_native_call.is_some());
        let code = if has_pending_native { ops::resume_pending_native(vm)? } else { step(vm)? };
        match code {
            ControlCode::Advance(delta) => {
                if delta != 0 {
                    let frame = vm.frames.last_mut().expect("frame present");
                    frame.ip = (frame.ip as i64 + delta) as usize;
                }
            }
            ControlCode::Trap(_) => {
                unreachable!("op handlers coerce operands inline via crate::trap, never return Trap")
            }
            ControlCode::Error => {
                if !unwind(vm)? {
                    let exc = vm.exception.take().unwrap_or(Value::Undefined);
                    return Ok(RunOutcome::Uncaught(exc));
                }
            }
            ControlCode::Done => {
                return Ok(RunOutcome::Completed(vm.retval.clone()));
            }
            ControlCode::Again => {
                return Ok(RunOutcome::Again);
            }
        }
    }
}

/// Executes exactly one instruction in the current (topmost) frame.
pub fn step(vm: &mut Vm) -> VmResult<ControlCode> {
    let (ip, max_ip) = {
        let frame = vm.frames.last().ok_or_else(|| VmError::reference_error("no active frame"))?;
        (frame.ip, vm.script.len())
    };

    if ip >= max_ip {
        return Ok(ControlCode::Done);
    }

    let instr = vm.script.instructions[ip].clone();
    match ops::dispatch(vm, &instr) {
        Ok(code) => Ok(code),
        Err(e) => {
            vm.exception = Some(e.as_exception_value());
            Ok(ControlCode::Error)
        }
    }
}

/// Propagates `vm.exception` outward: tries the current frame's handler
/// stack, then pops frames with none, until a catch/finally absorbs it or
/// the stack empties. Returns `false` once the stack is empty and nothing
/// caught it.
pub fn unwind(vm: &mut Vm) -> VmResult<bool> {
    loop {
        let Some(frame) = vm.frames.last_mut() else {
            return Ok(false);
        };

        match find_handler(frame) {
            Some((index, HandlerTarget::Catch(target))) => {
                frame.handlers.truncate(index + 1);
                frame.handlers[index].state = crate::exception::HandlerState::Catch;
                let exc = vm.exception.take().unwrap_or(Value::Undefined);
                frame.ip = target;
                // The catch variable's scope slot isn't written here: the
                // `Catch` opcode at `target` reads `vm.exception` itself and
                // binds it, since only it knows which location the compiled
                // program assigned to the catch parameter.
                vm.exception = Some(exc);
                return Ok(true);
            }
            Some((index, HandlerTarget::Finally(target))) => {
                frame.handlers[index].state = crate::exception::HandlerState::Finally;
                frame.pending_rethrow = vm.exception.take();
                frame.ip = target;
                return Ok(true);
            }
            None => {
                vm.frames.pop();
            }
        }
    }
}
