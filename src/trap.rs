//! Implicit-conversion traps: when an arithmetic, comparison, or property
//! operation hits a non-primitive operand, it calls the operand's
//! `valueOf`/`toString` (whichever order the call site prefers) instead of
//! failing outright. Since the VM is single-threaded and re-entrant calls
//! are just ordinary Rust calls, the conversion runs to completion
//! synchronously: a scripted `valueOf` gets its own frame and is driven by a
//! private sub-loop that returns once that frame (and only that frame) pops.

use crate::arena::HeapRecord;
use crate::error::{VmError, VmResult};
use crate::frame::{Frame, FrameFlags};
use crate::property::{get, PropertyKey};
use crate::string_ref::JsString;
use crate::value::Value;
use crate::vm::Vm;

const VALUE_OF: &str = "valueOf";
const TO_STRING: &str = "toString";

/// Converts `value` to a primitive, trying `valueOf` then `toString` (or the
/// reverse when `prefer_string` is set, e.g. for `+`'s string-concat guess
/// and for explicit string coercion). Returns the value unchanged if it's
/// already primitive.
pub fn coerce_to_primitive(vm: &mut Vm, value: &Value, prefer_string: bool) -> VmResult<Value> {
    if !is_object_like(value) {
        return Ok(value.clone());
    }

    let order: [&str; 2] = if prefer_string { [TO_STRING, VALUE_OF] } else { [VALUE_OF, TO_STRING] };

    for (attempt, name) in order.iter().enumerate() {
        if attempt as u8 >= vm.limits.max_trap_reentry {
            break;
        }
        let method = get(vm, value, &PropertyKey::new(JsString::from_static(name)))?;
        if !method.is_callable() {
            continue;
        }
        let result = invoke_conversion(vm, method, value.clone())?;
        if !is_object_like(&result) {
            return Ok(result);
        }
    }

    Err(VmError::type_error(
        "cannot convert value to a primitive: valueOf and toString both failed or returned an object",
    ))
}

pub fn coerce_to_number(vm: &mut Vm, value: &Value) -> VmResult<f64> {
    let primitive = coerce_to_primitive(vm, value, false)?;
    Ok(primitive_to_number(&primitive))
}

pub fn coerce_to_string(vm: &mut Vm, value: &Value) -> VmResult<JsString> {
    let primitive = coerce_to_primitive(vm, value, true)?;
    vm.value_as_string(&primitive)
}

fn is_object_like(value: &Value) -> bool {
    matches!(
        value,
        Value::Object(_)
            | Value::Array(_)
            | Value::Function(_)
            | Value::NativeFunction(_)
            | Value::RegExp(_)
            | Value::External(_)
    )
}

/// `ToNumber` on any primitive. Object-like values never reach here —
/// callers always run them through [`coerce_to_primitive`] first.
pub fn primitive_to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Boolean(b) => if *b { 1.0 } else { 0.0 },
        Value::Null => 0.0,
        Value::Undefined | Value::Invalid => f64::NAN,
        Value::String(s) => {
            let text = s.as_str_lossy();
            let trimmed = text.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        _ => f64::NAN,
    }
}

fn invoke_conversion(vm: &mut Vm, method: Value, receiver: Value) -> VmResult<Value> {
    match method {
        Value::NativeFunction(id) => {
            let native = match vm.arena.get(id)? {
                HeapRecord::Native(_, f) => f.clone(),
                _ => return Err(VmError::type_error("conversion method is not callable")),
            };
            match native.call(vm, receiver, &[])? {
                crate::function::NativeOutcome::Return(v) => Ok(v),
                // Conversions run synchronously to completion (see module
                // doc): there's no restart slot to resume into later, so a
                // native valueOf/toString that tries to suspend mid-coercion
                // fails loudly instead of a fabricated result standing in
                // for the one it never produced.
                crate::function::NativeOutcome::Again => Err(VmError::type_error(
                    "native valueOf/toString cannot suspend cooperatively during an implicit conversion",
                )),
                crate::function::NativeOutcome::TailCall { .. } => {
                    Err(VmError::type_error("valueOf/toString cannot tail-call"))
                }
            }
        }
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
                _ => return Err(VmError::type_error("conversion method is not callable")),
            };
            let depth_before = vm.frames.len();
            let mut frame = Frame::new_scripted(lambda.entry, lambda.locals_count, Vec::new(), receiver, None, false);
            frame.flags |= FrameFlags::REENTRANT;
            vm.frames.push(frame);
            run_until_depth(vm, depth_before)?;
            Ok(vm.retval.clone())
        }
        _ => Err(VmError::type_error("conversion method is not callable")),
    }
}

/// Drives `step`/unwind until the frame stack returns to `depth` — i.e.
/// until the synthetic conversion frame (and anything it itself called)
/// has popped.
fn run_until_depth(vm: &mut Vm, depth: usize) -> VmResult<()> {
    use crate::opcode::ControlCode;
    while vm.frames.len() > depth {
        match crate::interpreter::step(vm)? {
            ControlCode::Advance(delta) => {
                if delta != 0 {
                    if let Some(frame) = vm.frames.last_mut() {
                        frame.ip = (frame.ip as i64 + delta) as usize;
                    }
                }
            }
            ControlCode::Error => {
                if !crate::interpreter::unwind(vm)? {
                    let exc = vm.exception.take().unwrap_or(Value::Undefined);
                    return Err(VmError::type_error(format!(
                        "uncaught exception during implicit conversion: {exc:?}"
                    )));
                }
            }
            ControlCode::Done => break,
            ControlCode::Again => {
                // A call nested inside the conversion frame suspended.
                // Nothing here can resume it later — there's no restart
                // slot pointing back at the original arithmetic/property
                // instruction — so discard the synthetic frame(s) rather
                // than leave them orphaned on `vm.frames` and report the
                // conversion as failed instead of completed.
                vm.frames.truncate(depth);
                return Err(VmError::type_error(
                    "native call suspended cooperatively during an implicit conversion; conversions run synchronously and cannot be resumed mid-coercion",
                ));
            }
            ControlCode::Trap(_) => unreachable!("arithmetic/property ops coerce inline, never via ControlCode::Trap"),
        }
    }
    Ok(())
}
