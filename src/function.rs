//! Callable descriptors.
//!
//! A [`Lambda`] is a compiled function body — an entry point into the
//! shared instruction stream plus the metadata the frame-setup opcode needs
//! (parameter count, locals count). Multiple function values may share one
//! `Lambda`. Native callables are a Rust trait object rather than a C-style
//! function pointer, which is the idiomatic equivalent and lets a host
//! close over state.

use std::fmt;
use std::rc::Rc;

use crate::error::VmResult;
use crate::value::Value;

/// A compiled function body, shared by every `Value::Function` created from
/// the same source function literal.
#[derive(Debug, Clone)]
pub struct Lambda {
    pub name: Option<String>,
    /// Instruction index where the body starts.
    pub entry: usize,
    pub param_count: u32,
    pub locals_count: u32,
    pub is_ctor: bool,
}

/// The result a native callable hands back to the frame that invoked it.
/// Errors are not modeled as a variant here — native callables signal
/// errors through the ordinary `VmResult` channel instead, which is the
/// idiomatic equivalent.
#[derive(Debug, Clone)]
pub enum NativeOutcome {
    /// Normal return with a value.
    Return(Value),
    /// The callee installed a tail call; treat as pending.
    TailCall { callee: Value, args: Vec<Value> },
    /// Suspend the VM cooperatively; the embedder resumes later.
    Again,
}

/// A native function a host or the engine's own built-ins implement.
pub trait NativeCallable: fmt::Debug {
    fn call(
        &self,
        vm: &mut crate::vm::Vm,
        this: Value,
        args: &[Value],
    ) -> VmResult<NativeOutcome>;

    /// Distinguishes a constructor-capable native (used by `instanceof` and
    /// `new`). Most built-ins are not constructible.
    fn is_constructor(&self) -> bool {
        false
    }
}

pub type NativeFn = Rc<dyn NativeCallable>;

/// A native call that returned [`NativeOutcome::Again`], parked on the
/// calling frame so `resume` can re-drive the *same* call instead of
/// stepping past it. `reentry` counts cooperative returns so far — progress
/// across suspensions, not a retry cap.
#[derive(Debug, Clone)]
pub struct PendingNativeCall {
    pub native: NativeFn,
    pub this: Value,
    pub args: Vec<Value>,
    pub ctor: bool,
    pub return_dest: Option<crate::instruction::Location>,
    pub reentry: u8,
}

/// Wraps a plain Rust closure as a [`NativeCallable`], for built-ins that
/// don't need to be constructors or hold extra state beyond the closure.
pub struct ClosureNative<F>(pub F)
where
    F: Fn(&mut crate::vm::Vm, Value, &[Value]) -> VmResult<NativeOutcome>;

impl<F> fmt::Debug for ClosureNative<F>
where
    F: Fn(&mut crate::vm::Vm, Value, &[Value]) -> VmResult<NativeOutcome>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClosureNative")
    }
}

impl<F> NativeCallable for ClosureNative<F>
where
    F: Fn(&mut crate::vm::Vm, Value, &[Value]) -> VmResult<NativeOutcome>,
{
    fn call(
        &self,
        vm: &mut crate::vm::Vm,
        this: Value,
        args: &[Value],
    ) -> VmResult<NativeOutcome> {
        (self.0)(vm, this, args)
    }
}
