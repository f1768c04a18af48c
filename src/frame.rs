//! Activation frames and the frame stack.
//!
//! Frames are kept in a `Vec<Frame>` rather than a linked chain growing
//! toward the caller — push/pop is the idiomatic Rust equivalent of
//! "previous pointer" chaining and avoids `Rc<RefCell<_>>` or unsafe raw
//! pointers for no behavioral gain.

pub use crate::exception::ExceptionHandler;
pub use crate::function::PendingNativeCall;
pub use crate::instruction::Scope;
use crate::value::Value;

bitflags::bitflags! {
    /// Per-frame flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FrameFlags: u16 {
        /// Invoked via `new`; `this` is a freshly allocated implicit object.
        const CTOR = 0b0000_0001;
        /// The first frame allocated for this call (vs. reused/inlined) —
        /// only `first` frames are returned to the arena on exit.
        const FIRST = 0b0000_0010;
        /// A synthetic frame the trap machinery installed to run a
        /// `valueOf`/`toString` conversion method to completion.
        const REENTRANT = 0b0000_0100;
    }
}

/// One activation record.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Instruction index of the next instruction to execute.
    pub ip: usize,
    pub locals: Vec<Value>,
    pub arguments: Vec<Value>,
    pub callee_arguments: Vec<Value>,
    /// The implicit `this` for this activation.
    pub this_value: Value,
    /// Where the caller wants this frame's return value written, once this
    /// frame pops.
    pub return_dest: Option<Location>,
    /// Per-frame try/catch/finally handler stack. Push/pop/truncate give
    /// the same restore-on-try-end semantics an intrusive linked list would.
    pub handlers: Vec<ExceptionHandler>,
    pub flags: FrameFlags,
    /// Set by `interpreter::unwind` when an in-flight exception reaches a
    /// finally handler that hasn't run yet; re-raised by the `TryEnd`
    /// opcode unless the finally body returns first (in which case the
    /// frame is gone before `TryEnd` ever runs, and the exception is simply
    /// dropped).
    pub pending_rethrow: Option<Value>,
    /// A native call that suspended with `NativeOutcome::Again`, parked here
    /// until `resume` re-drives it. `None` the rest of the time.
    pub pending_native_call: Option<PendingNativeCall>,
}

pub use crate::instruction::Location;

impl Frame {
    pub fn new_scripted(
        ip: usize,
        locals_count: u32,
        arguments: Vec<Value>,
        this_value: Value,
        return_dest: Option<Location>,
        ctor: bool,
    ) -> Self {
        let mut flags = FrameFlags::FIRST;
        if ctor {
            flags |= FrameFlags::CTOR;
        }
        Self {
            ip,
            locals: vec![Value::Invalid; locals_count as usize],
            arguments,
            callee_arguments: Vec::new(),
            this_value,
            return_dest,
            handlers: Vec::new(),
            flags,
            pending_rethrow: None,
            pending_native_call: None,
        }
    }

    pub fn is_ctor(&self) -> bool {
        self.flags.contains(FrameFlags::CTOR)
    }

    pub fn is_first(&self) -> bool {
        self.flags.contains(FrameFlags::FIRST)
    }

    pub fn is_reentrant(&self) -> bool {
        self.flags.contains(FrameFlags::REENTRANT)
    }

    /// Stages an outgoing call argument in this frame's `CalleeArguments`
    /// scope, growing it as needed. The callee's `Arguments` scope is
    /// populated from here when the call executes.
    pub fn set_callee_argument(&mut self, index: u32, value: Value) {
        let index = index as usize;
        if index >= self.callee_arguments.len() {
            self.callee_arguments.resize(index + 1, Value::Invalid);
        }
        self.callee_arguments[index] = value;
    }
}

