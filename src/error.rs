//! Error types for the execution engine.
//!
//! Every operation that can fail returns a [`VmError`]; the interpreter's
//! unwinder (see [`crate::interpreter`]) turns one of these into a script-
//! visible exception value via [`VmError::as_exception_value`].

use thiserror::Error;

use crate::value::Value;

/// The five canonical error identifiers a script can observe.
pub const TYPE_ERROR: &str = "TypeError";
pub const REFERENCE_ERROR: &str = "ReferenceError";
pub const RANGE_ERROR: &str = "RangeError";
pub const SYNTAX_ERROR: &str = "SyntaxError";
pub const MEMORY_ERROR: &str = "MemoryError";

/// Errors produced by the engine.
///
/// The `TypeError`/`ReferenceError`/`RangeError`/`SyntaxError`/`MemoryError`
/// variants are the five well-known identifiers scripts can observe; the
/// rest are mechanical errors for malformed bytecode that an embedder's
/// assembler should never produce, kept separate so callers can distinguish
/// "the script misbehaved" from "the bytecode is corrupt".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VmError {
    /// Non-callable invoked; invalid receiver in property access; failed
    /// primitive conversion after two attempts; `instanceof` on non-function.
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Reading an uninitialized (Invalid) variable.
    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    /// Out-of-range numeric conversion at a call site that checks explicitly.
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Propagated unchanged from the external parser/assembler.
    #[error("SyntaxError: {0}")]
    SyntaxError(String),

    /// Arena allocation failure. Never retried.
    #[error("MemoryError: {0}")]
    MemoryError(String),

    /// Bytecode decoding hit an opcode the jump table has no handler for.
    #[error("invalid opcode {opcode:#04x} at {position}")]
    InvalidOpcode { opcode: u8, position: usize },

    /// Operand count or operand kind did not match what the opcode expects.
    #[error("invalid operand for {operation}: {reason}")]
    InvalidOperand { operation: String, reason: String },

    /// A scope index referenced a slot outside the frame's allocated range.
    #[error("scope slot out of range: {scope:?}[{index}] (len {len})")]
    SlotOutOfRange {
        scope: crate::frame::Scope,
        index: u32,
        len: u32,
    },

    /// Frame or try/catch nesting exceeded configured limits.
    #[error("{what} limit exceeded: {used} > {limit}")]
    LimitExceeded {
        what: &'static str,
        used: usize,
        limit: usize,
    },

    /// An external-object callback returned an error.
    #[error("external object error: {0}")]
    External(String),
}

impl VmError {
    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        VmError::TypeError(msg.into())
    }

    pub fn reference_error<S: Into<String>>(msg: S) -> Self {
        VmError::ReferenceError(msg.into())
    }

    pub fn range_error<S: Into<String>>(msg: S) -> Self {
        VmError::RangeError(msg.into())
    }

    pub fn memory_error<S: Into<String>>(msg: S) -> Self {
        VmError::MemoryError(msg.into())
    }

    /// The canonical error identifier this error surfaces as.
    pub fn identifier(&self) -> &'static str {
        match self {
            VmError::TypeError(_) => TYPE_ERROR,
            VmError::ReferenceError(_) => REFERENCE_ERROR,
            VmError::RangeError(_) => RANGE_ERROR,
            VmError::SyntaxError(_) => SYNTAX_ERROR,
            VmError::MemoryError(_) => MEMORY_ERROR,
            // Bytecode-level errors are host bugs, not script-observable
            // exceptions, but still need an identifier for vm->exception.
            VmError::InvalidOpcode { .. }
            | VmError::InvalidOperand { .. }
            | VmError::SlotOutOfRange { .. }
            | VmError::LimitExceeded { .. } => TYPE_ERROR,
            VmError::External(_) => TYPE_ERROR,
        }
    }

    /// Renders this error the way it appears as a caught exception value:
    /// `"<identifier>: <message>"`, e.g. `"TypeError: value is not
    /// callable"`. A real engine would allocate an `Error`-prototyped
    /// object here, but that needs arena access this method doesn't have
    /// (it runs from inside `?`-propagation, with only `&self`); the
    /// interpreter's unwinder (`interpreter::step`) is the only caller, and
    /// a string is sufficient for a script's `catch (e) { ... }` to inspect
    /// via `String(e)` or `e.indexOf(...)`.
    pub fn as_exception_value(&self) -> Value {
        Value::String(crate::string_ref::JsString::from_owned(format!(
            "{}: {}",
            self.identifier(),
            self.strip_prefix_for_display()
        )))
    }

    fn strip_prefix_for_display(&self) -> String {
        let full = self.to_string();
        let prefix_len = self.identifier().len() + 2; // "X: "
        full.get(prefix_len..).unwrap_or(&full).to_string()
    }
}

/// Convenience alias used throughout the crate.
pub type VmResult<T> = Result<T, VmError>;
