//! # esvm-core
//!
//! Execution engine core for an embeddable ECMAScript-subset interpreter:
//! tagged values, a safe arena heap, the property-access protocol, a
//! bytecode interpreter dispatch loop, and the call/return/exception
//! discipline that ties them together.
//!
//! This crate is the engine, not a compiler — there is no lexer, parser, or
//! bytecode assembler here. Callers build a [`instruction::Script`] directly
//! (by hand, or with [`script_builder::ScriptBuilder`] in tests) and drive
//! it with [`vm::Vm`].
//!
//! ## Example
//!
//! ```
//! use esvm_core::instruction::{Instruction, Location, Script};
//! use esvm_core::limits::VmLimits;
//! use esvm_core::opcode::Operation;
//! use esvm_core::value::Value;
//! use esvm_core::vm::Vm;
//!
//! let mut script = Script::new().with_top_level_locals(1);
//! let one = script.add_constant(Value::Number(1.0)) as i64;
//! script.push(Instruction::new(Operation::LoadConst).with_operand1(one).with_operand2(Location::local(0)));
//! script.push(
//!     Instruction::new(Operation::Add)
//!         .with_operand2(Location::local(0))
//!         .with_operand3(Location::local(0))
//!         .with_retval_dest(Location::local(0)),
//! );
//! script.push(Instruction::new(Operation::Return).with_operand2(Location::local(0)));
//!
//! let mut vm = Vm::new(script, VmLimits::default()).unwrap();
//! let outcome = vm.run(0, Vec::new()).unwrap();
//! match outcome {
//!     esvm_core::interpreter::RunOutcome::Completed(Value::Number(n)) => assert_eq!(n, 2.0),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! ```

/// Safe arena allocator for heap-resident records.
pub mod arena;
/// Dense indexed array storage with sparse-tail growth.
pub mod array;
/// Error types and the crate-wide result alias.
pub mod error;
/// try/catch/finally handler stacks and uncaught-exception tracking.
pub mod exception;
/// External object bridge for host-exposed native state.
pub mod external;
/// Activation frames and the frame stack.
pub mod frame;
/// Callable descriptors: compiled functions and native callables.
pub mod function;
/// Instruction decoding and the compiled-program container.
pub mod instruction;
/// The dispatch loop, exception unwinding, and the run/resume API.
pub mod interpreter;
/// Runtime limits enforced by the interpreter and arena.
pub mod limits;
/// Generic objects and the property table.
pub mod object;
/// Operation codes and the operation return-code protocol.
pub mod opcode;
/// Per-operation handlers and the central dispatch table.
pub mod ops;
/// The unified get/set/in/delete/enumerate property protocol.
pub mod property;
/// A utility for hand-assembling scripts without an external compiler.
pub mod script_builder;
/// String values: inline or refcounted long-string records.
pub mod string_ref;
/// Implicit-conversion coercion (`valueOf`/`toString`).
pub mod trap;
/// Tagged value representation.
pub mod value;
/// The embedder-facing API: constructing and running a VM.
pub mod vm;

pub use error::{VmError, VmResult};
pub use instruction::{Instruction, Location, Scope, Script};
pub use interpreter::RunOutcome;
pub use limits::VmLimits;
pub use value::{ObjectId, Value};
pub use vm::Vm;
