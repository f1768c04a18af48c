//! Instruction decoding and the compiled-program container.
//!
//! There is no external assembler or lexer/parser in this crate, so rather
//! than a byte-level wire format we model the logical contract directly: a
//! flat `Vec<Instruction>` that already carries decoded operands, with
//! "advance" measured in instruction-index units rather than raw bytes.

use crate::value::Value;

/// The four indexed scopes an operand's location may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    CalleeArguments,
    Arguments,
    Local,
}

/// A value location: `(scope, index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub scope: Scope,
    pub index: u32,
}

impl Location {
    pub fn new(scope: Scope, index: u32) -> Self {
        Self { scope, index }
    }

    pub fn global(index: u32) -> Self {
        Self::new(Scope::Global, index)
    }

    pub fn local(index: u32) -> Self {
        Self::new(Scope::Local, index)
    }

    pub fn argument(index: u32) -> Self {
        Self::new(Scope::Arguments, index)
    }

    pub fn callee_argument(index: u32) -> Self {
        Self::new(Scope::CalleeArguments, index)
    }
}

/// One decoded instruction: an opcode plus up to two value-location
/// operands. `operand1` is always taken as-is — a raw jump offset, constant
/// index, or argument count depending on the opcode, never a location.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub op: crate::opcode::Operation,
    /// Raw first operand: a jump offset (instruction-index delta) or a
    /// constant-pool/argument-count literal, depending on `op`. Never a
    /// value location — see `retval_dest` for the return-value destination.
    pub operand1: i64,
    pub operand2: Option<Location>,
    pub operand3: Option<Location>,
    /// Where `vm.retval` is written back after a normal return.
    pub retval_dest: Option<Location>,
    /// Set on `CallPrepare` for constructor calls.
    pub ctor: bool,
    /// Declared argument count for `Call`.
    pub nargs: u16,
    /// A second raw operand. Only `TryStart` uses this, for the finally
    /// address (`operand1` carries the catch address); `-1` means absent.
    pub secondary: i64,
}

impl Instruction {
    pub fn new(op: crate::opcode::Operation) -> Self {
        Self {
            op,
            operand1: 0,
            operand2: None,
            operand3: None,
            retval_dest: None,
            ctor: false,
            nargs: 0,
            secondary: -1,
        }
    }

    pub fn with_operand1(mut self, value: i64) -> Self {
        self.operand1 = value;
        self
    }

    pub fn with_operand2(mut self, loc: Location) -> Self {
        self.operand2 = Some(loc);
        self
    }

    pub fn with_operand3(mut self, loc: Location) -> Self {
        self.operand3 = Some(loc);
        self
    }

    pub fn with_retval_dest(mut self, loc: Location) -> Self {
        self.retval_dest = Some(loc);
        self
    }

    pub fn as_ctor(mut self) -> Self {
        self.ctor = true;
        self
    }

    pub fn with_nargs(mut self, nargs: u16) -> Self {
        self.nargs = nargs;
        self
    }

    pub fn with_secondary(mut self, value: i64) -> Self {
        self.secondary = value;
        self
    }
}

/// A compiled program: one flat instruction stream plus its constant pool.
/// Literal operands reference the pool; function bodies are regions of the
/// same stream, addressed by a [`crate::function::Lambda`]'s entry index.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub instructions: Vec<Instruction>,
    pub constants: Vec<Value>,
    /// Locals count for the implicit top-level frame `Vm::run` starts in.
    pub top_level_locals: u32,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top_level_locals(mut self, count: u32) -> Self {
        self.top_level_locals = count;
        self
    }

    pub fn push(&mut self, instr: Instruction) -> usize {
        let index = self.instructions.len();
        self.instructions.push(instr);
        index
    }

    pub fn add_constant(&mut self, value: Value) -> usize {
        let index = self.constants.len();
        self.constants.push(value);
        index
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
