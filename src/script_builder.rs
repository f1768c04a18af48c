//! A utility for hand-assembling [`Script`]s without an external compiler.
//!
//! There is no lexer/parser/bytecode-assembler in this crate — callers who
//! want to drive a [`crate::vm::Vm`] either build a `Script` directly or use
//! this builder, which adds constant-pool deduplication and forward-jump
//! labels on top of the raw [`Instruction`] API. Mainly useful for tests.

use crate::instruction::{Instruction, Location, Script};
use crate::opcode::Operation;
use crate::value::Value;

/// An unresolved jump/try target. Opaque; only meaningful to the builder
/// that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

enum Fixup {
    /// `operand1` of the instruction at `site` becomes `target - site`.
    Relative { site: usize },
    /// `operand1` of the instruction at `site` becomes `target` itself.
    Absolute { site: usize },
    /// `secondary` of the instruction at `site` becomes `target` itself.
    AbsoluteSecondary { site: usize },
}

/// Builds a [`Script`] instruction by instruction, resolving labels to
/// addresses when [`ScriptBuilder::build`] is called.
pub struct ScriptBuilder {
    script: Script,
    labels: Vec<Option<usize>>,
    fixups: Vec<(Label, Fixup)>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self { script: Script::new(), labels: Vec::new(), fixups: Vec::new() }
    }

    pub fn with_top_level_locals(mut self, count: u32) -> Self {
        self.script.top_level_locals = count;
        self
    }

    /// Reserves a label with no address yet. Resolve it with [`Self::mark`]
    /// before calling [`Self::build`].
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Binds a label to the next instruction that will be pushed.
    pub fn mark(&mut self, label: Label) -> &mut Self {
        self.labels[label.0] = Some(self.script.len());
        self
    }

    pub fn add_constant(&mut self, value: Value) -> i64 {
        self.script.add_constant(value) as i64
    }

    /// Pushes a raw instruction, returning its index.
    pub fn push(&mut self, instr: Instruction) -> usize {
        self.script.push(instr)
    }

    pub fn load_const(&mut self, index: i64, dest: Location) -> &mut Self {
        self.push(Instruction::new(Operation::LoadConst).with_operand1(index).with_operand2(dest));
        self
    }

    pub fn move_value(&mut self, dest: Location, src: Location) -> &mut Self {
        self.push(Instruction::new(Operation::Move).with_operand2(dest).with_operand3(src));
        self
    }

    pub fn new_object(&mut self, dest: Location) -> &mut Self {
        self.push(Instruction::new(Operation::NewObject).with_operand2(dest));
        self
    }

    pub fn new_array(&mut self, dest: Location) -> &mut Self {
        self.push(Instruction::new(Operation::NewArray).with_operand2(dest));
        self
    }

    pub fn binary(&mut self, op: Operation, left: Location, right: Location, dest: Location) -> &mut Self {
        self.push(Instruction::new(op).with_operand2(left).with_operand3(right).with_retval_dest(dest));
        self
    }

    pub fn unary(&mut self, op: Operation, operand: Location, dest: Location) -> &mut Self {
        self.push(Instruction::new(op).with_operand2(operand).with_retval_dest(dest));
        self
    }

    pub fn get_prop_named(&mut self, receiver: Location, name_const: i64, dest: Location) -> &mut Self {
        self.push(Instruction::new(Operation::GetProp).with_operand1(name_const).with_operand2(receiver).with_retval_dest(dest));
        self
    }

    pub fn get_prop_computed(&mut self, receiver: Location, key: Location, dest: Location) -> &mut Self {
        self.push(Instruction::new(Operation::GetProp).with_operand2(receiver).with_operand3(key).with_retval_dest(dest));
        self
    }

    pub fn set_prop_named(&mut self, receiver: Location, name_const: i64, value: Location) -> &mut Self {
        self.push(Instruction::new(Operation::SetProp).with_operand1(name_const).with_operand2(receiver).with_retval_dest(value));
        self
    }

    pub fn set_prop_computed(&mut self, receiver: Location, key: Location, value: Location) -> &mut Self {
        self.push(Instruction::new(Operation::SetProp).with_operand2(receiver).with_operand3(key).with_retval_dest(value));
        self
    }

    pub fn delete_prop_named(&mut self, receiver: Location, name_const: i64, dest: Location) -> &mut Self {
        self.push(Instruction::new(Operation::DeleteProp).with_operand1(name_const).with_operand2(receiver).with_retval_dest(dest));
        self
    }

    pub fn prop_in_named(&mut self, receiver: Location, name_const: i64, dest: Location) -> &mut Self {
        self.push(Instruction::new(Operation::PropIn).with_operand1(name_const).with_operand2(receiver).with_retval_dest(dest));
        self
    }

    /// Unconditional jump to `label`.
    pub fn jump(&mut self, label: Label) -> &mut Self {
        let site = self.push(Instruction::new(Operation::Jump));
        self.fixups.push((label, Fixup::Relative { site }));
        self
    }

    pub fn jump_if_true(&mut self, condition: Location, label: Label) -> &mut Self {
        let site = self.push(Instruction::new(Operation::JumpIfTrue).with_operand2(condition));
        self.fixups.push((label, Fixup::Relative { site }));
        self
    }

    pub fn jump_if_false(&mut self, condition: Location, label: Label) -> &mut Self {
        let site = self.push(Instruction::new(Operation::JumpIfFalse).with_operand2(condition));
        self.fixups.push((label, Fixup::Relative { site }));
        self
    }

    pub fn call_prepare(&mut self, nargs: u16) -> &mut Self {
        self.push(Instruction::new(Operation::CallPrepare).with_operand1(nargs as i64));
        self
    }

    pub fn stage_argument(&mut self, index: u32, src: Location) -> &mut Self {
        self.move_value(Location::callee_argument(index), src)
    }

    pub fn call(&mut self, callee: Location, this: Option<Location>, nargs: u16, dest: Option<Location>, ctor: bool) -> &mut Self {
        let mut instr = Instruction::new(Operation::Call).with_operand2(callee).with_nargs(nargs);
        if let Some(this) = this {
            instr = instr.with_operand3(this);
        }
        if let Some(dest) = dest {
            instr = instr.with_retval_dest(dest);
        }
        if ctor {
            instr = instr.as_ctor();
        }
        self.push(instr);
        self
    }

    pub fn return_value(&mut self, value: Option<Location>) -> &mut Self {
        let mut instr = Instruction::new(Operation::Return);
        if let Some(value) = value {
            instr = instr.with_operand2(value);
        }
        self.push(instr);
        self
    }

    /// Opens a try block. Either label may be left unmarked-but-unused by
    /// passing `None`, meaning that handler is absent.
    pub fn try_start(&mut self, catch: Option<Label>, finally: Option<Label>) -> &mut Self {
        // `Instruction::new` defaults `operand1` to 0, but `TryStart` treats
        // a non-negative `operand1` as a present catch address — start from
        // the same "-1 means absent" sentinel `secondary` already uses.
        let site = self.push(Instruction::new(Operation::TryStart).with_operand1(-1));
        if let Some(label) = catch {
            self.fixups.push((label, Fixup::Absolute { site }));
        }
        if let Some(label) = finally {
            self.fixups.push((label, Fixup::AbsoluteSecondary { site }));
        }
        self
    }

    pub fn try_end(&mut self) -> &mut Self {
        self.push(Instruction::new(Operation::TryEnd));
        self
    }

    pub fn catch_value(&mut self, dest: Option<Location>) -> &mut Self {
        let mut instr = Instruction::new(Operation::Catch);
        if let Some(dest) = dest {
            instr = instr.with_operand2(dest);
        }
        self.push(instr);
        self
    }

    pub fn finally_marker(&mut self) -> &mut Self {
        self.push(Instruction::new(Operation::Finally));
        self
    }

    pub fn throw_value(&mut self, value: Location) -> &mut Self {
        self.push(Instruction::new(Operation::Throw).with_operand2(value));
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.push(Instruction::new(Operation::Stop));
        self
    }

    /// Resolves every label reference and returns the finished script.
    /// Panics if a label was referenced but never [`Self::mark`]ed — a
    /// builder bug, not a runtime condition.
    pub fn build(mut self) -> Script {
        for (label, fixup) in &self.fixups {
            let target = self.labels[label.0].unwrap_or_else(|| panic!("label {} never marked", label.0));
            match *fixup {
                Fixup::Relative { site } => {
                    let delta = target as i64 - site as i64;
                    self.script.instructions[site].operand1 = delta;
                }
                Fixup::Absolute { site } => {
                    self.script.instructions[site].operand1 = target as i64;
                }
                Fixup::AbsoluteSecondary { site } => {
                    self.script.instructions[site].secondary = target as i64;
                }
            }
        }
        self.script
    }
}

impl Default for ScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
