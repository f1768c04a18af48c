//! The embedder-facing API: constructing a VM, registering externals,
//! running a compiled script to completion or suspension, and reading back
//! results.

use std::rc::Rc;

use crate::arena::{Arena, HeapRecord};
use crate::error::{VmError, VmResult};
use crate::external::ExternalOps;
use crate::frame::{Frame, Location, Scope};
use crate::instruction::Script;
use crate::interpreter::{self, RunOutcome};
use crate::limits::VmLimits;
use crate::object::{build_shared_table, Object, PropertyRecord};
use crate::string_ref::JsString;
use crate::value::{ObjectId, Value};

/// The built-in prototype objects every value's type implicitly chains to.
#[derive(Debug, Clone, Copy)]
pub struct Prototypes {
    pub object: ObjectId,
    pub array: ObjectId,
    pub function: ObjectId,
    pub string: ObjectId,
    pub boolean: ObjectId,
    pub number: ObjectId,
    pub regexp: ObjectId,
}

/// One interpreter instance: heap, frame stack, prototypes, and the script
/// being executed. Strictly single-threaded; nothing here is `Send`.
#[derive(Debug)]
pub struct Vm {
    pub arena: Arena,
    pub limits: VmLimits,
    pub frames: Vec<Frame>,
    pub globals: Vec<Value>,
    pub script: Rc<Script>,
    pub prototypes: Prototypes,
    pub retval: Value,
    /// The in-flight exception, mirroring `vm->exception` in a C engine:
    /// set by `Throw` or by any failing operation, consumed by `Catch`.
    pub exception: Option<Value>,
}

impl Vm {
    pub fn new(script: Script, limits: VmLimits) -> VmResult<Self> {
        let mut arena = Arena::new();
        let prototypes = bootstrap_prototypes(&mut arena, &limits)?;
        Ok(Self {
            arena,
            limits,
            frames: Vec::new(),
            globals: Vec::new(),
            script: Rc::new(script),
            prototypes,
            retval: Value::Undefined,
            exception: None,
        })
    }

    /// Installs a host-provided external object as a new global slot,
    /// returning the slot index so script bytecode can address it.
    pub fn register_external(&mut self, ops: Rc<dyn ExternalOps>) -> u32 {
        let index = self.globals.len() as u32;
        self.globals.push(Value::External(crate::external::ExternalObject::new(ops)));
        index
    }

    /// Runs the script from `entry` with `arguments` bound as the top-level
    /// frame's `Arguments` scope, until completion, suspension, or an
    /// uncaught exception.
    pub fn run(&mut self, entry: usize, arguments: Vec<Value>) -> VmResult<RunOutcome> {
        let locals = self.script.top_level_locals;
        let frame = Frame::new_scripted(entry, locals, arguments, Value::Undefined, None, false);
        self.frames.push(frame);
        interpreter::run(self)
    }

    /// Resumes after a previous `run`/`resume` returned [`RunOutcome::Again`].
    pub fn resume(&mut self) -> VmResult<RunOutcome> {
        interpreter::run(self)
    }

    pub fn retval(&self) -> &Value {
        &self.retval
    }

    /// Coerces `value` to a string view without invoking user script (no
    /// active frame is available to call a user `toString`/`valueOf` from
    /// this entry point — an embedder wanting that conversion calls into
    /// the script to do it and reads the result here instead).
    pub fn value_as_string(&self, value: &Value) -> VmResult<JsString> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Null => Ok(JsString::from_static("null")),
            Value::Undefined | Value::Invalid => Ok(JsString::from_static("undefined")),
            Value::Boolean(b) => Ok(JsString::from_owned(if *b { "true" } else { "false" }.to_string())),
            Value::Number(n) => Ok(JsString::from_owned(format_number(*n))),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::NativeFunction(_) | Value::RegExp(_) => {
                Err(VmError::type_error(
                    "cannot coerce an object to a string without running script",
                ))
            }
            Value::External(_) => Err(VmError::type_error("cannot coerce an external value to a string")),
        }
    }

    pub fn read_location(&self, loc: Location) -> VmResult<Value> {
        match loc.scope {
            Scope::Global => Ok(self.globals.get(loc.index as usize).cloned().unwrap_or(Value::Undefined)),
            Scope::Local | Scope::Arguments | Scope::CalleeArguments => {
                let frame = self
                    .frames
                    .last()
                    .ok_or_else(|| VmError::reference_error("no active frame"))?;
                match loc.scope {
                    Scope::Local => slot(&frame.locals, loc),
                    Scope::Arguments => slot(&frame.arguments, loc),
                    Scope::CalleeArguments => slot(&frame.callee_arguments, loc),
                    Scope::Global => unreachable!(),
                }
            }
        }
    }

    pub fn write_location(&mut self, loc: Location, value: Value) -> VmResult<()> {
        match loc.scope {
            Scope::Global => {
                let index = loc.index as usize;
                if index >= self.globals.len() {
                    self.globals.resize(index + 1, Value::Undefined);
                }
                self.globals[index] = value;
                Ok(())
            }
            Scope::Local | Scope::Arguments | Scope::CalleeArguments => {
                let frame = self
                    .frames
                    .last_mut()
                    .ok_or_else(|| VmError::reference_error("no active frame"))?;
                let target = match loc.scope {
                    Scope::Local => &mut frame.locals,
                    Scope::Arguments => &mut frame.arguments,
                    Scope::CalleeArguments => &mut frame.callee_arguments,
                    Scope::Global => unreachable!(),
                };
                let index = loc.index as usize;
                if index >= target.len() {
                    target.resize(index + 1, Value::Invalid);
                }
                target[index] = value;
                Ok(())
            }
        }
    }
}

fn slot(values: &[Value], loc: Location) -> VmResult<Value> {
    values.get(loc.index as usize).cloned().ok_or_else(|| VmError::SlotOutOfRange {
        scope: loc.scope,
        index: loc.index,
        len: values.len() as u32,
    })
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn bootstrap_prototypes(arena: &mut Arena, limits: &VmLimits) -> VmResult<Prototypes> {
    let object = arena.alloc(HeapRecord::Plain(object_prototype()), limits)?;
    let array = arena.alloc(HeapRecord::Plain(Object::new(Some(object))), limits)?;
    let function = arena.alloc(HeapRecord::Plain(Object::new(Some(object))), limits)?;
    let string = arena.alloc(HeapRecord::Plain(Object::new(Some(object))), limits)?;
    let boolean = arena.alloc(HeapRecord::Plain(Object::new(Some(object))), limits)?;
    let number = arena.alloc(HeapRecord::Plain(Object::new(Some(object))), limits)?;
    let regexp = arena.alloc(HeapRecord::Plain(Object::new(Some(object))), limits)?;
    Ok(Prototypes {
        object,
        array,
        function,
        string,
        boolean,
        number,
        regexp,
    })
}

/// `Object.prototype` carries one shared built-in, `toString`, purely to
/// exercise (and document) copy-on-first-access: the first read of
/// `anyObject.toString` clones this record into the receiver's own table.
fn object_prototype() -> Object {
    let to_string = PropertyRecord {
        name: JsString::from_static("toString"),
        value: Value::String(JsString::from_static("[object Object]")),
        kind: crate::object::PropertyKind::Method,
        attributes: crate::object::Attributes::default(),
    };
    let shared = build_shared_table([(JsString::from_static("toString"), to_string)]);
    Object::with_shared(None, shared)
}
