//! End-to-end tests driving the interpreter through hand-assembled scripts,
//! exercising the same call/property/exception paths a compiler's generated
//! bytecode would.

use esvm_core::arena::HeapRecord;
use esvm_core::array::ArrayStorage;
use esvm_core::error::VmError;
use esvm_core::function::{ClosureNative, Lambda, NativeOutcome};
use esvm_core::instruction::{Instruction, Location};
use esvm_core::interpreter::RunOutcome;
use esvm_core::object::Object;
use esvm_core::opcode::Operation;
use esvm_core::property::{self, PropertyKey};
use esvm_core::script_builder::ScriptBuilder;
use esvm_core::string_ref::JsString;
use esvm_core::value::Value;
use esvm_core::vm::Vm;
use esvm_core::{VmLimits, VmResult};

fn expect_number(v: Value) -> f64 {
    match v {
        Value::Number(n) => n,
        other => panic!("expected a number, got {other:?}"),
    }
}

fn expect_bool(v: Value) -> bool {
    match v {
        Value::Boolean(b) => b,
        other => panic!("expected a boolean, got {other:?}"),
    }
}

fn expect_string(v: Value) -> JsString {
    match v {
        Value::String(s) => s,
        other => panic!("expected a string, got {other:?}"),
    }
}

#[test]
fn arithmetic_precedence_follows_standard_rules() {
    // var a = 1 + 2 * 3; a -> 7
    let mut b = ScriptBuilder::new().with_top_level_locals(3);
    let c1 = b.add_constant(Value::Number(1.0));
    let c2 = b.add_constant(Value::Number(2.0));
    let c3 = b.add_constant(Value::Number(3.0));

    b.load_const(c1, Location::local(0));
    b.load_const(c2, Location::local(1));
    b.load_const(c3, Location::local(2));
    b.binary(Operation::Mul, Location::local(1), Location::local(2), Location::local(1));
    b.binary(Operation::Add, Location::local(0), Location::local(1), Location::local(0));
    b.return_value(Some(Location::local(0)));

    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();
    let outcome = vm.run(0, Vec::new()).unwrap();
    match outcome {
        RunOutcome::Completed(v) => assert_eq!(expect_number(v), 7.0),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn string_concatenation_tracks_codepoint_and_byte_length() {
    // var s = "a" + "b"; s.length -> 2; s = s + "\u{3b1}"; s.length -> 3, bytelength -> 4
    let mut b = ScriptBuilder::new().with_top_level_locals(4);
    let a = b.add_constant(Value::String(JsString::from_static("a")));
    let bee = b.add_constant(Value::String(JsString::from_static("b")));
    let alpha = b.add_constant(Value::String(JsString::from_static("\u{3b1}")));
    let length_name = b.add_constant(Value::String(JsString::from_static("length")));

    b.load_const(a, Location::local(0));
    b.load_const(bee, Location::local(1));
    b.binary(Operation::Add, Location::local(0), Location::local(1), Location::local(0));
    b.get_prop_named(Location::local(0), length_name, Location::local(2));
    b.move_value(Location::global(0), Location::local(2));

    b.load_const(alpha, Location::local(1));
    b.binary(Operation::Add, Location::local(0), Location::local(1), Location::local(0));
    b.get_prop_named(Location::local(0), length_name, Location::local(2));
    b.move_value(Location::global(1), Location::local(2));
    b.move_value(Location::global(2), Location::local(0));
    b.return_value(None);

    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();
    vm.run(0, Vec::new()).unwrap();

    assert_eq!(expect_number(vm.read_location(Location::global(0)).unwrap()), 2.0);
    assert_eq!(expect_number(vm.read_location(Location::global(1)).unwrap()), 3.0);
    let s = expect_string(vm.read_location(Location::global(2)).unwrap());
    assert_eq!(s.byte_len(), 4);
}

#[test]
fn property_set_delete_and_in_follow_object_protocol() {
    // var o = {x:1}; o.y = 2;
    // ("x" in o) && !("z" in o) && (delete o.x) && !("x" in o) -> true
    let mut b = ScriptBuilder::new().with_top_level_locals(3);
    let x_name = b.add_constant(Value::String(JsString::from_static("x")));
    let y_name = b.add_constant(Value::String(JsString::from_static("y")));
    let z_name = b.add_constant(Value::String(JsString::from_static("z")));
    let one = b.add_constant(Value::Number(1.0));
    let two = b.add_constant(Value::Number(2.0));

    b.new_object(Location::local(0));
    b.load_const(one, Location::local(1));
    b.set_prop_named(Location::local(0), x_name, Location::local(1));
    b.load_const(two, Location::local(1));
    b.set_prop_named(Location::local(0), y_name, Location::local(1));

    b.prop_in_named(Location::local(0), x_name, Location::local(2));
    b.move_value(Location::global(0), Location::local(2));
    b.prop_in_named(Location::local(0), z_name, Location::local(2));
    b.move_value(Location::global(1), Location::local(2));
    b.delete_prop_named(Location::local(0), x_name, Location::local(2));
    b.move_value(Location::global(2), Location::local(2));
    b.prop_in_named(Location::local(0), x_name, Location::local(2));
    b.move_value(Location::global(3), Location::local(2));
    b.return_value(None);

    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();
    vm.run(0, Vec::new()).unwrap();

    assert!(expect_bool(vm.read_location(Location::global(0)).unwrap()));
    assert!(!expect_bool(vm.read_location(Location::global(1)).unwrap()));
    assert!(expect_bool(vm.read_location(Location::global(2)).unwrap()));
    assert!(!expect_bool(vm.read_location(Location::global(3)).unwrap()));
}

#[test]
fn array_sparse_tail_preserves_insertion_order() {
    // var a = [10,20,30]; a[5] = 99; a.length -> 6; a[3] -> undefined;
    // iteration visits 0,1,2,5 in that order.
    let mut b = ScriptBuilder::new().with_top_level_locals(4);
    let idx0 = b.add_constant(Value::Number(0.0));
    let idx1 = b.add_constant(Value::Number(1.0));
    let idx2 = b.add_constant(Value::Number(2.0));
    let idx3 = b.add_constant(Value::Number(3.0));
    let idx5 = b.add_constant(Value::Number(5.0));
    let c10 = b.add_constant(Value::Number(10.0));
    let c20 = b.add_constant(Value::Number(20.0));
    let c30 = b.add_constant(Value::Number(30.0));
    let c99 = b.add_constant(Value::Number(99.0));
    let length_name = b.add_constant(Value::String(JsString::from_static("length")));

    b.new_array(Location::local(0));
    b.load_const(c10, Location::local(1));
    b.set_prop_named(Location::local(0), idx0, Location::local(1));
    b.load_const(c20, Location::local(1));
    b.set_prop_named(Location::local(0), idx1, Location::local(1));
    b.load_const(c30, Location::local(1));
    b.set_prop_named(Location::local(0), idx2, Location::local(1));

    b.load_const(idx5, Location::local(2));
    b.load_const(c99, Location::local(1));
    b.set_prop_computed(Location::local(0), Location::local(2), Location::local(1));

    b.get_prop_named(Location::local(0), length_name, Location::local(3));
    b.move_value(Location::global(0), Location::local(3));

    b.load_const(idx3, Location::local(2));
    b.get_prop_computed(Location::local(0), Location::local(2), Location::local(3));
    b.move_value(Location::global(1), Location::local(3));

    b.move_value(Location::global(2), Location::local(0));
    b.return_value(None);

    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();
    vm.run(0, Vec::new()).unwrap();

    assert_eq!(expect_number(vm.read_location(Location::global(0)).unwrap()), 6.0);
    assert!(vm.read_location(Location::global(1)).unwrap().is_undefined());

    let array = vm.read_location(Location::global(2)).unwrap();
    let keys = property::enumerate(&vm, &array).unwrap();
    let indices: Vec<String> = keys.iter().map(|k| k.as_str_lossy().into_owned()).collect();
    assert_eq!(indices, vec!["0", "1", "2", "5"]);
}

#[test]
fn value_of_trap_wins_over_to_string_when_it_returns_a_primitive() {
    // var o = { valueOf: function(){ return 7 } }; 1 + o -> 8
    let mut b = ScriptBuilder::new().with_top_level_locals(2);
    let one = b.add_constant(Value::Number(1.0));
    b.load_const(one, Location::local(0));
    b.binary(Operation::Add, Location::local(0), Location::global(0), Location::local(1));
    b.move_value(Location::global(1), Location::local(1));
    b.return_value(None);

    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();

    let value_of = ClosureNative(|_vm: &mut Vm, _this: Value, _args: &[Value]| -> VmResult<NativeOutcome> {
        Ok(NativeOutcome::Return(Value::Number(7.0)))
    });
    let native_id = vm
        .arena
        .alloc(HeapRecord::Native(Object::new(Some(vm.prototypes.function)), std::rc::Rc::new(value_of)), &vm.limits)
        .unwrap();
    let obj_id = vm.arena.alloc(HeapRecord::Plain(Object::new(Some(vm.prototypes.object))), &vm.limits).unwrap();
    property::set(
        &mut vm,
        &Value::Object(obj_id),
        &PropertyKey::new(JsString::from_static("valueOf")),
        Value::NativeFunction(native_id),
    )
    .unwrap();
    vm.globals.push(Value::Object(obj_id));

    vm.run(0, Vec::new()).unwrap();
    assert_eq!(expect_number(vm.read_location(Location::global(1)).unwrap()), 8.0);
}

#[test]
fn falls_back_to_to_string_when_value_of_returns_an_object() {
    // valueOf returns {}; toString returns "z"; 1 + o -> "1z"
    let mut b = ScriptBuilder::new().with_top_level_locals(2);
    let one = b.add_constant(Value::Number(1.0));
    b.load_const(one, Location::local(0));
    b.binary(Operation::Add, Location::local(0), Location::global(0), Location::local(1));
    b.move_value(Location::global(1), Location::local(1));
    b.return_value(None);

    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();

    let value_of = ClosureNative(|vm: &mut Vm, _this: Value, _args: &[Value]| -> VmResult<NativeOutcome> {
        let id = vm.arena.alloc(HeapRecord::Plain(Object::new(Some(vm.prototypes.object))), &vm.limits)?;
        Ok(NativeOutcome::Return(Value::Object(id)))
    });
    let to_string = ClosureNative(|_vm: &mut Vm, _this: Value, _args: &[Value]| -> VmResult<NativeOutcome> {
        Ok(NativeOutcome::Return(Value::String(JsString::from_static("z"))))
    });

    let value_of_id = vm
        .arena
        .alloc(HeapRecord::Native(Object::new(Some(vm.prototypes.function)), std::rc::Rc::new(value_of)), &vm.limits)
        .unwrap();
    let to_string_id = vm
        .arena
        .alloc(HeapRecord::Native(Object::new(Some(vm.prototypes.function)), std::rc::Rc::new(to_string)), &vm.limits)
        .unwrap();
    let obj_id = vm.arena.alloc(HeapRecord::Plain(Object::new(Some(vm.prototypes.object))), &vm.limits).unwrap();
    property::set(
        &mut vm,
        &Value::Object(obj_id),
        &PropertyKey::new(JsString::from_static("valueOf")),
        Value::NativeFunction(value_of_id),
    )
    .unwrap();
    property::set(
        &mut vm,
        &Value::Object(obj_id),
        &PropertyKey::new(JsString::from_static("toString")),
        Value::NativeFunction(to_string_id),
    )
    .unwrap();
    vm.globals.push(Value::Object(obj_id));

    vm.run(0, Vec::new()).unwrap();
    let s = expect_string(vm.read_location(Location::global(1)).unwrap());
    assert_eq!(s.as_str_lossy(), "1z");
}

#[test]
fn nested_try_finally_runs_before_outer_catch() {
    // try { try { throw 1 } finally { /* no rethrow */ } } catch(e) { e } -> 1
    let mut b = ScriptBuilder::new().with_top_level_locals(2);
    let one = b.add_constant(Value::Number(1.0));
    let outer_catch = b.new_label();
    let inner_finally = b.new_label();
    let after = b.new_label();

    b.try_start(Some(outer_catch), None);
    b.try_start(None, Some(inner_finally));
    b.load_const(one, Location::local(1));
    b.throw_value(Location::local(1));
    b.mark(inner_finally);
    b.try_end(); // inner: empty finally body, then rethrows via pending_rethrow
    b.try_end(); // outer: reached only on normal (non-throwing) completion
    b.jump(after);
    b.mark(outer_catch);
    b.catch_value(Some(Location::local(0)));
    b.try_end();
    b.mark(after);
    b.move_value(Location::global(0), Location::local(0));
    b.return_value(None);

    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();
    vm.run(0, Vec::new()).unwrap();
    assert_eq!(expect_number(vm.read_location(Location::global(0)).unwrap()), 1.0);
}

#[test]
fn finally_return_suppresses_pending_rethrow() {
    // try { try { throw 1 } finally { return 99 } } catch(e) { e } -> 99, catch never runs
    let mut b = ScriptBuilder::new().with_top_level_locals(2);
    let one = b.add_constant(Value::Number(1.0));
    let ninety_nine = b.add_constant(Value::Number(99.0));
    let outer_catch = b.new_label();
    let inner_finally = b.new_label();

    b.try_start(Some(outer_catch), None);
    b.try_start(None, Some(inner_finally));
    b.load_const(one, Location::local(1));
    b.throw_value(Location::local(1));
    b.mark(inner_finally);
    b.load_const(ninety_nine, Location::local(1));
    b.return_value(Some(Location::local(1)));
    b.mark(outer_catch);
    b.catch_value(Some(Location::local(0)));
    b.try_end();
    b.return_value(None);

    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();
    let outcome = vm.run(0, Vec::new()).unwrap();
    match outcome {
        RunOutcome::Completed(v) => assert_eq!(expect_number(v), 99.0),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn scripted_call_does_not_disturb_caller_scope() {
    let mut b = ScriptBuilder::new().with_top_level_locals(3);
    let c10 = b.add_constant(Value::Number(10.0));
    let c20 = b.add_constant(Value::Number(20.0));
    let c42 = b.add_constant(Value::Number(42.0));

    let callee_entry = b.push(Instruction::new(Operation::LoadConst).with_operand1(c42).with_operand2(Location::local(0)));
    b.return_value(Some(Location::local(0)));

    let top_level_entry = b.push(Instruction::new(Operation::LoadConst).with_operand1(c10).with_operand2(Location::local(0)));
    b.load_const(c20, Location::local(1));
    b.call_prepare(0);
    b.call(Location::global(0), None, 0, Some(Location::local(2)), false);
    b.move_value(Location::global(1), Location::local(0));
    b.move_value(Location::global(2), Location::local(1));
    b.move_value(Location::global(3), Location::local(2));
    b.return_value(None);

    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();
    let lambda = Lambda {
        name: None,
        entry: callee_entry,
        param_count: 0,
        locals_count: 1,
        is_ctor: false,
    };
    let fn_id = vm.arena.alloc(HeapRecord::Function(Object::new(Some(vm.prototypes.function)), lambda), &vm.limits).unwrap();
    vm.globals.push(Value::Function(fn_id));

    vm.run(top_level_entry, Vec::new()).unwrap();

    assert_eq!(expect_number(vm.read_location(Location::global(1)).unwrap()), 10.0);
    assert_eq!(expect_number(vm.read_location(Location::global(2)).unwrap()), 20.0);
    assert_eq!(expect_number(vm.read_location(Location::global(3)).unwrap()), 42.0);
}

#[test]
fn frame_depth_limit_surfaces_as_uncaught_type_error() {
    let mut b = ScriptBuilder::new().with_top_level_locals(1);
    b.call_prepare(0);
    b.call(Location::global(0), None, 0, Some(Location::local(0)), false);
    b.return_value(Some(Location::local(0)));

    let limits = VmLimits {
        max_frame_depth: 8,
        ..VmLimits::default()
    };
    let mut vm = Vm::new(b.build(), limits).unwrap();
    let lambda = Lambda {
        name: None,
        entry: 0,
        param_count: 0,
        locals_count: 1,
        is_ctor: false,
    };
    let fn_id = vm.arena.alloc(HeapRecord::Function(Object::new(Some(vm.prototypes.function)), lambda), &vm.limits).unwrap();
    vm.globals.push(Value::Function(fn_id));

    let outcome = vm.run(0, Vec::new()).unwrap();
    match outcome {
        RunOutcome::Uncaught(Value::String(s)) => {
            let text = s.as_str_lossy();
            assert!(text.contains("TypeError"));
            assert!(text.contains("frame depth"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn typeof_of_typeof_is_always_string() {
    let mut b = ScriptBuilder::new().with_top_level_locals(2);
    let c = b.add_constant(Value::Number(1.0));
    b.load_const(c, Location::local(0));
    b.unary(Operation::TypeOf, Location::local(0), Location::local(1));
    b.unary(Operation::TypeOf, Location::local(1), Location::local(1));
    b.return_value(Some(Location::local(1)));

    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();
    let outcome = vm.run(0, Vec::new()).unwrap();
    match outcome {
        RunOutcome::Completed(v) => assert_eq!(expect_string(v).as_str_lossy(), "string"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn array_storage_set_beyond_length_leaves_reachable_holes() {
    let mut storage = ArrayStorage::from_values(vec![Value::Number(1.0)]);
    storage.set(4, Value::Number(2.0), u32::MAX).unwrap();
    assert_eq!(storage.length(), 5);
    assert!(storage.get(2).is_invalid());
    let err = storage.set(0, Value::Number(0.0), 0).unwrap_err();
    assert!(matches!(err, VmError::RangeError(_)));
}

fn instanceof_script() -> ScriptBuilder {
    let mut b = ScriptBuilder::new().with_top_level_locals(1);
    b.binary(Operation::Instanceof, Location::global(0), Location::global(1), Location::local(0));
    b.return_value(Some(Location::local(0)));
    b
}

#[test]
fn instanceof_true_when_object_inherits_constructor_prototype() {
    let b = instanceof_script();
    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();

    let lambda = Lambda { name: None, entry: 0, param_count: 0, locals_count: 0, is_ctor: true };
    let ctor_id = vm.arena.alloc(HeapRecord::Function(Object::new(Some(vm.prototypes.function)), lambda), &vm.limits).unwrap();
    let proto_id = vm.arena.alloc(HeapRecord::Plain(Object::new(Some(vm.prototypes.object))), &vm.limits).unwrap();
    property::set(&mut vm, &Value::Function(ctor_id), &PropertyKey::new(JsString::from_static("prototype")), Value::Object(proto_id)).unwrap();
    let instance_id = vm.arena.alloc(HeapRecord::Plain(Object::new(Some(proto_id))), &vm.limits).unwrap();

    vm.globals.push(Value::Object(instance_id));
    vm.globals.push(Value::Function(ctor_id));

    match vm.run(0, Vec::new()).unwrap() {
        RunOutcome::Completed(v) => assert!(expect_bool(v)),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn instanceof_false_when_prototype_chain_does_not_match() {
    let b = instanceof_script();
    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();

    let lambda = Lambda { name: None, entry: 0, param_count: 0, locals_count: 0, is_ctor: true };
    let ctor_id = vm.arena.alloc(HeapRecord::Function(Object::new(Some(vm.prototypes.function)), lambda), &vm.limits).unwrap();
    let proto_id = vm.arena.alloc(HeapRecord::Plain(Object::new(Some(vm.prototypes.object))), &vm.limits).unwrap();
    property::set(&mut vm, &Value::Function(ctor_id), &PropertyKey::new(JsString::from_static("prototype")), Value::Object(proto_id)).unwrap();
    let unrelated_id = vm.arena.alloc(HeapRecord::Plain(Object::new(Some(vm.prototypes.object))), &vm.limits).unwrap();

    vm.globals.push(Value::Object(unrelated_id));
    vm.globals.push(Value::Function(ctor_id));

    match vm.run(0, Vec::new()).unwrap() {
        RunOutcome::Completed(v) => assert!(!expect_bool(v)),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn instanceof_false_when_constructor_lacks_prototype_property() {
    let b = instanceof_script();
    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();

    let lambda = Lambda { name: None, entry: 0, param_count: 0, locals_count: 0, is_ctor: true };
    let ctor_id = vm.arena.alloc(HeapRecord::Function(Object::new(Some(vm.prototypes.function)), lambda), &vm.limits).unwrap();
    let instance_id = vm.arena.alloc(HeapRecord::Plain(Object::new(Some(vm.prototypes.object))), &vm.limits).unwrap();

    vm.globals.push(Value::Object(instance_id));
    vm.globals.push(Value::Function(ctor_id));

    match vm.run(0, Vec::new()).unwrap() {
        RunOutcome::Completed(v) => assert!(!expect_bool(v)),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn instanceof_on_non_function_rhs_is_a_type_error() {
    let b = instanceof_script();
    let mut vm = Vm::new(b.build(), VmLimits::default()).unwrap();

    vm.globals.push(Value::Number(1.0));
    vm.globals.push(Value::Number(2.0));

    match vm.run(0, Vec::new()).unwrap() {
        RunOutcome::Uncaught(Value::String(s)) => assert!(s.as_str_lossy().contains("TypeError")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}
