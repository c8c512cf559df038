//! Observable behaviour of woven setters, checked by executing them.

use setterweave_core::exec::{Machine, Value};
use setterweave_core::{
    Error as CoreError, Instruction, MethodBody, MethodDef, MethodRef, Module,
    OpCode, Operand, TypeDef, TypeSig, count_exit_points,
};
use setterweave_tests::{
    NAMESPACE, WIDGET, guarded_setter, hook, init_tracing, marker, module_with, replace_setter,
    two_exit_setter, widget, widget_module, with_auto_property,
};
use setterweave_weaver::{DiagnosticCode, Diagnostics, WeaverConfig, weave_module};

fn woven(mut module: Module) -> Module {
    init_tracing();
    let mut sink = Diagnostics::new();
    let outcome = weave_module(&mut module, &WeaverConfig::default(), &mut sink).unwrap();
    assert_eq!(outcome.instrumented, 1);
    assert!(!sink.has_errors());
    module
}

/// Sets `X` and returns the `(previous, current)` pairs the hook saw.
fn set_and_observe(machine: &mut Machine<'_>, this: Value, value: i32) -> Vec<(Value, Value)> {
    machine.clear_calls();
    machine
        .invoke(&MethodRef::new(WIDGET, "set_X"), vec![this, Value::Int(value)])
        .unwrap();
    machine
        .calls_to("OnXChanged")
        .map(|call| (call.arguments[1].clone(), call.arguments[2].clone()))
        .collect()
}

#[test]
fn setting_x_from_2_to_5_calls_hook_once_with_both_values() {
    let module = woven(widget_module());
    let ty = module.find_type(WIDGET).unwrap();
    assert!(ty.method("OnXChanged").unwrap().attributes.is_empty());

    let mut machine = Machine::new(&module);
    let this = machine.instantiate(WIDGET).unwrap();
    machine.set_field(this, "<X>k__BackingField", Value::Int(2));

    let seen = set_and_observe(&mut machine, Value::Object(this), 5);
    assert_eq!(seen, vec![(Value::Int(2), Value::Int(5))]);
    assert_eq!(machine.field(this, "<X>k__BackingField"), Some(&Value::Int(5)));
}

#[test]
fn hook_runs_after_the_assignment_on_both_paths_of_a_guard() {
    let ty = widget();
    let body = guarded_setter(&ty, "X");
    let module = woven(module_with([replace_setter(ty, "X", body)]));

    let mut machine = Machine::new(&module);
    let this = machine.instantiate(WIDGET).unwrap();

    // Changed value: falls through the store.
    assert_eq!(
        set_and_observe(&mut machine, Value::Object(this), 7),
        vec![(Value::Int(0), Value::Int(7))]
    );
    // Same value: the branch skips the store but still reaches the hook.
    assert_eq!(
        set_and_observe(&mut machine, Value::Object(this), 7),
        vec![(Value::Int(7), Value::Int(7))]
    );
}

#[test]
fn every_return_point_gets_its_own_call() {
    let ty = widget();
    let body = two_exit_setter(&ty, "X");
    let module = woven(module_with([replace_setter(ty, "X", body)]));

    let setter = module.find_type(WIDGET).unwrap().method("set_X").unwrap();
    let body = setter.body.as_ref().unwrap();
    assert_eq!(count_exit_points(body), 2);
    let ops: Vec<OpCode> = body.iter().map(|(_, i)| i.op).collect();
    let calls_before_ret = ops
        .windows(2)
        .filter(|pair| **pair == [OpCode::Callvirt, OpCode::Ret])
        .count();
    assert_eq!(calls_before_ret, 2);

    let mut machine = Machine::new(&module);
    let this = machine.instantiate(WIDGET).unwrap();
    machine.set_field(this, "<X>k__BackingField", Value::Int(3));
    assert_eq!(
        set_and_observe(&mut machine, Value::Object(this), 0),
        vec![(Value::Int(3), Value::Int(-1))]
    );
    assert_eq!(
        set_and_observe(&mut machine, Value::Object(this), 8),
        vec![(Value::Int(-1), Value::Int(8))]
    );
}

#[test]
fn ret_as_first_instruction_is_instrumented() {
    let ty = replace_setter(widget(), "X", MethodBody::from_instructions([Instruction::ret()]));
    let module = woven(module_with([ty]));

    let mut machine = Machine::new(&module);
    let this = machine.instantiate(WIDGET).unwrap();
    assert_eq!(
        set_and_observe(&mut machine, Value::Object(this), 4),
        vec![(Value::Int(0), Value::Int(0))]
    );
}

#[test]
fn hook_can_overwrite_the_new_value_through_the_reference() {
    let mut ty = widget();
    // current = previous
    let hook = ty.methods.iter_mut().find(|m| m.name == "OnXChanged").unwrap();
    hook.body = Some(MethodBody::from_instructions([
        Instruction::ldarg(2),
        Instruction::ldarg(1),
        Instruction::new(OpCode::Stind, Operand::None),
        Instruction::ret(),
    ]));
    let module = woven(module_with([ty]));

    let mut machine = Machine::new(&module);
    let this = machine.instantiate(WIDGET).unwrap();
    machine.set_field(this, "<X>k__BackingField", Value::Int(1));
    set_and_observe(&mut machine, Value::Object(this), 9);
    assert_eq!(machine.field(this, "<X>k__BackingField"), Some(&Value::Int(1)));
}

#[test]
fn second_pass_changes_nothing_and_says_nothing() {
    let mut module = woven(widget_module());
    let once = module.clone();

    let mut sink = Diagnostics::new();
    let outcome = weave_module(&mut module, &WeaverConfig::default(), &mut sink).unwrap();
    assert!(!outcome.mutated());
    assert!(sink.is_empty());
    assert_eq!(module, once);

    let mut machine = Machine::new(&module);
    let this = machine.instantiate(WIDGET).unwrap();
    assert_eq!(set_and_observe(&mut machine, Value::Object(this), 1).len(), 1);
}

#[test]
fn wired_hook_is_reported_with_full_names() {
    let mut module = widget_module();
    let mut sink = Diagnostics::new();
    weave_module(&mut module, &WeaverConfig::default(), &mut sink).unwrap();

    let wired: Vec<_> = sink
        .entries()
        .iter()
        .filter(|d| d.code == DiagnosticCode::HookWired)
        .collect();
    assert_eq!(wired.len(), 1);
    assert_eq!(
        wired[0].message,
        "Inserted a call to the method 'System.Void Demo.Widget::OnXChanged(System.Int32,System.Int32&)' into the setter of the property 'System.Int32 Demo.Widget::X()'."
    );
    assert_eq!(sink.count(DiagnosticCode::ReferenceCleaned), 1);
}

#[test]
fn overloaded_hook_name_binds_to_the_marked_overload() {
    let ty = with_auto_property(TypeDef::new(NAMESPACE, "Widget"), "X", TypeSig::int32())
        .with_method(
            MethodDef::new("OnXChanged", TypeSig::Void)
                .with_parameter("text", TypeSig::string())
                .with_body(MethodBody::from_instructions([Instruction::ret()])),
        )
        .with_method(hook("OnXChanged", TypeSig::int32()).with_attribute(marker("X")));
    let module = woven(module_with([ty]));

    let mut machine = Machine::new(&module);
    let this = machine.instantiate(WIDGET).unwrap();
    machine.set_field(this, "<X>k__BackingField", Value::Int(2));
    machine.clear_calls();
    machine
        .invoke(&MethodRef::new(WIDGET, "set_X"), vec![Value::Object(this), Value::Int(5)])
        .unwrap();

    let calls: Vec<_> = machine.calls_to("OnXChanged").collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].method.parameters,
        Some(vec![TypeSig::int32(), TypeSig::int32().by_ref()])
    );
    assert_eq!(
        calls[0].arguments,
        vec![Value::Object(this), Value::Int(2), Value::Int(5)]
    );
}

#[test]
fn hook_that_assigns_through_the_setter_stops_at_the_call_depth_limit() {
    let mut ty = widget();
    let setter = ty.method_ref(ty.method("set_X").unwrap());
    // this.X = current
    let hook = ty.methods.iter_mut().find(|m| m.name == "OnXChanged").unwrap();
    hook.body = Some(MethodBody::from_instructions([
        Instruction::ldarg(0),
        Instruction::ldarg(1),
        Instruction::callvirt(setter),
        Instruction::ret(),
    ]));
    let module = woven(module_with([ty]));

    let mut machine = Machine::new(&module);
    let this = machine.instantiate(WIDGET).unwrap();
    let err = machine
        .invoke(&MethodRef::new(WIDGET, "set_X"), vec![Value::Object(this), Value::Int(1)])
        .unwrap_err();
    assert!(matches!(err, CoreError::CallDepth(_)));
}
