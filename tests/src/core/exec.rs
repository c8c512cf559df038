use setterweave_core::exec::{Machine, Value};
use setterweave_core::validator::validate_body;
use setterweave_core::{MethodRef, count_exit_points};
use setterweave_tests::{WIDGET, guarded_setter, replace_setter, two_exit_setter, widget, module_with};

#[test]
fn guarded_setter_skips_store_for_equal_value() {
    let ty = widget();
    let body = guarded_setter(&ty, "X");
    validate_body(&body).unwrap();
    let module = module_with([replace_setter(ty, "X", body)]);

    let mut machine = Machine::new(&module);
    let this = machine.instantiate(WIDGET).unwrap();
    let set = MethodRef::new(WIDGET, "set_X");

    machine.invoke(&set, vec![Value::Object(this), Value::Int(4)]).unwrap();
    assert_eq!(machine.field(this, "<X>k__BackingField"), Some(&Value::Int(4)));
    machine.invoke(&set, vec![Value::Object(this), Value::Int(4)]).unwrap();
    assert_eq!(machine.field(this, "<X>k__BackingField"), Some(&Value::Int(4)));
}

#[test]
fn two_exit_setter_maps_zero() {
    let ty = widget();
    let body = two_exit_setter(&ty, "X");
    assert_eq!(count_exit_points(&body), 2);
    let module = module_with([replace_setter(ty, "X", body)]);

    let mut machine = Machine::new(&module);
    let this = machine.instantiate(WIDGET).unwrap();
    let set = MethodRef::new(WIDGET, "set_X");
    let get = MethodRef::new(WIDGET, "get_X");

    machine.invoke(&set, vec![Value::Object(this), Value::Int(0)]).unwrap();
    assert_eq!(
        machine.invoke(&get, vec![Value::Object(this)]).unwrap(),
        Some(Value::Int(-1))
    );
    machine.invoke(&set, vec![Value::Object(this), Value::Int(9)]).unwrap();
    assert_eq!(
        machine.invoke(&get, vec![Value::Object(this)]).unwrap(),
        Some(Value::Int(9))
    );
}

#[test]
fn every_invocation_is_traced() {
    let module = module_with([widget()]);
    let mut machine = Machine::new(&module);
    let this = machine.instantiate(WIDGET).unwrap();

    machine
        .invoke(&MethodRef::new(WIDGET, "set_X"), vec![Value::Object(this), Value::Int(3)])
        .unwrap();
    let calls: Vec<_> = machine.calls().iter().map(|c| c.method.name.as_str()).collect();
    assert_eq!(calls, ["set_X"]);
    assert_eq!(machine.calls_to("OnXChanged").count(), 0);
}
