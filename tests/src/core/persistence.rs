use color_eyre::Result;
use setterweave_core::io::{load_module, save_module};
use setterweave_core::{Module, OpCode, TypeSig};
use setterweave_tests::{guarded_setter, replace_setter, widget, widget_module, module_with};
use setterweave_weaver::{Diagnostics, WeaverConfig, weave_module};

#[test]
fn module_round_trips_through_json() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Demo.module.json");
    let module = widget_module();

    save_module(&path, &module)?;
    let loaded = load_module(&path)?;
    assert_eq!(loaded, module);
    assert!(!dir.path().join("Demo.module.json.tmp").exists());
    Ok(())
}

#[test]
fn woven_branches_survive_persistence() -> Result<()> {
    let ty = widget();
    let body = guarded_setter(&ty, "X");
    let mut module = module_with([replace_setter(ty, "X", body)]);
    weave_module(&mut module, &WeaverConfig::default(), &mut Diagnostics::new())?;

    let json = serde_json::to_string(&module)?;
    let reloaded: Module = serde_json::from_str(&json)?;

    let setter = reloaded.types[0].method("set_X").and_then(|m| m.body.as_ref());
    let setter = setter.ok_or_else(|| color_eyre::eyre::eyre!("setter body missing"))?;
    let (_, branch) = setter
        .iter()
        .find(|(_, i)| i.op == OpCode::Beq)
        .ok_or_else(|| color_eyre::eyre::eyre!("branch missing"))?;
    let landing = branch.target().and_then(|t| setter.get(t));
    assert_eq!(landing.map(|i| i.op), Some(OpCode::Ldarg));
    assert_eq!(setter.variables(), &[TypeSig::int32()]);
    assert_eq!(reloaded, module);
    Ok(())
}

#[test]
fn type_signatures_are_plain_strings_on_disk() -> Result<()> {
    let value = serde_json::to_value(widget_module())?;
    let hook = &value["types"][0]["methods"][2];
    assert_eq!(hook["name"], "OnXChanged");
    assert_eq!(hook["parameters"][1]["parameter_type"], "System.Int32&");
    assert_eq!(hook["return_type"], "System.Void");
    Ok(())
}

#[test]
fn missing_file_reports_its_path() {
    let err = load_module(std::path::Path::new("/nonexistent/Demo.module.json")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/Demo.module.json"));
}
