use super::write_module;
use color_eyre::Result;
use setterweave_core::io::load_module;
use setterweave_runner::Runner;
use setterweave_tests::{module_with, widget_module};

#[test]
fn separate_output_leaves_the_input_alone() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_module(dir.path(), "Demo", &widget_module())?;
    let input = dir.path().join("Demo.module.json");
    let output = dir.path().join("Demo.woven.json");

    let woven = Runner::new(dir.path()).weave_file_to(&input, &output)?;
    assert!(woven.persisted);
    assert_eq!(woven.path, output);
    assert_eq!(woven.pass.instrumented, 1);
    assert!(!woven.has_errors());

    assert_eq!(load_module(&input)?, widget_module());
    assert_ne!(load_module(&output)?, widget_module());
    Ok(())
}

#[test]
fn separate_output_is_written_even_without_hooks() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let plain = module_with([]);
    write_module(dir.path(), "Plain", &plain)?;
    let input = dir.path().join("Plain.module.json");
    let output = dir.path().join("Plain.copy.module.json");

    let runner = Runner::new(dir.path()).with_weaver(setterweave_weaver::WeaverConfig {
        clean_reference: false,
        ..Default::default()
    });
    let in_place = runner.weave_file(&input)?;
    assert!(!in_place.persisted);

    let copied = runner.weave_file_to(&input, &output)?;
    assert!(copied.persisted);
    assert!(!copied.changed);
    assert_eq!(load_module(&output)?, plain);
    Ok(())
}
