use super::write_module;
use color_eyre::Result;
use setterweave_runner::{AssemblyInfo, ProjectHost, Runner, RunnerConfig, on_compilation_finished};
use setterweave_tests::widget_module;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::test]
async fn weaves_only_the_compiled_assembly() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_module(dir.path(), "Demo", &widget_module())?;
    write_module(dir.path(), "Other", &widget_module())?;

    let host = ProjectHost::new(dir.path());
    let runner = Arc::new(Runner::new(dir.path()));
    let outcome = on_compilation_finished(&host, runner, Path::new("Demo.module.json")).await?;

    let outcome = outcome.ok_or_else(|| color_eyre::eyre::eyre!("Demo was not woven"))?;
    assert!(outcome.changed);
    assert!(outcome.persisted);
    assert_eq!(outcome.path, dir.path().join("Demo.module.json"));

    let other = setterweave_core::io::load_module(&dir.path().join("Other.module.json"))?;
    assert_eq!(other, widget_module());
    // Compilation events do not touch the reload gate.
    assert_eq!(host.refresh_count(), 0);
    Ok(())
}

#[tokio::test]
async fn unknown_path_is_ignored() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_module(dir.path(), "Demo", &widget_module())?;

    let host = ProjectHost::new(dir.path());
    let runner = Arc::new(Runner::new(dir.path()));
    // Output paths are compared exactly.
    let outcome = on_compilation_finished(&host, runner, Path::new("./Demo.module.json")).await?;
    assert!(outcome.is_none());
    Ok(())
}

#[tokio::test]
async fn references_resolve_through_configured_search_paths() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let lib = dir.path().join("lib");
    std::fs::create_dir(&lib)?;
    std::fs::write(lib.join("SetterWeave.module.json"), "{}")?;
    write_module(dir.path(), "Demo", &widget_module())?;
    std::fs::write(
        dir.path().join("setterweave.json"),
        r#"{ "search_paths": ["lib", "lib"] }"#,
    )?;

    let config = RunnerConfig::discover(dir.path())?;
    let runner = Runner::from_config(&config);
    assert_eq!(runner.search_paths().len(), 1);

    let mut assembly = AssemblyInfo::new("Demo", "Demo.module.json");
    assembly.references = vec![
        PathBuf::from("Packages/SetterWeave.module.json"),
        PathBuf::from("Packages/Missing.module.json"),
    ];
    let outcome = runner.weave_assembly(&assembly)?;
    assert_eq!(outcome.resolved_references.len(), 1);
    assert!(outcome.resolved_references[0].ends_with("lib/SetterWeave.module.json"));
    Ok(())
}
