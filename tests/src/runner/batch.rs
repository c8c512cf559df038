use super::write_module;
use color_eyre::Result;
use setterweave_core::io::load_module;
use setterweave_core::{Module, TypeDef, TypeSig};
use setterweave_runner::{AssemblyInfo, Host, ProjectHost, Runner, weave_all};
use setterweave_tests::{NAMESPACE, init_tracing, widget_module, with_auto_property};
use std::path::PathBuf;
use std::sync::Arc;

fn plain_module() -> Module {
    let mut module = Module::new("Plain");
    module
        .types
        .push(with_auto_property(TypeDef::new(NAMESPACE, "Plain"), "Y", TypeSig::int32()));
    module
}

#[tokio::test]
async fn weaves_every_module_and_releases_the_lock() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_module(dir.path(), "Demo", &widget_module())?;
    write_module(dir.path(), "Plain", &plain_module())?;
    let plain_before = std::fs::read_to_string(dir.path().join("Plain.module.json"))?;

    let host = ProjectHost::new(dir.path());
    let report = weave_all(&host, Arc::new(Runner::new(dir.path()))).await?;

    assert_eq!(report.woven.len(), 2);
    assert_eq!(report.changed(), 1);
    assert!(report.failed.is_empty());
    assert!(!host.is_locked());
    assert_eq!(host.refresh_count(), 1);

    let woven = load_module(&dir.path().join("Demo.module.json"))?;
    let setter = woven.types[0].method("set_X").and_then(|m| m.body.as_ref());
    assert_eq!(setter.map(|b| b.len()), Some(12));
    assert_eq!(woven.assembly_references, vec!["System.Runtime".to_string()]);

    // Nothing to do in Plain, so the file is not rewritten.
    let plain_after = std::fs::read_to_string(dir.path().join("Plain.module.json"))?;
    assert_eq!(plain_before, plain_after);
    Ok(())
}

#[tokio::test]
async fn corrupt_module_fails_alone() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_module(dir.path(), "Demo", &widget_module())?;
    std::fs::write(dir.path().join("Broken.module.json"), "{ \"name\": ")?;

    let host = ProjectHost::new(dir.path());
    let report = weave_all(&host, Arc::new(Runner::new(dir.path()))).await?;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.name, "Broken");
    assert_eq!(report.changed(), 1);
    assert!(!host.is_locked());
    Ok(())
}

#[tokio::test]
async fn duplicate_output_paths_are_woven_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_module(dir.path(), "Demo", &widget_module())?;

    let mut first = AssemblyInfo::new("Demo", "Demo.module.json");
    first.source_files = vec![PathBuf::from("Assets/Widget.cs"), PathBuf::from("Assets/Other.cs")];
    let mut second = AssemblyInfo::new("Demo.Editor", "Demo.module.json");
    second.source_files = vec![PathBuf::from("Assets/Editor.cs")];
    let host = ProjectHost::with_assemblies(dir.path(), vec![first, second]);

    let report = weave_all(&host, Arc::new(Runner::new(dir.path()))).await?;

    assert_eq!(report.woven.len(), 1);
    assert_eq!(report.woven[0].0.name, "Demo");
    assert_eq!(host.reimported(), vec![PathBuf::from("Assets/Widget.cs")]);
    assert!(!host.reported().is_empty());

    // The hook is wired exactly once, so a second batch changes nothing.
    let again = weave_all(&host, Arc::new(Runner::new(dir.path()))).await?;
    assert_eq!(again.changed(), 0);
    assert_eq!(host.reimported().len(), 1);
    assert_eq!(host.refresh_count(), 2);
    Ok(())
}

struct FailingHost(ProjectHost);

impl Host for FailingHost {
    fn assemblies(&self) -> setterweave_runner::Result<Vec<AssemblyInfo>> {
        Err(setterweave_runner::Error::Scan {
            path: self.0.root().to_path_buf(),
            source: std::io::Error::other("listing failed"),
        })
    }

    fn lock_reload(&self) {
        self.0.lock_reload();
    }

    fn unlock_reload(&self) {
        self.0.unlock_reload();
    }

    fn reimport(&self, source_file: &std::path::Path) {
        self.0.reimport(source_file);
    }

    fn refresh(&self) {
        self.0.refresh();
    }
}

#[tokio::test]
async fn lock_is_released_when_the_batch_fails() {
    let host = FailingHost(ProjectHost::new("."));
    let result = weave_all(&host, Arc::new(Runner::new("."))).await;

    assert!(result.is_err());
    assert!(!host.0.is_locked());
    assert_eq!(host.0.refresh_count(), 1);
}
