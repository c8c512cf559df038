//! Module for the `inspect` subcommand, which prints method bodies and can execute a
//! method on a fresh instance through the reference executor.

use async_trait::async_trait;
use clap::Args;
use setterweave_core::exec::{Machine, Value};
use setterweave_core::io::load_module;
use setterweave_core::MethodRef;
use std::error::Error;
use std::path::PathBuf;

/// Arguments for the `inspect` subcommand.
#[derive(Args)]
pub struct InspectArgs {
    /// Module file to inspect.
    pub input: PathBuf,
    /// Only print methods whose name contains this text.
    #[arg(long)]
    filter: Option<String>,
    /// Invoke `Namespace.Type::Method` on a new instance of its type.
    #[arg(long, value_name = "METHOD")]
    invoke: Option<String>,
    /// Int32 argument passed to the invoked method. May be repeated.
    #[arg(long = "arg", value_name = "INT", allow_hyphen_values = true)]
    args: Vec<i32>,
}

#[async_trait]
impl super::Command for InspectArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let InspectArgs {
            input,
            filter,
            invoke,
            args,
        } = self;

        let module = load_module(&input)?;

        if let Some(target) = invoke {
            let (type_name, method_name) = target
                .split_once("::")
                .ok_or_else(|| format!("expected Type::Method, got '{target}'"))?;
            let mut machine = Machine::new(&module);
            let this = machine.instantiate(type_name)?;

            let mut arguments = vec![Value::Object(this)];
            arguments.extend(args.into_iter().map(Value::Int));
            let returned = machine.invoke(&MethodRef::new(type_name, method_name), arguments)?;

            for call in machine.calls() {
                println!("call {} {:?}", call.method, call.arguments);
            }
            match returned {
                Some(value) => println!("returned {value:?}"),
                None => println!("returned void"),
            }
            if let Some(ty) = module.find_type(type_name) {
                for field in &ty.fields {
                    if let Some(value) = machine.field(this, &field.name) {
                        println!("field {} = {value:?}", field.name);
                    }
                }
            }
            return Ok(());
        }

        println!("module {}", module.name);
        for reference in &module.assembly_references {
            println!("  .reference {reference}");
        }
        for (ty, method) in module.methods() {
            if filter.as_deref().is_some_and(|f| !method.name.contains(f)) {
                continue;
            }
            println!("{}", ty.member_full_name(method));
            for attribute in &method.attributes {
                println!("  [{}]", attribute.attribute_type);
            }
            match &method.body {
                Some(body) => print!("{body}"),
                None => println!("  (no body)"),
            }
        }
        Ok(())
    }
}
