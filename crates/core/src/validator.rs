//! Structural checks for rewritten method bodies.
//!
//! This is not a verifier: stack balance and operand types are not tracked. It catches
//! the mistakes an instruction rewriter can make, namely branches into nothing, locals
//! that were never declared and a final instruction that falls off the end of the body.

use crate::body::{FlowType, MethodBody, Operand};
use crate::result::{Error, Result};

/// Validate branch targets, local indices and the body terminator.
pub fn validate_body(body: &MethodBody) -> Result<()> {
    let mut problems = Vec::new();

    for (id, instruction) in body.iter() {
        match &instruction.operand {
            Operand::Target(target) if !body.contains(*target) => {
                problems.push(format!("{id}: branch to missing {target}"));
            }
            Operand::Local(local) if local.index() >= body.variables().len() => {
                problems.push(format!("{id}: undeclared local V_{}", local.0));
            }
            _ => {}
        }
    }

    match body.iter().last() {
        None => problems.push("empty body".to_string()),
        Some((id, last)) => {
            let falls_through = !matches!(last.op.flow(), FlowType::Return | FlowType::Branch);
            if falls_through {
                problems.push(format!("{id}: control falls off the end of the body"));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidBody(problems.join("; ")))
    }
}
