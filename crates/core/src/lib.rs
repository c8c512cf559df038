pub mod body;
pub mod exec;
pub mod io;
pub mod module;
pub mod result;
pub mod types;
pub mod validator;

pub use body::{InstrId, Instruction, LocalId, MethodBody, OpCode, Operand};
pub use module::{
    AttributeArgument, CustomAttribute, FieldDef, FieldRef, MethodDef, MethodRef, Module,
    ParameterDef, PropertyDef, TypeDef,
};
pub use result::{Error, Result};
pub use types::TypeSig;

/// Counts the exit points of a body.
///
/// Exit points are identified by opcode alone; there is no separate control flow graph.
pub fn count_exit_points(body: &MethodBody) -> usize {
    body.iter().filter(|(_, i)| i.op.is_exit()).count()
}
