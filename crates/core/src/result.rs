//! Core results and error types

use crate::body::InstrId;
use thiserror::Error;

/// Core error type encompassing all core module errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read file at the specified path.
    #[error("could not read file '{path}': {source}")]
    FileRead {
        /// The path to the file that could not be read.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write file at the specified path.
    #[error("could not write file '{path}': {source}")]
    FileWrite {
        /// The path to the file that could not be written.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Module JSON could not be parsed or produced.
    #[error("module serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A type signature string could not be parsed.
    #[error("invalid type signature '{0}'")]
    InvalidTypeSig(String),

    /// An instruction id does not belong to the body it was used with.
    #[error("unknown instruction {0}")]
    UnknownInstruction(InstrId),

    /// An insertion position lies past the end of the body.
    #[error("insertion position {position} out of bounds for body of {len} instructions")]
    PositionOutOfBounds {
        /// Requested position.
        position: usize,
        /// Body length at the time of the request.
        len: usize,
    },

    /// The serialized body reused an instruction id.
    #[error("duplicate instruction id {0} in serialized body")]
    DuplicateInstruction(u32),

    /// The serialized body branches to an id it does not define.
    #[error("branch to undefined instruction id {0} in serialized body")]
    UndefinedBranchTarget(u32),

    /// Method body violates a structural rule.
    #[error("invalid method body: {0}")]
    InvalidBody(String),

    /// A type name could not be resolved in the module.
    #[error("unknown type {0}")]
    UnknownType(String),

    /// A method reference could not be resolved in the module.
    #[error("unknown method {0}")]
    UnknownMethod(String),

    /// The executor popped from an empty evaluation stack.
    #[error("evaluation stack underflow at {0}")]
    StackUnderflow(InstrId),

    /// The executor met an operand of the wrong shape.
    #[error("type mismatch at {at}: {msg}")]
    TypeMismatch {
        /// Offending instruction.
        at: InstrId,
        /// What went wrong.
        msg: String,
    },

    /// The executor exceeded its step budget.
    #[error("execution exceeded {0} steps")]
    StepLimit(usize),

    /// The executor exceeded its nested call limit.
    #[error("execution exceeded {0} nested calls")]
    CallDepth(usize),

    /// A method declared more locals than a local index can address.
    #[error("too many locals: {0}")]
    TooManyLocals(usize),
}

/// Core result type
pub type Result<T> = std::result::Result<T, Error>;
