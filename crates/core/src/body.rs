//! Method bodies: the instruction set and the editable instruction arena.
//!
//! Every instruction lives in an arena slot addressed by a stable [`InstrId`]. The
//! execution order is kept separately, so splicing a block of instructions in front of
//! an anchor never renumbers anything: branch operands refer to ids, not positions, and
//! keep pointing at the same instruction however much code is inserted around it.
//!
//! ```rust,ignore
//! let mut body = MethodBody::from_instructions([
//!     Instruction::ldarg(0),
//!     Instruction::ret(),
//! ]);
//! let ret = body.find_all(|i| i.op == OpCode::Ret)[0];
//! body.insert_before(ret, vec![Instruction::new(OpCode::Pop, Operand::None)])?;
//! ```

use crate::module::{FieldRef, MethodRef};
use crate::result::{Error, Result};
use crate::types::TypeSig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable handle of an instruction inside one [`MethodBody`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrId(u32);

impl InstrId {
    /// Id of the instruction at `raw` in a body built by [`MethodBody::from_instructions`].
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04}", self.0)
    }
}

/// Index of a local variable in its body's variable list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(pub u16);

impl LocalId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How an opcode affects control flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowType {
    /// Falls through to the next instruction.
    Next,
    /// Unconditional jump.
    Branch,
    /// Jumps or falls through depending on the stack.
    ConditionalBranch,
    /// Calls another method and falls through.
    Call,
    /// Leaves the method.
    Return,
}

/// Supported opcodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCode {
    Nop,
    Ldarg,
    Ldloc,
    Stloc,
    LdcI4,
    Ldstr,
    Ldnull,
    Ldfld,
    Ldflda,
    Stfld,
    Ldind,
    Stind,
    Call,
    Callvirt,
    Br,
    Brtrue,
    Brfalse,
    Beq,
    BneUn,
    Ceq,
    Add,
    Sub,
    Dup,
    Pop,
    Ret,
}

impl OpCode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Nop => "nop",
            OpCode::Ldarg => "ldarg",
            OpCode::Ldloc => "ldloc",
            OpCode::Stloc => "stloc",
            OpCode::LdcI4 => "ldc.i4",
            OpCode::Ldstr => "ldstr",
            OpCode::Ldnull => "ldnull",
            OpCode::Ldfld => "ldfld",
            OpCode::Ldflda => "ldflda",
            OpCode::Stfld => "stfld",
            OpCode::Ldind => "ldind",
            OpCode::Stind => "stind",
            OpCode::Call => "call",
            OpCode::Callvirt => "callvirt",
            OpCode::Br => "br",
            OpCode::Brtrue => "brtrue",
            OpCode::Brfalse => "brfalse",
            OpCode::Beq => "beq",
            OpCode::BneUn => "bne.un",
            OpCode::Ceq => "ceq",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Dup => "dup",
            OpCode::Pop => "pop",
            OpCode::Ret => "ret",
        }
    }

    pub fn flow(self) -> FlowType {
        match self {
            OpCode::Br => FlowType::Branch,
            OpCode::Brtrue | OpCode::Brfalse | OpCode::Beq | OpCode::BneUn => {
                FlowType::ConditionalBranch
            }
            OpCode::Call | OpCode::Callvirt => FlowType::Call,
            OpCode::Ret => FlowType::Return,
            _ => FlowType::Next,
        }
    }

    /// Returns true if the opcode terminates execution of the method body.
    #[inline]
    pub fn is_exit(self) -> bool {
        self.flow() == FlowType::Return
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Instruction operand.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    #[default]
    None,
    Int32(i32),
    String(String),
    Arg(u16),
    Local(LocalId),
    Field(FieldRef),
    Method(MethodRef),
    Target(InstrId),
}

impl Operand {
    pub fn is_none(&self) -> bool {
        matches!(self, Operand::None)
    }
}

/// One instruction: an opcode and its operand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: OpCode,
    #[serde(default, skip_serializing_if = "Operand::is_none")]
    pub operand: Operand,
}

impl Instruction {
    pub fn new(op: OpCode, operand: Operand) -> Self {
        Self { op, operand }
    }

    pub fn ldarg(index: u16) -> Self {
        Self::new(OpCode::Ldarg, Operand::Arg(index))
    }

    pub fn ldloc(local: LocalId) -> Self {
        Self::new(OpCode::Ldloc, Operand::Local(local))
    }

    pub fn stloc(local: LocalId) -> Self {
        Self::new(OpCode::Stloc, Operand::Local(local))
    }

    pub fn ldc_i4(value: i32) -> Self {
        Self::new(OpCode::LdcI4, Operand::Int32(value))
    }

    pub fn ldfld(field: FieldRef) -> Self {
        Self::new(OpCode::Ldfld, Operand::Field(field))
    }

    pub fn ldflda(field: FieldRef) -> Self {
        Self::new(OpCode::Ldflda, Operand::Field(field))
    }

    pub fn stfld(field: FieldRef) -> Self {
        Self::new(OpCode::Stfld, Operand::Field(field))
    }

    pub fn callvirt(method: MethodRef) -> Self {
        Self::new(OpCode::Callvirt, Operand::Method(method))
    }

    pub fn branch(op: OpCode, target: InstrId) -> Self {
        Self::new(op, Operand::Target(target))
    }

    pub fn ret() -> Self {
        Self::new(OpCode::Ret, Operand::None)
    }

    pub fn target(&self) -> Option<InstrId> {
        match self.operand {
            Operand::Target(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Operand::None => write!(f, "{}", self.op),
            Operand::Int32(value) => write!(f, "{} {value}", self.op),
            Operand::String(value) => write!(f, "{} {value:?}", self.op),
            Operand::Arg(index) => write!(f, "{} {index}", self.op),
            Operand::Local(local) => write!(f, "{} V_{}", self.op, local.0),
            Operand::Field(field) => write!(f, "{} {field}", self.op),
            Operand::Method(method) => write!(f, "{} {method}", self.op),
            Operand::Target(target) => write!(f, "{} {target}", self.op),
        }
    }
}

/// Instruction stream and locals of a method.
///
/// Equality is structural: two bodies are equal when their locals and instruction
/// sequences match and every branch lands on the same position, whatever the ids.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "BodyRepr", into = "BodyRepr")]
pub struct MethodBody {
    variables: Vec<TypeSig>,
    arena: Vec<Instruction>,
    order: Vec<InstrId>,
}

impl MethodBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a body whose ids follow the given order, starting at 0.
    pub fn from_instructions(instructions: impl IntoIterator<Item = Instruction>) -> Self {
        let mut body = Self::new();
        for instruction in instructions {
            body.push(instruction);
        }
        body
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn variables(&self) -> &[TypeSig] {
        &self.variables
    }

    /// Declares a new local variable and returns its handle.
    pub fn add_variable(&mut self, ty: TypeSig) -> Result<LocalId> {
        let index = u16::try_from(self.variables.len())
            .map_err(|_| Error::TooManyLocals(self.variables.len() + 1))?;
        self.variables.push(ty);
        Ok(LocalId(index))
    }

    /// Instruction ids in execution order.
    pub fn ids(&self) -> &[InstrId] {
        &self.order
    }

    /// Instructions in execution order, paired with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (InstrId, &Instruction)> + '_ {
        self.order.iter().map(|&id| (id, &self.arena[id.index()]))
    }

    pub fn get(&self, id: InstrId) -> Option<&Instruction> {
        self.arena.get(id.index())
    }

    /// Returns true if `id` is part of the instruction sequence.
    pub fn contains(&self, id: InstrId) -> bool {
        self.position(id).is_some()
    }

    /// Current position of `id` in the sequence.
    pub fn position(&self, id: InstrId) -> Option<usize> {
        self.order.iter().position(|&candidate| candidate == id)
    }

    /// Ids of every instruction matching `predicate`, in order.
    pub fn find_all(&self, mut predicate: impl FnMut(&Instruction) -> bool) -> Vec<InstrId> {
        self.iter()
            .filter(|(_, instruction)| predicate(instruction))
            .map(|(id, _)| id)
            .collect()
    }

    /// Appends an instruction to the end of the sequence.
    pub fn push(&mut self, instruction: Instruction) -> InstrId {
        let id = self.alloc(instruction);
        self.order.push(id);
        id
    }

    /// Splices `block` into the sequence at `position` as a single operation.
    pub fn insert_at(&mut self, position: usize, block: Vec<Instruction>) -> Result<Vec<InstrId>> {
        if position > self.order.len() {
            return Err(Error::PositionOutOfBounds {
                position,
                len: self.order.len(),
            });
        }
        let ids: Vec<InstrId> = block.into_iter().map(|i| self.alloc(i)).collect();
        self.order.splice(position..position, ids.iter().copied());
        Ok(ids)
    }

    /// Splices `block` immediately before `anchor`. The anchor keeps its id.
    pub fn insert_before(&mut self, anchor: InstrId, block: Vec<Instruction>) -> Result<Vec<InstrId>> {
        let position = self
            .position(anchor)
            .ok_or(Error::UnknownInstruction(anchor))?;
        self.insert_at(position, block)
    }

    /// Points every branch that targets `from` at `to` instead. Returns the number of
    /// rewritten operands.
    pub fn retarget(&mut self, from: InstrId, to: InstrId) -> Result<usize> {
        if !self.contains(to) {
            return Err(Error::UnknownInstruction(to));
        }
        let mut rewritten = 0;
        for id in &self.order {
            let instruction = &mut self.arena[id.index()];
            if instruction.target() == Some(from) {
                instruction.operand = Operand::Target(to);
                rewritten += 1;
            }
        }
        Ok(rewritten)
    }

    fn alloc(&mut self, instruction: Instruction) -> InstrId {
        self.arena.push(instruction);
        InstrId((self.arena.len() - 1) as u32)
    }
}

impl PartialEq for MethodBody {
    fn eq(&self, other: &Self) -> bool {
        if self.variables != other.variables || self.len() != other.len() {
            return false;
        }
        self.iter().zip(other.iter()).all(|((_, a), (_, b))| {
            a.op == b.op
                && match (&a.operand, &b.operand) {
                    (Operand::Target(x), Operand::Target(y)) => {
                        self.position(*x) == other.position(*y)
                    }
                    (x, y) => x == y,
                }
        })
    }
}

impl fmt::Display for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, ty) in self.variables.iter().enumerate() {
            writeln!(f, "  .local V_{index} {ty}")?;
        }
        for (id, instruction) in self.iter() {
            writeln!(f, "  {id}: {instruction}")?;
        }
        Ok(())
    }
}

/// Serialized layout of a body: instructions in order, each labelled with its id.
#[derive(Serialize, Deserialize)]
struct BodyRepr {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    variables: Vec<TypeSig>,
    instructions: Vec<LabeledInstruction>,
}

#[derive(Serialize, Deserialize)]
struct LabeledInstruction {
    id: u32,
    #[serde(flatten)]
    instruction: Instruction,
}

impl From<MethodBody> for BodyRepr {
    fn from(body: MethodBody) -> Self {
        let instructions = body
            .order
            .iter()
            .map(|&id| LabeledInstruction {
                id: id.0,
                instruction: body.arena[id.index()].clone(),
            })
            .collect();
        BodyRepr {
            variables: body.variables,
            instructions,
        }
    }
}

impl TryFrom<BodyRepr> for MethodBody {
    type Error = Error;

    // Labels are renumbered densely in sequence order; branch operands follow.
    fn try_from(repr: BodyRepr) -> Result<Self> {
        let mut remap: HashMap<u32, InstrId> = HashMap::with_capacity(repr.instructions.len());
        for (index, labeled) in repr.instructions.iter().enumerate() {
            if remap.insert(labeled.id, InstrId(index as u32)).is_some() {
                return Err(Error::DuplicateInstruction(labeled.id));
            }
        }

        let mut body = MethodBody {
            variables: repr.variables,
            ..MethodBody::default()
        };
        for labeled in repr.instructions {
            let mut instruction = labeled.instruction;
            if let Operand::Target(target) = instruction.operand {
                let mapped = remap
                    .get(&target.0)
                    .copied()
                    .ok_or(Error::UndefinedBranchTarget(target.0))?;
                instruction.operand = Operand::Target(mapped);
            }
            body.push(instruction);
        }
        Ok(body)
    }
}
