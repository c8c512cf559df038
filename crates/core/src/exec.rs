//! Reference executor for method bodies.
//!
//! A small stack machine over the supported opcode set. It exists to observe what a
//! rewritten body does: every method invocation is recorded in a call trace together with
//! its arguments, with managed references already dereferenced at the moment of the call.
//! Methods without a body are treated as externals that return the default value of
//! their return type.

use crate::body::{InstrId, MethodBody, OpCode, Operand};
use crate::module::{MethodDef, MethodRef, Module};
use crate::result::{Error, Result};
use crate::types::{INT32, TypeSig};
use std::collections::HashMap;

/// Default budget of executed instructions across one `invoke`.
pub const DEFAULT_STEP_LIMIT: usize = 10_000;

/// Default limit on nested calls. Each nested call is a native frame.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Handle of a heap object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

/// A runtime value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Null,
    Int(i32),
    Str(String),
    Object(ObjectId),
    /// Managed reference to a field of a heap object.
    FieldAddress(ObjectId, String),
}

impl Value {
    fn default_for(ty: &TypeSig) -> Value {
        match ty {
            TypeSig::Named(name) if name == INT32 => Value::Int(0),
            _ => Value::Null,
        }
    }

    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Int(v) => *v != 0,
            _ => true,
        }
    }
}

/// A heap object: its type and field values.
#[derive(Clone, Debug)]
pub struct Object {
    pub type_name: String,
    pub fields: HashMap<String, Value>,
}

/// One recorded method invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRecord {
    pub method: MethodRef,
    /// Arguments including `this`, references dereferenced at call time.
    pub arguments: Vec<Value>,
}

/// Executes methods of one module against a private heap.
pub struct Machine<'m> {
    module: &'m Module,
    heap: Vec<Object>,
    calls: Vec<CallRecord>,
    step_limit: usize,
    steps: usize,
    max_depth: usize,
    depth: usize,
}

impl<'m> Machine<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            heap: Vec::new(),
            calls: Vec::new(),
            step_limit: DEFAULT_STEP_LIMIT,
            steps: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
        }
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Allocates an instance of a module type with every field at its default.
    pub fn instantiate(&mut self, type_name: &str) -> Result<ObjectId> {
        let ty = self
            .module
            .find_type(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?;
        let fields = ty
            .fields
            .iter()
            .map(|f| (f.name.clone(), Value::default_for(&f.field_type)))
            .collect();
        self.heap.push(Object {
            type_name: type_name.to_string(),
            fields,
        });
        Ok(ObjectId(self.heap.len() - 1))
    }

    pub fn field(&self, object: ObjectId, name: &str) -> Option<&Value> {
        self.heap.get(object.0)?.fields.get(name)
    }

    pub fn set_field(&mut self, object: ObjectId, name: &str, value: Value) {
        if let Some(obj) = self.heap.get_mut(object.0) {
            obj.fields.insert(name.to_string(), value);
        }
    }

    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    /// Recorded calls to methods with the given name.
    pub fn calls_to<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CallRecord> + 'a {
        self.calls.iter().filter(move |call| call.method.name == name)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Invokes a method. `arguments[0]` is `this`.
    pub fn invoke(&mut self, method: &MethodRef, arguments: Vec<Value>) -> Result<Option<Value>> {
        self.steps = 0;
        self.depth = 0;
        self.call(method, arguments)
    }

    fn call(&mut self, method: &MethodRef, arguments: Vec<Value>) -> Result<Option<Value>> {
        if self.depth >= self.max_depth {
            return Err(Error::CallDepth(self.max_depth));
        }
        self.depth += 1;
        let result = self.enter(method, arguments);
        self.depth -= 1;
        result
    }

    fn enter(&mut self, method: &MethodRef, arguments: Vec<Value>) -> Result<Option<Value>> {
        let module = self.module;
        let (_, def) = module
            .resolve_method(method)
            .ok_or_else(|| Error::UnknownMethod(method.to_string()))?;

        let recorded = arguments.iter().map(|v| self.deref(v)).collect();
        self.calls.push(CallRecord {
            method: method.clone(),
            arguments: recorded,
        });

        match &def.body {
            Some(body) => self.run(def, body, arguments),
            None if def.return_type.is_void() => Ok(None),
            None => Ok(Some(Value::default_for(&def.return_type))),
        }
    }

    fn deref(&self, value: &Value) -> Value {
        match value {
            Value::FieldAddress(object, field) => {
                self.field(*object, field).cloned().unwrap_or(Value::Null)
            }
            other => other.clone(),
        }
    }

    fn run(&mut self, def: &MethodDef, body: &MethodBody, arguments: Vec<Value>) -> Result<Option<Value>> {
        let positions: HashMap<InstrId, usize> =
            body.ids().iter().enumerate().map(|(pos, &id)| (id, pos)).collect();
        let mut locals: Vec<Value> = body.variables().iter().map(Value::default_for).collect();
        let mut stack: Vec<Value> = Vec::new();
        let mut pc = 0usize;

        loop {
            let Some(&id) = body.ids().get(pc) else {
                return Err(Error::InvalidBody(format!(
                    "control fell off the end of {}",
                    def.name
                )));
            };
            self.steps += 1;
            if self.steps > self.step_limit {
                return Err(Error::StepLimit(self.step_limit));
            }
            let instruction = body.get(id).ok_or(Error::UnknownInstruction(id))?;
            pc += 1;

            let mismatch = |msg: &str| Error::TypeMismatch {
                at: id,
                msg: msg.to_string(),
            };
            let pop = |stack: &mut Vec<Value>| stack.pop().ok_or(Error::StackUnderflow(id));
            let jump = |target: InstrId| {
                positions
                    .get(&target)
                    .copied()
                    .ok_or(Error::UnknownInstruction(target))
            };

            match (instruction.op, &instruction.operand) {
                (OpCode::Nop, _) => {}
                (OpCode::Ldarg, Operand::Arg(index)) => {
                    let value = arguments
                        .get(*index as usize)
                        .cloned()
                        .ok_or_else(|| mismatch("argument index out of range"))?;
                    stack.push(value);
                }
                (OpCode::Ldloc, Operand::Local(local)) => {
                    let value = locals
                        .get(local.index())
                        .cloned()
                        .ok_or_else(|| mismatch("undeclared local"))?;
                    stack.push(value);
                }
                (OpCode::Stloc, Operand::Local(local)) => {
                    let value = pop(&mut stack)?;
                    let slot = locals
                        .get_mut(local.index())
                        .ok_or_else(|| mismatch("undeclared local"))?;
                    *slot = value;
                }
                (OpCode::LdcI4, Operand::Int32(value)) => stack.push(Value::Int(*value)),
                (OpCode::Ldstr, Operand::String(value)) => stack.push(Value::Str(value.clone())),
                (OpCode::Ldnull, _) => stack.push(Value::Null),
                (OpCode::Ldfld, Operand::Field(field)) => {
                    let Value::Object(object) = pop(&mut stack)? else {
                        return Err(mismatch("ldfld on a non-object"));
                    };
                    let value = self.field(object, &field.name).cloned().unwrap_or(Value::Null);
                    stack.push(value);
                }
                (OpCode::Ldflda, Operand::Field(field)) => {
                    let Value::Object(object) = pop(&mut stack)? else {
                        return Err(mismatch("ldflda on a non-object"));
                    };
                    stack.push(Value::FieldAddress(object, field.name.clone()));
                }
                (OpCode::Stfld, Operand::Field(field)) => {
                    let value = pop(&mut stack)?;
                    let Value::Object(object) = pop(&mut stack)? else {
                        return Err(mismatch("stfld on a non-object"));
                    };
                    self.set_field(object, &field.name, value);
                }
                (OpCode::Ldind, _) => {
                    let address = pop(&mut stack)?;
                    if !matches!(address, Value::FieldAddress(..)) {
                        return Err(mismatch("ldind on a non-reference"));
                    }
                    stack.push(self.deref(&address));
                }
                (OpCode::Stind, _) => {
                    let value = pop(&mut stack)?;
                    let Value::FieldAddress(object, field) = pop(&mut stack)? else {
                        return Err(mismatch("stind on a non-reference"));
                    };
                    self.set_field(object, &field, value);
                }
                (OpCode::Call | OpCode::Callvirt, Operand::Method(callee)) => {
                    let module = self.module;
                    let (_, callee_def) = module
                        .resolve_method(callee)
                        .ok_or_else(|| Error::UnknownMethod(callee.to_string()))?;
                    let arity = callee_def.parameters.len() + 1;
                    if stack.len() < arity {
                        return Err(Error::StackUnderflow(id));
                    }
                    let call_arguments = stack.split_off(stack.len() - arity);
                    if let Some(result) = self.call(callee, call_arguments)? {
                        stack.push(result);
                    }
                }
                (OpCode::Br, Operand::Target(target)) => pc = jump(*target)?,
                (OpCode::Brtrue, Operand::Target(target)) => {
                    if pop(&mut stack)?.is_truthy() {
                        pc = jump(*target)?;
                    }
                }
                (OpCode::Brfalse, Operand::Target(target)) => {
                    if !pop(&mut stack)?.is_truthy() {
                        pc = jump(*target)?;
                    }
                }
                (OpCode::Beq | OpCode::BneUn, Operand::Target(target)) => {
                    let right = pop(&mut stack)?;
                    let left = pop(&mut stack)?;
                    if (left == right) == (instruction.op == OpCode::Beq) {
                        pc = jump(*target)?;
                    }
                }
                (OpCode::Ceq, _) => {
                    let right = pop(&mut stack)?;
                    let left = pop(&mut stack)?;
                    stack.push(Value::Int(i32::from(left == right)));
                }
                (OpCode::Add | OpCode::Sub, _) => {
                    let (Value::Int(right), Value::Int(left)) = (pop(&mut stack)?, pop(&mut stack)?)
                    else {
                        return Err(mismatch("arithmetic on non-integers"));
                    };
                    let result = if instruction.op == OpCode::Add {
                        left.wrapping_add(right)
                    } else {
                        left.wrapping_sub(right)
                    };
                    stack.push(Value::Int(result));
                }
                (OpCode::Dup, _) => {
                    let top = stack.last().cloned().ok_or(Error::StackUnderflow(id))?;
                    stack.push(top);
                }
                (OpCode::Pop, _) => {
                    pop(&mut stack)?;
                }
                (OpCode::Ret, _) => {
                    if def.return_type.is_void() {
                        return Ok(None);
                    }
                    return pop(&mut stack).map(Some);
                }
                (op, operand) => {
                    return Err(mismatch(&format!("{op} cannot take operand {operand:?}")));
                }
            }
        }
    }
}
