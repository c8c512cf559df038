//! Signature contract between a setter hook and the property it observes.
//!
//! A hook for a property of type `T` must look like `void Hook(T previous, ref T current)`.

use setterweave_core::{MethodDef, PropertyDef, TypeSig};
use std::fmt;

/// First condition of the contract that a hook method fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// The hook returns a value.
    ReturnType(TypeSig),
    /// The hook does not take exactly two parameters.
    ParameterCount(usize),
    /// Parameter 0 is not the property type.
    PreviousValueType(TypeSig),
    /// Parameter 1 is not passed by reference.
    CurrentValueNotByRef(TypeSig),
    /// Parameter 1 refers to another type.
    CurrentValueType(TypeSig),
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractViolation::ReturnType(ty) => write!(f, "it returns '{ty}' instead of void"),
            ContractViolation::ParameterCount(n) => write!(f, "it takes {n} parameters instead of 2"),
            ContractViolation::PreviousValueType(ty) => {
                write!(f, "its first parameter is '{ty}'")
            }
            ContractViolation::CurrentValueNotByRef(ty) => {
                write!(f, "its second parameter '{ty}' is not passed by reference")
            }
            ContractViolation::CurrentValueType(ty) => {
                write!(f, "its second parameter is '{ty}'")
            }
        }
    }
}

/// Checks the hook signature against the property, reporting the first failing condition.
pub fn check_signature(hook: &MethodDef, property: &PropertyDef) -> Result<(), ContractViolation> {
    let expected = &property.property_type;

    if !hook.return_type.is_void() {
        return Err(ContractViolation::ReturnType(hook.return_type.clone()));
    }
    let [previous, current] = hook.parameters.as_slice() else {
        return Err(ContractViolation::ParameterCount(hook.parameters.len()));
    };
    if &previous.parameter_type != expected {
        return Err(ContractViolation::PreviousValueType(previous.parameter_type.clone()));
    }
    if !current.parameter_type.is_by_ref() {
        return Err(ContractViolation::CurrentValueNotByRef(current.parameter_type.clone()));
    }
    if current.parameter_type.element_type() != expected {
        return Err(ContractViolation::CurrentValueType(current.parameter_type.clone()));
    }
    Ok(())
}

/// Returns true if `hook` can be wired into the setter of `property`.
pub fn matches(hook: &MethodDef, property: &PropertyDef) -> bool {
    check_signature(hook, property).is_ok()
}

/// The signature a hook for `property` is expected to have, as shown in diagnostics.
pub fn expected_signature(hook_name: &str, property: &PropertyDef) -> String {
    let ty = &property.property_type;
    format!("void {hook_name}({ty}, ref {ty})")
}
