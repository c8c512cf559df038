//! Rewrites a property setter so it calls its hook at every exit.
//!
//! ```text
//! // Original setter            // Instrumented setter
//!                               ldarg 0
//!                               callvirt T::get_X
//!                               stloc V_prev
//! ldarg 0                       ldarg 0
//! ldarg 1                       ldarg 1
//! stfld T::<X>k__BackingField   stfld T::<X>k__BackingField
//!                               ldarg 0                         // this
//!                               ldloc V_prev                    // previous value
//!                               ldarg 0
//!                               ldflda T::<X>k__BackingField    // ref current value
//!                               callvirt T::OnXChanged
//! ret                           ret
//! ```
//!
//! The same five-instruction block is spliced in front of every `ret`. Branches that
//! jumped straight to a `ret` now land on the first instruction of that block, so an
//! early return calls the hook exactly like the fall-through path does.

use crate::discovery::HookBinding;
use crate::{Error, Result};
use setterweave_core::validator::validate_body;
use setterweave_core::{
    FieldRef, Instruction, LocalId, MethodBody, MethodRef, TypeDef, TypeSig,
};
use tracing::debug;

/// What the rewrite of one setter did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentReport {
    /// Local that holds the value read before the assignment.
    pub previous_value: LocalId,
    /// Number of `ret` instructions preceded by a hook call.
    pub exit_points: usize,
    /// Number of branch operands moved from a `ret` onto its hook call.
    pub redirected_branches: usize,
}

/// Instruments the setter named by `binding` in place.
pub fn instrument(ty: &mut TypeDef, binding: &HookBinding) -> Result<InstrumentReport> {
    let property = ty.properties[binding.property].clone();
    let backing_name = property.backing_field_name();
    let Some(field) = ty.field(&backing_name) else {
        return Err(Error::MissingBackingField {
            property: ty.property_full_name(&property),
            field: backing_name,
        });
    };
    if field.field_type != property.property_type {
        return Err(Error::BackingFieldType {
            property: ty.property_full_name(&property),
            field: backing_name,
            expected: property.property_type.full_name(),
            actual: field.field_type.full_name(),
        });
    }

    let getter = ty.method_ref(&ty.methods[binding.getter]);
    let hook = ty.method_ref(&ty.methods[binding.hook]);
    let backing = ty.field_ref(&backing_name);

    let setter_name = ty.member_full_name(&ty.methods[binding.setter]);
    let body = ty.methods[binding.setter]
        .body
        .as_mut()
        .ok_or(Error::MissingBody(setter_name))?;

    rewrite_setter(body, property.property_type, getter, hook, backing)
}

/// Splices the capture prologue and the per-exit hook calls into `body`.
pub fn rewrite_setter(
    body: &mut MethodBody,
    property_type: TypeSig,
    getter: MethodRef,
    hook: MethodRef,
    backing: FieldRef,
) -> Result<InstrumentReport> {
    let previous_value = body.add_variable(property_type)?;

    // previous = this.get_X()
    body.insert_at(
        0,
        vec![
            Instruction::ldarg(0),
            Instruction::callvirt(getter),
            Instruction::stloc(previous_value),
        ],
    )?;

    let exits = body.find_all(|instruction| instruction.op.is_exit());
    debug!("Setter has {} exit point(s)", exits.len());

    let mut redirected_branches = 0;
    for exit in &exits {
        // this.Hook(previous, ref this.backing)
        let block = vec![
            Instruction::ldarg(0),
            Instruction::ldloc(previous_value),
            Instruction::ldarg(0),
            Instruction::ldflda(backing.clone()),
            Instruction::callvirt(hook.clone()),
        ];
        let inserted = body.insert_before(*exit, block)?;
        redirected_branches += body.retarget(*exit, inserted[0])?;
    }

    validate_body(body)?;

    Ok(InstrumentReport {
        previous_value,
        exit_points: exits.len(),
        redirected_branches,
    })
}
