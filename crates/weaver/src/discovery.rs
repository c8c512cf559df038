//! Hook discovery: finding marked methods and resolving the property they observe.
//!
//! A marker is consumed as soon as it is found, whether or not the hook turns out to be
//! valid. A malformed hook is therefore reported once and never retried; removing the
//! marker is also what makes a second pass over the same module a no-op.

use crate::contract::{self, ContractViolation};
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use crate::WeaverConfig;
use setterweave_core::{AttributeArgument, CustomAttribute, TypeDef};
use thiserror::Error;
use tracing::debug;

/// Typed view of the marker attribute: the name of the property to hook into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookMarker {
    pub property: String,
}

impl HookMarker {
    /// Reads the marker's single string argument.
    pub fn from_attribute(attribute: &CustomAttribute) -> Option<Self> {
        match attribute.arguments.as_slice() {
            [AttributeArgument::String(property)] => Some(Self {
                property: property.clone(),
            }),
            _ => None,
        }
    }
}

/// Per-candidate rejection. None of these abort the pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error(
        "The method '{method}' is annotated to be called by the setter of the property '{property}' but the property doesn't exist."
    )]
    MissingProperty { method: String, property: String },

    #[error(
        "The method '{method}' is annotated to be called by the setter of the property '{property}' but the property has no getter."
    )]
    MissingGetter { method: String, property: String },

    #[error(
        "The method '{method}' is annotated to be called by the setter of the property '{property}' but the property has no setter."
    )]
    MissingSetter { method: String, property: String },

    #[error(
        "The method '{method}' is annotated to be called by the setter of the property '{property}' but the method signature doesn't match: {violation}. The expected signature is '{expected}'."
    )]
    SignatureMismatch {
        method: String,
        property: String,
        violation: String,
        expected: String,
    },

    #[error("The method '{method}' carries {count} '{marker}' attributes but at most one is allowed.")]
    AmbiguousMarker {
        method: String,
        marker: String,
        count: usize,
    },

    #[error(
        "The '{marker}' attribute on the method '{method}' must have exactly one string argument naming a property."
    )]
    MalformedMarker { method: String, marker: String },
}

impl HookError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            HookError::MissingProperty { .. } => DiagnosticCode::MissingProperty,
            HookError::MissingGetter { .. } => DiagnosticCode::MissingGetter,
            HookError::MissingSetter { .. } => DiagnosticCode::MissingSetter,
            HookError::SignatureMismatch { .. } => DiagnosticCode::SignatureMismatch,
            HookError::AmbiguousMarker { .. } => DiagnosticCode::AmbiguousMarker,
            HookError::MalformedMarker { .. } => DiagnosticCode::MalformedMarker,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string())
    }
}

/// A validated hook: indices into the declaring type's methods and properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookBinding {
    pub hook: usize,
    pub property: usize,
    pub getter: usize,
    pub setter: usize,
}

/// Removes every marker from the method and returns them.
pub fn take_markers(
    ty: &mut TypeDef,
    method_index: usize,
    config: &WeaverConfig,
    sink: &mut dyn DiagnosticSink,
) -> Vec<CustomAttribute> {
    let full_name = ty.member_full_name(&ty.methods[method_index]);
    let method = &mut ty.methods[method_index];

    let (taken, kept): (Vec<_>, Vec<_>) = method
        .attributes
        .drain(..)
        .partition(|attribute| attribute.attribute_type == config.marker_attribute);
    method.attributes = kept;

    for _ in &taken {
        sink.emit(Diagnostic::info(
            DiagnosticCode::MarkerRemoved,
            format!(
                "Removed the attribute '{}' from the method '{full_name}'.",
                config.marker_attribute
            ),
        ));
    }
    taken
}

/// Examines one method. `Ok(None)` means the method carries no marker.
pub fn discover(
    ty: &mut TypeDef,
    method_index: usize,
    config: &WeaverConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<Option<HookBinding>, HookError> {
    let markers = take_markers(ty, method_index, config, sink);
    let method = &ty.methods[method_index];
    let method_name = ty.member_full_name(method);

    let marker = match markers.as_slice() {
        [] => return Ok(None),
        [single] => single,
        many => {
            return Err(HookError::AmbiguousMarker {
                method: method_name,
                marker: config.marker_attribute.clone(),
                count: many.len(),
            });
        }
    };
    let HookMarker { property: property_name } =
        HookMarker::from_attribute(marker).ok_or_else(|| HookError::MalformedMarker {
            method: method_name.clone(),
            marker: config.marker_attribute.clone(),
        })?;
    debug!("Method {} hooks into property {}", method.name, property_name);

    let property_index = ty
        .properties
        .iter()
        .position(|p| p.name == property_name)
        .ok_or_else(|| HookError::MissingProperty {
            method: method_name.clone(),
            property: property_name.clone(),
        })?;
    let property = &ty.properties[property_index];
    let property_full_name = ty.property_full_name(property);

    let accessor = |name: &Option<String>| name.as_deref().and_then(|n| ty.method_index(n));
    let getter = accessor(&property.getter).ok_or_else(|| HookError::MissingGetter {
        method: method_name.clone(),
        property: property_full_name.clone(),
    })?;
    let setter = accessor(&property.setter).ok_or_else(|| HookError::MissingSetter {
        method: method_name.clone(),
        property: property_full_name.clone(),
    })?;

    contract::check_signature(method, property).map_err(|violation: ContractViolation| {
        HookError::SignatureMismatch {
            method: method_name.clone(),
            property: property_name.clone(),
            violation: violation.to_string(),
            expected: contract::expected_signature(&method.name, property),
        }
    })?;

    Ok(Some(HookBinding {
        hook: method_index,
        property: property_index,
        getter,
        setter,
    }))
}
