//! Module, type, member and attribute definitions.

use crate::body::MethodBody;
use crate::types::TypeSig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A compiled unit: the types it defines and the assemblies it references.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub assembly_references: Vec<String>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, ty: TypeDef) -> Self {
        self.types.push(ty);
        self
    }

    pub fn find_type(&self, full_name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|ty| ty.full_name() == full_name)
    }

    pub fn find_type_mut(&mut self, full_name: &str) -> Option<&mut TypeDef> {
        self.types.iter_mut().find(|ty| ty.full_name() == full_name)
    }

    /// Resolves a method reference against the types of this module.
    pub fn resolve_method(&self, method: &MethodRef) -> Option<(&TypeDef, &MethodDef)> {
        let ty = self.find_type(strip_generic_arguments(&method.declaring_type))?;
        let def = ty.resolve(method)?;
        Some((ty, def))
    }

    /// Every method in the module, paired with its declaring type.
    pub fn methods(&self) -> impl Iterator<Item = (&TypeDef, &MethodDef)> + '_ {
        self.types
            .iter()
            .flat_map(|ty| ty.methods.iter().map(move |method| (ty, method)))
    }
}

/// Removes a trailing generic argument list (`Ns.Box`1<T>` becomes `Ns.Box`1`).
pub fn strip_generic_arguments(name: &str) -> &str {
    match name.find('<') {
        Some(open) if name.ends_with('>') => &name[..open],
        _ => name,
    }
}

/// A type definition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_parameters: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

impl TypeDef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Name used when emitting member references to this type. Generic types are
    /// referenced through their own instantiation (`Ns.Box`1<T>`).
    pub fn reference_name(&self) -> String {
        if self.generic_parameters.is_empty() {
            self.full_name()
        } else {
            format!("{}<{}>", self.full_name(), self.generic_parameters.join(","))
        }
    }

    /// First method with this name. Use [`TypeDef::resolve`] when overloads matter.
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// The method a reference designates, matching parameter types when it carries them.
    pub fn resolve(&self, method: &MethodRef) -> Option<&MethodDef> {
        self.methods.iter().find(|def| method.matches(def))
    }

    pub fn method_index(&self, name: &str) -> Option<usize> {
        self.methods.iter().position(|method| method.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|property| property.name == name)
    }

    /// Reference to one of this type's methods, pinned to its parameter types.
    pub fn method_ref(&self, method: &MethodDef) -> MethodRef {
        MethodRef::new(self.reference_name(), &method.name).with_parameters(
            method
                .parameters
                .iter()
                .map(|p| p.parameter_type.clone())
                .collect(),
        )
    }

    pub fn field_ref(&self, name: &str) -> FieldRef {
        FieldRef::new(self.reference_name(), name)
    }

    /// Fully qualified display name of a member of this type.
    pub fn member_full_name(&self, method: &MethodDef) -> String {
        let parameters: Vec<String> = method
            .parameters
            .iter()
            .map(|p| p.parameter_type.full_name())
            .collect();
        format!(
            "{} {}::{}({})",
            method.return_type,
            self.full_name(),
            method.name,
            parameters.join(",")
        )
    }

    pub fn property_full_name(&self, property: &PropertyDef) -> String {
        format!(
            "{} {}::{}()",
            property.property_type,
            self.full_name(),
            property.name
        )
    }
}

/// A field: the storage behind auto-implemented properties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: TypeSig,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: TypeSig) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// A property and the names of its accessors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub property_type: TypeSig,
    #[serde(default)]
    pub getter: Option<String>,
    #[serde(default)]
    pub setter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backing_field: Option<String>,
}

impl PropertyDef {
    /// An auto-property with conventional accessor and backing field names.
    pub fn auto(name: impl Into<String>, property_type: TypeSig) -> Self {
        let name = name.into();
        Self {
            getter: Some(format!("get_{name}")),
            setter: Some(format!("set_{name}")),
            backing_field: None,
            property_type,
            name,
        }
    }

    /// Backing field name, defaulting to the compiler-generated `<Name>k__BackingField`.
    pub fn backing_field_name(&self) -> String {
        self.backing_field
            .clone()
            .unwrap_or_else(|| format!("<{}>k__BackingField", self.name))
    }
}

/// A method definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub return_type: TypeSig,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<CustomAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<MethodBody>,
}

impl MethodDef {
    pub fn new(name: impl Into<String>, return_type: TypeSig) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters: Vec::new(),
            attributes: Vec::new(),
            body: None,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, parameter_type: TypeSig) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            parameter_type,
        });
        self
    }

    pub fn with_attribute(mut self, attribute: CustomAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// A formal parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    pub parameter_type: TypeSig,
}

/// An attribute instance attached to a member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAttribute {
    pub attribute_type: String,
    #[serde(default)]
    pub arguments: Vec<AttributeArgument>,
}

impl CustomAttribute {
    pub fn new(attribute_type: impl Into<String>) -> Self {
        Self {
            attribute_type: attribute_type.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: AttributeArgument) -> Self {
        self.arguments.push(argument);
        self
    }
}

/// A constructor argument of an attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeArgument {
    Bool(bool),
    Int32(i32),
    String(String),
}

/// Reference to a method by declaring type, name and, optionally, parameter types.
///
/// Without parameter types the reference binds to the first method of that name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub declaring_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<TypeSig>>,
}

impl MethodRef {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<TypeSig>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn matches(&self, method: &MethodDef) -> bool {
        if method.name != self.name {
            return false;
        }
        match &self.parameters {
            Some(parameters) => {
                parameters.len() == method.parameters.len()
                    && parameters
                        .iter()
                        .zip(&method.parameters)
                        .all(|(expected, actual)| *expected == actual.parameter_type)
            }
            None => true,
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)?;
        if let Some(parameters) = &self.parameters {
            let names: Vec<String> = parameters.iter().map(TypeSig::full_name).collect();
            write!(f, "({})", names.join(","))?;
        }
        Ok(())
    }
}

/// Reference to a field by declaring type and name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub declaring_type: String,
    pub name: String,
}

impl FieldRef {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}
