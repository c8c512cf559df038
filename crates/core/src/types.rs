//! Type descriptors used by method signatures, fields and properties.

use crate::result::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Full name of the unit return type.
pub const VOID: &str = "System.Void";

/// Full name of the 32-bit integer type.
pub const INT32: &str = "System.Int32";

/// Full name of the string type.
pub const STRING: &str = "System.String";

/// Type signature of a parameter, return value, field, local or property.
///
/// The textual form follows the runtime convention: a by-reference type is its element
/// type's full name followed by `&` (`System.Int32&`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeSig {
    /// The unit type.
    Void,
    /// A named value or reference type, by full name.
    Named(String),
    /// A managed reference to the inner type.
    ByRef(Box<TypeSig>),
}

impl TypeSig {
    pub fn named(full_name: impl Into<String>) -> Self {
        TypeSig::Named(full_name.into())
    }

    pub fn int32() -> Self {
        TypeSig::named(INT32)
    }

    pub fn string() -> Self {
        TypeSig::named(STRING)
    }

    /// Wraps the signature in a by-reference marker.
    pub fn by_ref(self) -> Self {
        TypeSig::ByRef(Box::new(self))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeSig::Void)
    }

    pub fn is_by_ref(&self) -> bool {
        matches!(self, TypeSig::ByRef(_))
    }

    /// Strips one by-reference marker, if present.
    pub fn element_type(&self) -> &TypeSig {
        match self {
            TypeSig::ByRef(inner) => inner,
            other => other,
        }
    }

    pub fn full_name(&self) -> String {
        match self {
            TypeSig::Void => VOID.to_string(),
            TypeSig::Named(name) => name.clone(),
            TypeSig::ByRef(inner) => format!("{}&", inner.full_name()),
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSig::Void => f.write_str(VOID),
            TypeSig::Named(name) => f.write_str(name),
            TypeSig::ByRef(inner) => write!(f, "{inner}&"),
        }
    }
}

impl FromStr for TypeSig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(inner) = trimmed.strip_suffix('&') {
            let element: TypeSig = inner.parse()?;
            if element.is_void() {
                return Err(Error::InvalidTypeSig(s.to_string()));
            }
            return Ok(element.by_ref());
        }
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(Error::InvalidTypeSig(s.to_string()));
        }
        if trimmed == VOID {
            return Ok(TypeSig::Void);
        }
        Ok(TypeSig::Named(trimmed.to_string()))
    }
}

impl TryFrom<String> for TypeSig {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeSig> for String {
    fn from(value: TypeSig) -> Self {
        value.full_name()
    }
}
