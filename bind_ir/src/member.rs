use crate::ty::TypeDescriptor;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Joins an external name to its overload number in generated C names.
pub const ORDER_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(rename = "type")]
    pub ty: TypeDescriptor,

    #[serde(default)]
    pub read_only: bool,

    #[serde(default, rename = "static")]
    pub is_static: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            alias: None,
            ty,
            read_only: false,
            is_static: false,
        }
    }

    pub fn with_alias(self, alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..self
        }
    }

    pub fn read_only(self) -> Self {
        Self {
            read_only: true,
            ..self
        }
    }

    pub fn static_field(self) -> Self {
        Self {
            is_static: true,
            ..self
        }
    }

    pub fn external_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// How a flatten-to-field method takes part in attribute access.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Accessor {
    Getter,
    Setter,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    #[serde(default = "constructor_name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(rename = "return_type", default = "TypeDescriptor::void")]
    pub return_ty: TypeDescriptor,

    #[serde(default)]
    pub params: Vec<ParameterDescriptor>,

    #[serde(default, rename = "static")]
    pub is_static: bool,

    #[serde(default, rename = "flatten")]
    pub flatten_to_field: bool,

    /// Position among earlier overloads sharing the external name. Assigned
    /// during overload grouping, never read from descriptor files.
    #[serde(skip)]
    pub overload_order: Option<usize>,
}

fn constructor_name() -> String {
    CONSTRUCTOR_NAME.to_string()
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, return_ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            alias: None,
            return_ty,
            params: Vec::new(),
            is_static: false,
            flatten_to_field: false,
            overload_order: None,
        }
    }

    pub fn constructor(params: impl IntoIterator<Item = ParameterDescriptor>) -> Self {
        Self::new(CONSTRUCTOR_NAME, TypeDescriptor::void()).with_params(params)
    }

    pub fn with_alias(self, alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..self
        }
    }

    pub fn with_params(self, params: impl IntoIterator<Item = ParameterDescriptor>) -> Self {
        Self {
            params: params.into_iter().collect(),
            ..self
        }
    }

    pub fn static_method(self) -> Self {
        Self {
            is_static: true,
            ..self
        }
    }

    pub fn flattened(self) -> Self {
        Self {
            flatten_to_field: true,
            ..self
        }
    }

    pub fn external_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Zero params reads, one param writes. Anything else is not a valid
    /// flatten target and is rejected during validation.
    pub fn accessor(&self) -> Option<Accessor> {
        if !self.flatten_to_field {
            return None;
        }

        match self.params.len() {
            0 => Some(Accessor::Getter),
            1 => Some(Accessor::Setter),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        !self.flatten_to_field
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", param.name, param.ty)?;
        }
        write!(f, "): {}", self.return_ty)
    }
}
