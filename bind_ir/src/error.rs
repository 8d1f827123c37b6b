use crate::member::Accessor;
use crate::ty::TypeDescriptor;
use common::DiagnosticOutput;
use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BindingErrorKind {
    InvalidClassName,
    InvalidIdentifier {
        role: &'static str,
        name: String,
    },
    ReservedSeparator {
        name: String,
    },
    DuplicateUnit,

    NameCollision {
        name: String,
        existing: &'static str,
        new: &'static str,
    },
    StaticMismatch {
        name: String,
    },
    InstanceFunction {
        name: String,
    },
    FunctionReceiverMismatch {
        name: String,
        singleton: bool,
    },
    InstanceEnvironmentField {
        name: String,
    },

    VoidField {
        name: String,
    },
    VoidParam {
        method: String,
        param: String,
    },
    FlattenArity {
        name: String,
        count: usize,
    },
    FlattenGetterReturnsVoid {
        name: String,
    },
    DuplicateAccessor {
        name: String,
        accessor: Accessor,
    },
    ConstructorReturnType {
        ty: TypeDescriptor,
    },
    DuplicateEnumConstant {
        name: String,
    },

    AmbiguousOverload {
        name: String,
        arity: usize,
        first: String,
        second: String,
    },
}

/// A problem with one unit (and usually one member of it) that stops
/// generation for the whole run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BindingError {
    pub owner: String,
    pub member: Option<String>,
    pub kind: BindingErrorKind,
}

impl BindingError {
    pub fn new(owner: impl Into<String>, kind: BindingErrorKind) -> Self {
        Self {
            owner: owner.into(),
            member: None,
            kind,
        }
    }

    pub fn with_member(self, member: impl Into<String>) -> Self {
        Self {
            member: Some(member.into()),
            ..self
        }
    }
}

impl fmt::Display for BindingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BindingErrorKind::InvalidClassName => write!(f, "Invalid class name"),
            BindingErrorKind::InvalidIdentifier { role, name } => {
                write!(f, "Invalid {} `{}`", role, name)
            }
            BindingErrorKind::ReservedSeparator { name } => {
                write!(f, "External name `{}` contains `{}`", name, crate::ORDER_SEPARATOR)
            }
            BindingErrorKind::DuplicateUnit => write!(f, "Duplicate binding unit"),

            BindingErrorKind::NameCollision { name, .. } => {
                write!(f, "Name `{}` is already bound", name)
            }
            BindingErrorKind::StaticMismatch { name } => {
                write!(f, "Overloads of `{}` mix static and instance methods", name)
            }
            BindingErrorKind::InstanceFunction { name } => {
                write!(f, "Global function `{}` is not static", name)
            }
            BindingErrorKind::FunctionReceiverMismatch { name, singleton } => {
                if *singleton {
                    write!(f, "Function `{}` of a singleton group is static", name)
                } else {
                    write!(f, "Function `{}` of a static group is an instance method", name)
                }
            }
            BindingErrorKind::InstanceEnvironmentField { name } => {
                write!(f, "Environment field `{}` is not static", name)
            }

            BindingErrorKind::VoidField { name } => write!(f, "Field `{}` has type void", name),
            BindingErrorKind::VoidParam { method, param } => {
                write!(f, "Parameter `{}` of `{}` has type void", param, method)
            }
            BindingErrorKind::FlattenArity { name, count } => write!(
                f,
                "Flattened method `{}` takes {} parameters",
                name, count
            ),
            BindingErrorKind::FlattenGetterReturnsVoid { name } => {
                write!(f, "Flattened getter `{}` returns void", name)
            }
            BindingErrorKind::DuplicateAccessor { name, accessor } => {
                let kind = match accessor {
                    Accessor::Getter => "getter",
                    Accessor::Setter => "setter",
                };
                write!(f, "Duplicate flattened {} for `{}`", kind, name)
            }
            BindingErrorKind::ConstructorReturnType { ty } => {
                write!(f, "Constructor returns `{}`", ty)
            }
            BindingErrorKind::DuplicateEnumConstant { name } => {
                write!(f, "Duplicate enum constant `{}`", name)
            }

            BindingErrorKind::AmbiguousOverload { name, arity, .. } => write!(
                f,
                "Ambiguous overloads of `{}` taking {} arguments",
                name, arity
            ),
        }
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl DiagnosticOutput for BindingError {
    fn title(&self) -> String {
        match &self.member {
            Some(member) => format!("{}: {} (in `{}`)", self.owner, self.kind, member),
            None => format!("{}: {}", self.owner, self.kind),
        }
    }

    fn notes(&self) -> Vec<String> {
        match &self.kind {
            BindingErrorKind::InvalidClassName => vec![
                "class names must be qualified binary names such as `com.example.Outer$Inner`"
                    .to_string(),
            ],
            BindingErrorKind::InvalidIdentifier { .. } => vec![
                "names visible to scripts must be valid C and Lua identifiers".to_string(),
            ],
            BindingErrorKind::ReservedSeparator { .. } => vec![format!(
                "`{}` separates a member from its overload number in generated names",
                crate::ORDER_SEPARATOR
            )],
            BindingErrorKind::NameCollision { existing, new, .. } => vec![format!(
                "a {} cannot share its name with a {}",
                new, existing
            )],
            BindingErrorKind::FlattenArity { .. } => vec![
                "flattened getters take no parameters and setters take exactly one".to_string(),
            ],
            BindingErrorKind::AmbiguousOverload { first, second, .. } => vec![
                format!("`{}` and `{}` accept the same script arguments", first, second),
                "overloads are tried in declaration order, so the second can never be called"
                    .to_string(),
            ],
            _ => Vec::new(),
        }
    }
}

pub type BindingResult<T> = Result<T, Vec<BindingError>>;
