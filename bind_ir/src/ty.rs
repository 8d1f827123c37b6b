
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

pub const STRING_CLASS: &str = "java.lang.String";

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

/// java.lang wrappers around primitive values. These marshal like their
/// primitive counterparts but accept nil.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BoxedKind {
    Boolean,
    Byte,
    Character,
    Short,
    Integer,
    Long,
    Float,
    Double,
}

impl BoxedKind {
    pub const ALL: [BoxedKind; 8] = [
        BoxedKind::Boolean,
        BoxedKind::Byte,
        BoxedKind::Character,
        BoxedKind::Short,
        BoxedKind::Integer,
        BoxedKind::Long,
        BoxedKind::Float,
        BoxedKind::Double,
    ];

    pub fn class_name(self) -> &'static str {
        match self {
            BoxedKind::Boolean => "java.lang.Boolean",
            BoxedKind::Byte => "java.lang.Byte",
            BoxedKind::Character => "java.lang.Character",
            BoxedKind::Short => "java.lang.Short",
            BoxedKind::Integer => "java.lang.Integer",
            BoxedKind::Long => "java.lang.Long",
            BoxedKind::Float => "java.lang.Float",
            BoxedKind::Double => "java.lang.Double",
        }
    }

    pub fn from_class_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|boxed| boxed.class_name() == name)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ObjectKind {
    Boxed(BoxedKind),
    Class(String),
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum TypeKind {
    Void,
    Boolean,
    Integer(IntWidth),
    Char,
    Float32,
    Float64,
    String,
    Object(ObjectKind),
}

impl TypeKind {
    pub fn class(name: impl Into<String>) -> Self {
        TypeKind::Object(ObjectKind::Class(name.into()))
    }

    pub fn boxed(kind: BoxedKind) -> Self {
        TypeKind::Object(ObjectKind::Boxed(kind))
    }

    /// Raw primitives never accept nil from scripts.
    pub fn is_primitive(&self) -> bool {
        match self {
            TypeKind::Boolean
            | TypeKind::Integer(..)
            | TypeKind::Char
            | TypeKind::Float32
            | TypeKind::Float64 => true,

            TypeKind::Void | TypeKind::String | TypeKind::Object(..) => false,
        }
    }

    /// Java source spelling, e.g. `int` or `java.lang.Integer`
    pub fn java_name(&self) -> &str {
        match self {
            TypeKind::Void => "void",
            TypeKind::Boolean => "boolean",
            TypeKind::Integer(IntWidth::W8) => "byte",
            TypeKind::Integer(IntWidth::W16) => "short",
            TypeKind::Integer(IntWidth::W32) => "int",
            TypeKind::Integer(IntWidth::W64) => "long",
            TypeKind::Char => "char",
            TypeKind::Float32 => "float",
            TypeKind::Float64 => "double",
            TypeKind::String => STRING_CLASS,
            TypeKind::Object(ObjectKind::Boxed(boxed)) => boxed.class_name(),
            TypeKind::Object(ObjectKind::Class(name)) => name.as_str(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeDescriptor {
    pub kind: TypeKind,
    pub dims: usize,
}

impl TypeDescriptor {
    pub fn new(kind: TypeKind) -> Self {
        Self { kind, dims: 0 }
    }

    pub fn void() -> Self {
        Self::new(TypeKind::Void)
    }

    pub fn is_void(&self) -> bool {
        self.kind == TypeKind::Void && self.dims == 0
    }

    pub fn is_array(&self) -> bool {
        self.dims > 0
    }

    /// The type with all array dimensions stripped.
    pub fn element(&self) -> TypeDescriptor {
        Self::new(self.kind.clone())
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind.java_name())?;
        for _ in 0..self.dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TypeParseError {
    pub text: String,
    pub reason: &'static str,
}

impl fmt::Display for TypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid type `{}`: {}", self.text, self.reason)
    }
}

impl std::error::Error for TypeParseError {}

/// Matches a qualified Java binary name such as `a.b.Outer$Inner`.
pub fn is_class_name(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$")
                .expect("class name pattern is valid")
        })
        .is_match(name)
}

impl FromStr for TypeDescriptor {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| TypeParseError {
            text: s.to_string(),
            reason,
        };

        let mut base = s.trim();
        let mut dims = 0;
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.trim_end();
            dims += 1;
        }

        let kind = match base {
            "" => return Err(err("missing element type")),
            "void" => TypeKind::Void,
            "boolean" => TypeKind::Boolean,
            "byte" => TypeKind::Integer(IntWidth::W8),
            "short" => TypeKind::Integer(IntWidth::W16),
            "int" => TypeKind::Integer(IntWidth::W32),
            "long" => TypeKind::Integer(IntWidth::W64),
            "char" => TypeKind::Char,
            "float" => TypeKind::Float32,
            "double" => TypeKind::Float64,
            STRING_CLASS => TypeKind::String,

            other => match BoxedKind::from_class_name(other) {
                Some(boxed) => TypeKind::boxed(boxed),
                None if is_class_name(other) => TypeKind::class(other),
                None => return Err(err("not a qualified class name")),
            },
        };

        if kind == TypeKind::Void && dims > 0 {
            return Err(err("void cannot be an array element"));
        }

        Ok(TypeDescriptor { kind, dims })
    }
}

impl TryFrom<String> for TypeDescriptor {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeDescriptor> for String {
    fn from(ty: TypeDescriptor) -> Self {
        ty.to_string()
    }
}
