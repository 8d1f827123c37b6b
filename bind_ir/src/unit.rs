use crate::member::FieldDescriptor;
use crate::member::MethodDescriptor;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// C-safe identifier for a binary class name: `a.b.Outer$Inner` becomes
/// `a_b_Outer__Inner`.
pub fn ident_of(class_name: &str) -> String {
    class_name.replace('.', "_").replace('$', "__")
}

/// The simple name scripts see: the segment after the last `$`, or after
/// the last `.` for top-level classes.
pub fn short_name_of(class_name: &str) -> &str {
    let sep = if class_name.contains('$') { '$' } else { '.' };
    match class_name.rfind(sep) {
        Some(pos) => &class_name[pos + 1..],
        None => class_name,
    }
}

/// JNI lookup form of a binary name, `a/b/Outer$Inner`.
pub fn jni_path_of(class_name: &str) -> String {
    class_name.replace('.', "/")
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    pub name: String,

    #[serde(default)]
    pub auto_register: bool,

    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,

    #[serde(default)]
    pub constructors: Vec<MethodDescriptor>,

    /// Static methods that are also bound as script globals.
    #[serde(default)]
    pub functions: Vec<MethodDescriptor>,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auto_register: false,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn ident(&self) -> String {
        ident_of(&self.name)
    }

    pub fn short_name(&self) -> &str {
        short_name_of(&self.name)
    }

    /// Methods that are called rather than flattened, followed by the global
    /// functions, in declaration order.
    pub fn callables(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods
            .iter()
            .filter(|m| m.is_callable())
            .chain(self.functions.iter())
    }

    pub fn flattened(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.iter().filter(|m| m.flatten_to_field)
    }

    pub fn uses_default_constructor(&self) -> bool {
        self.auto_register && self.constructors.is_empty()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FunctionGroupDescriptor {
    pub name: String,

    /// Functions run on the `INSTANCE` object of the owner rather than
    /// statically.
    #[serde(default)]
    pub singleton: bool,

    #[serde(default)]
    pub functions: Vec<MethodDescriptor>,
}

impl FunctionGroupDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            singleton: false,
            functions: Vec::new(),
        }
    }

    pub fn ident(&self) -> String {
        ident_of(&self.name)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EnumConstant {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EnumDescriptor {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default)]
    pub constants: Vec<EnumConstant>,
}

impl EnumDescriptor {
    pub fn ident(&self) -> String {
        ident_of(&self.name)
    }

    pub fn global_name(&self) -> &str {
        self.alias
            .as_deref()
            .unwrap_or_else(|| short_name_of(&self.name))
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentDescriptor {
    pub name: String,

    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl EnvironmentDescriptor {
    pub fn ident(&self) -> String {
        ident_of(&self.name)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindingUnit {
    Class(ClassDescriptor),
    Functions(FunctionGroupDescriptor),
    Enum(EnumDescriptor),
    Environment(EnvironmentDescriptor),
}

impl BindingUnit {
    pub fn name(&self) -> &str {
        match self {
            BindingUnit::Class(class) => &class.name,
            BindingUnit::Functions(group) => &group.name,
            BindingUnit::Enum(enum_desc) => &enum_desc.name,
            BindingUnit::Environment(env) => &env.name,
        }
    }

    pub fn ident(&self) -> String {
        ident_of(self.name())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            BindingUnit::Class(..) => "class",
            BindingUnit::Functions(..) => "function group",
            BindingUnit::Enum(..) => "enum",
            BindingUnit::Environment(..) => "environment",
        }
    }
}

impl fmt::Display for BindingUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} `{}`", self.kind_name(), self.name())
    }
}

/// Everything one descriptor file declares, in generation order.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BindingModule {
    #[serde(default)]
    pub units: Vec<BindingUnit>,
}

impl BindingModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, other: BindingModule) {
        self.units.extend(other.units);
    }
}
