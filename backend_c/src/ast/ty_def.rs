use crate::ast::JniFunction;
use std::fmt;

/// Named types from the JNI, Lua and luajni headers plus the per-unit
/// metadata block.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TypeName {
    JBoolean,
    JByte,
    JChar,
    JShort,
    JInt,
    JLong,
    JFloat,
    JDouble,
    JObject,
    JString,
    JClass,
    JFieldId,
    JMethodId,
    JniEnv,
    JavaVm,

    LuaState,
    LuaReg,

    JavaObject,
    JavaArray,

    ClassInfo,
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TypeName::JBoolean => "jboolean",
            TypeName::JByte => "jbyte",
            TypeName::JChar => "jchar",
            TypeName::JShort => "jshort",
            TypeName::JInt => "jint",
            TypeName::JLong => "jlong",
            TypeName::JFloat => "jfloat",
            TypeName::JDouble => "jdouble",
            TypeName::JObject => "jobject",
            TypeName::JString => "jstring",
            TypeName::JClass => "jclass",
            TypeName::JFieldId => "jfieldID",
            TypeName::JMethodId => "jmethodID",
            TypeName::JniEnv => "JNIEnv",
            TypeName::JavaVm => "JavaVM",
            TypeName::LuaState => "lua_State",
            TypeName::LuaReg => "luaL_Reg",
            TypeName::JavaObject => "JavaObject",
            TypeName::JavaArray => "JavaArray",
            TypeName::ClassInfo => "ClassInfo",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Type {
    Void,
    Int,
    Int64,
    Char,
    Const(Box<Type>),
    Pointer(Box<Type>),

    Named(TypeName),

    // array declared with an initializer list, size left to the compiler
    UnsizedArray(Box<Type>),
}

impl Type {
    pub fn ptr(self) -> Self {
        Type::Pointer(Box::new(self))
    }

    pub fn constant(self) -> Self {
        Type::Const(Box::new(self))
    }

    pub fn unsized_array(self) -> Self {
        Type::UnsizedArray(Box::new(self))
    }

    pub fn c_string() -> Self {
        Type::Char.constant().ptr()
    }

    pub fn env_ptr() -> Self {
        Type::Named(TypeName::JniEnv).ptr()
    }

    pub fn lua_state_ptr() -> Self {
        Type::Named(TypeName::LuaState).ptr()
    }

    pub fn class_info_ptr() -> Self {
        Type::Named(TypeName::ClassInfo).ptr()
    }

    fn build_decl_string(&self, left: &mut String, right: &mut String) {
        match self {
            Type::Pointer(ty) => {
                ty.build_decl_string(left, right);
                left.push('*');
            }
            Type::Const(ty) => {
                left.push_str("const ");
                ty.build_decl_string(left, right);
            }
            Type::UnsizedArray(el) => {
                el.build_decl_string(left, right);
                right.push_str("[]");
            }

            Type::Void => left.push_str("void"),
            Type::Int => left.push_str("int"),
            Type::Int64 => left.push_str("int64_t"),
            Type::Char => left.push_str("char"),
            Type::Named(name) => left.push_str(&name.to_string()),
        }
    }

    pub fn to_decl_string<Name>(&self, name: &Name) -> String
    where
        Name: ?Sized + fmt::Display,
    {
        let mut left = String::new();
        let mut right = String::new();

        self.build_decl_string(&mut left, &mut right);

        format!("{} {}{}", left, name, right)
    }

    pub fn typename(&self) -> String {
        let mut left = String::new();
        let mut right = String::new();
        self.build_decl_string(&mut left, &mut right);
        left + &right
    }
}

impl From<TypeName> for Type {
    fn from(name: TypeName) -> Self {
        Type::Named(name)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StructMember {
    pub name: FieldName,
    pub ty: Type,
}

/// `typedef struct X { ... } X;`
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StructDef {
    pub name: TypeName,
    pub members: Vec<StructMember>,
}

impl StructDef {
    pub fn new(name: TypeName) -> Self {
        Self {
            name,
            members: Vec::new(),
        }
    }

    pub fn member(&mut self, name: FieldName, ty: impl Into<Type>) {
        self.members.push(StructMember {
            name,
            ty: ty.into(),
        });
    }
}

impl fmt::Display for StructDef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "typedef struct {} {{", self.name)?;
        for member in &self.members {
            writeln!(f, "  {};", member.ty.to_decl_string(&member.name))?;
        }
        write!(f, "}} {};", self.name)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum FieldName {
    // ClassInfo
    Name,
    Id,
    InstanceId,
    FieldId(String),
    MethodId { alias: String, order: Option<usize> },
    Getter(String),
    Setter(String),
    Ctor(Option<usize>),
    DefaultCtor,

    // JavaArray
    Level,
    ElementType,

    /// entry in the `JNIEnv`/`JavaVM` function table
    Jni(JniFunction),
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldName::Name => write!(f, "name"),
            FieldName::Id => write!(f, "id"),
            FieldName::InstanceId => write!(f, "instanceId"),
            FieldName::FieldId(alias) => write!(f, "fid_{}", alias),
            FieldName::MethodId { alias, order: None } => write!(f, "mid_{}", alias),
            FieldName::MethodId {
                alias,
                order: Some(order),
            } => write!(f, "mid_{}{}{}", alias, bind_ir::ORDER_SEPARATOR, order),
            FieldName::Getter(alias) => write!(f, "getter_{}", alias),
            FieldName::Setter(alias) => write!(f, "setter_{}", alias),
            FieldName::Ctor(None) => write!(f, "ctor"),
            FieldName::Ctor(Some(order)) => write!(f, "ctor_{}", order),
            FieldName::DefaultCtor => write!(f, "ctor_default"),
            FieldName::Level => write!(f, "level"),
            FieldName::ElementType => write!(f, "elementType"),
            FieldName::Jni(func) => write!(f, "{}", func),
        }
    }
}
