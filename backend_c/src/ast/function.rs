use crate::ast::Statement;
use crate::ast::Type;
use bind_ir::BoxedKind;
use std::fmt;

/// Value categories of the JNI accessor families, as in `Call<Kind>Method`
/// and `Get<Kind>Field`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum JniKind {
    Void,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Object,
}

impl fmt::Display for JniKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            JniKind::Void => "Void",
            JniKind::Boolean => "Boolean",
            JniKind::Byte => "Byte",
            JniKind::Char => "Char",
            JniKind::Short => "Short",
            JniKind::Int => "Int",
            JniKind::Long => "Long",
            JniKind::Float => "Float",
            JniKind::Double => "Double",
            JniKind::Object => "Object",
        };
        write!(f, "{}", name)
    }
}

/// Field pushers provided by the luajni runtime, `luaJniPush<Kind>Field`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PushKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Boxed,
    Object,
    Array,
}

impl fmt::Display for PushKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PushKind::Boolean => "Boolean",
            PushKind::Byte => "Byte",
            PushKind::Char => "Char",
            PushKind::Short => "Short",
            PushKind::Int => "Int",
            PushKind::Long => "Long",
            PushKind::Float => "Float",
            PushKind::Double => "Double",
            PushKind::String => "String",
            PushKind::Boxed => "Boxed",
            PushKind::Object => "Object",
            PushKind::Array => "Array",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum JniFunction {
    FindClass,
    GetFieldId { is_static: bool },
    GetMethodId { is_static: bool },
    NewObject,
    NewStringUtf,
    GetStringUtfChars,
    ReleaseStringUtfChars,
    DeleteLocalRef,
    CallMethod { is_static: bool, kind: JniKind },
    GetField { is_static: bool, kind: JniKind },
    SetField { is_static: bool, kind: JniKind },

    // JavaVM
    GetEnv,
}

fn static_prefix(is_static: bool) -> &'static str {
    if is_static {
        "Static"
    } else {
        ""
    }
}

impl fmt::Display for JniFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JniFunction::FindClass => write!(f, "FindClass"),
            JniFunction::GetFieldId { is_static } => {
                write!(f, "Get{}FieldID", static_prefix(*is_static))
            }
            JniFunction::GetMethodId { is_static } => {
                write!(f, "Get{}MethodID", static_prefix(*is_static))
            }
            JniFunction::NewObject => write!(f, "NewObject"),
            JniFunction::NewStringUtf => write!(f, "NewStringUTF"),
            JniFunction::GetStringUtfChars => write!(f, "GetStringUTFChars"),
            JniFunction::ReleaseStringUtfChars => write!(f, "ReleaseStringUTFChars"),
            JniFunction::DeleteLocalRef => write!(f, "DeleteLocalRef"),
            JniFunction::CallMethod { is_static, kind } => {
                write!(f, "Call{}{}Method", static_prefix(*is_static), kind)
            }
            JniFunction::GetField { is_static, kind } => {
                write!(f, "Get{}{}Field", static_prefix(*is_static), kind)
            }
            JniFunction::SetField { is_static, kind } => {
                write!(f, "Set{}{}Field", static_prefix(*is_static), kind)
            }
            JniFunction::GetEnv => write!(f, "GetEnv"),
        }
    }
}

impl JniFunction {
    /// Whether a Java exception may be pending after this call returns.
    pub fn may_raise(self) -> bool {
        match self {
            JniFunction::NewObject
            | JniFunction::NewStringUtf
            | JniFunction::CallMethod { .. }
            | JniFunction::GetField { .. }
            | JniFunction::SetField { .. } => true,

            // lookups are checked by whoever drives registration
            JniFunction::FindClass
            | JniFunction::GetFieldId { .. }
            | JniFunction::GetMethodId { .. }
            | JniFunction::GetStringUtfChars
            | JniFunction::ReleaseStringUtfChars
            | JniFunction::DeleteLocalRef
            | JniFunction::GetEnv => false,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum FunctionName {
    // Lua C API
    LuaGetTop,
    LuaIsBoolean,
    LuaIsInteger,
    LuaIsNumber,
    LuaIsNil,
    LuaType,
    LuaToBoolean,
    LuaToInteger,
    LuaToNumber,
    LuaToString,
    LuaPushNil,
    LuaPushBoolean,
    LuaPushInteger,
    LuaPushNumber,
    LuaPushString,
    LuaPushValue,
    LuaPushCClosure,
    LuaPushLightUserdata,
    LuaSetGlobal,
    LuaSetField,
    LuaCreateTable,
    LuaPop,
    LuaNewUserdata,
    LuaToUserdata,
    LuaUpvalueIndex,
    LuaError,
    LuaLError,
    LuaLCheckUdata,
    LuaLTestUdata,
    LuaLCheckString,
    LuaLNewMetatable,
    LuaLSetMetatable,
    LuaLSetFuncs,

    // libc
    Malloc,
    Free,
    Strcmp,

    // luajni runtime
    GetEnv,
    TakeObject,
    PutBackObject,
    CacheObject,
    ReleaseObject,
    CatchJavaException,
    EqualJavaArray,
    JavaObjectGc,
    Register,
    Unregister,
    PushField { is_static: bool, kind: PushKind },
    BoxValue(BoxedKind),
    PushBoxed,

    // generated
    IndexMethod,
    NewIndexMethod,
    Method(String),
    ConstructorCall,
    Inject(String),
    RegisterUnit(String),
    UnregisterUnit(String),
    RegisterAll(String),
    UnregisterAll(String),
    JniOnLoad,
    JniOnUnload,
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FunctionName::LuaGetTop => write!(f, "lua_gettop"),
            FunctionName::LuaIsBoolean => write!(f, "lua_isboolean"),
            FunctionName::LuaIsInteger => write!(f, "lua_isinteger"),
            FunctionName::LuaIsNumber => write!(f, "lua_isnumber"),
            FunctionName::LuaIsNil => write!(f, "lua_isnil"),
            FunctionName::LuaType => write!(f, "lua_type"),
            FunctionName::LuaToBoolean => write!(f, "lua_toboolean"),
            FunctionName::LuaToInteger => write!(f, "lua_tointeger"),
            FunctionName::LuaToNumber => write!(f, "lua_tonumber"),
            FunctionName::LuaToString => write!(f, "lua_tostring"),
            FunctionName::LuaPushNil => write!(f, "lua_pushnil"),
            FunctionName::LuaPushBoolean => write!(f, "lua_pushboolean"),
            FunctionName::LuaPushInteger => write!(f, "lua_pushinteger"),
            FunctionName::LuaPushNumber => write!(f, "lua_pushnumber"),
            FunctionName::LuaPushString => write!(f, "lua_pushstring"),
            FunctionName::LuaPushValue => write!(f, "lua_pushvalue"),
            FunctionName::LuaPushCClosure => write!(f, "lua_pushcclosure"),
            FunctionName::LuaPushLightUserdata => write!(f, "lua_pushlightuserdata"),
            FunctionName::LuaSetGlobal => write!(f, "lua_setglobal"),
            FunctionName::LuaSetField => write!(f, "lua_setfield"),
            FunctionName::LuaCreateTable => write!(f, "lua_createtable"),
            FunctionName::LuaPop => write!(f, "lua_pop"),
            FunctionName::LuaNewUserdata => write!(f, "lua_newuserdata"),
            FunctionName::LuaToUserdata => write!(f, "lua_touserdata"),
            FunctionName::LuaUpvalueIndex => write!(f, "lua_upvalueindex"),
            FunctionName::LuaError => write!(f, "lua_error"),
            FunctionName::LuaLError => write!(f, "luaL_error"),
            FunctionName::LuaLCheckUdata => write!(f, "luaL_checkudata"),
            FunctionName::LuaLTestUdata => write!(f, "luaL_testudata"),
            FunctionName::LuaLCheckString => write!(f, "luaL_checkstring"),
            FunctionName::LuaLNewMetatable => write!(f, "luaL_newmetatable"),
            FunctionName::LuaLSetMetatable => write!(f, "luaL_setmetatable"),
            FunctionName::LuaLSetFuncs => write!(f, "luaL_setfuncs"),

            FunctionName::Malloc => write!(f, "malloc"),
            FunctionName::Free => write!(f, "free"),
            FunctionName::Strcmp => write!(f, "strcmp"),

            FunctionName::GetEnv => write!(f, "luaJniGetEnv"),
            FunctionName::TakeObject => write!(f, "luaJniTakeObject"),
            FunctionName::PutBackObject => write!(f, "luaJniPutBackObject"),
            FunctionName::CacheObject => write!(f, "luaJniCacheObject"),
            FunctionName::ReleaseObject => write!(f, "luaJniReleaseObject"),
            FunctionName::CatchJavaException => write!(f, "luaJniCatchJavaException"),
            FunctionName::EqualJavaArray => write!(f, "luaJniEqualJavaArray"),
            FunctionName::JavaObjectGc => write!(f, "luaJniJavaObjectGc"),
            FunctionName::Register => write!(f, "luaJniRegister"),
            FunctionName::Unregister => write!(f, "luaJniUnregister"),
            FunctionName::PushField { is_static, kind } => {
                write!(f, "luaJniPush{}{}Field", static_prefix(*is_static), kind)
            }
            FunctionName::BoxValue(boxed) => {
                let class_name = boxed.class_name();
                let simple_name = class_name.rsplit('.').next().unwrap_or(class_name);
                write!(f, "luaJniBox{}", simple_name)
            }
            FunctionName::PushBoxed => write!(f, "luaJniPushBoxed"),

            FunctionName::IndexMethod => write!(f, "_indexMethod"),
            FunctionName::NewIndexMethod => write!(f, "_newIndexMethod"),
            FunctionName::Method(alias) => write!(f, "method_{}", alias),
            FunctionName::ConstructorCall => write!(f, "constructor_call"),
            FunctionName::Inject(ident) => write!(f, "inject_{}", ident),
            FunctionName::RegisterUnit(ident) => write!(f, "register_{}", ident),
            FunctionName::UnregisterUnit(ident) => write!(f, "unregister_{}", ident),
            FunctionName::RegisterAll(umbrella) => write!(f, "{}_register_all", umbrella),
            FunctionName::UnregisterAll(umbrella) => write!(f, "{}_unregister_all", umbrella),
            FunctionName::JniOnLoad => write!(f, "JNI_OnLoad"),
            FunctionName::JniOnUnload => write!(f, "JNI_OnUnload"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Linkage {
    External,
    Internal,
    JniExport,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FunctionParam {
    pub ty: Type,
    pub name: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FunctionDecl {
    pub name: FunctionName,
    pub return_ty: Type,
    pub params: Vec<FunctionParam>,
    pub linkage: Linkage,

    pub comment: Option<String>,
}

impl FunctionDecl {
    pub fn new(name: FunctionName, return_ty: Type, linkage: Linkage) -> Self {
        Self {
            name,
            return_ty,
            params: Vec::new(),
            linkage,
            comment: None,
        }
    }

    pub fn with_param(mut self, ty: Type, name: impl Into<String>) -> Self {
        self.params.push(FunctionParam {
            ty,
            name: name.into(),
        });
        self
    }

    pub fn with_comment(self, comment: Option<String>) -> Self {
        Self { comment, ..self }
    }

    /// `static int f(lua_State* L)`, the shape of every trampoline.
    pub fn lua_cfunction(name: FunctionName) -> Self {
        Self::new(name, Type::Int, Linkage::Internal).with_param(Type::lua_state_ptr(), "L")
    }
}

impl fmt::Display for FunctionDecl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(comment) = &self.comment {
            let safe_text = comment.replace("/*", "").replace("*/", "");
            writeln!(f, "/** {} **/", safe_text)?;
        }

        let name = self.name.to_string();
        match self.linkage {
            Linkage::External => write!(f, "{}(", self.return_ty.to_decl_string(&name))?,
            Linkage::Internal => write!(f, "static {}(", self.return_ty.to_decl_string(&name))?,
            Linkage::JniExport => {
                write!(f, "JNIEXPORT {} JNICALL {}(", self.return_ty.typename(), name)?
            }
        }

        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param.ty.to_decl_string(&param.name))?;
        }
        write!(f, ")")
    }
}

#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub decl: FunctionDecl,
    pub body: Vec<Statement>,
}

impl FunctionDef {
    pub fn new(decl: FunctionDecl, body: Vec<Statement>) -> Self {
        Self { decl, body }
    }
}

impl fmt::Display for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} {{", self.decl)?;

        for stmt in &self.body {
            stmt.write_at(f, 1)?;
            writeln!(f)?;
        }

        write!(f, "}}")
    }
}
