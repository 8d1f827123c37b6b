
use crate::ast::Builder;
use crate::ast::Expr;
use crate::ast::FieldName;
use crate::ast::FunctionName;
use crate::ast::JniFunction;
use crate::ast::JniKind;
use crate::ast::PushKind;
use crate::ast::Statement;
use crate::ast::Type;
use crate::ast::TypeName;
use crate::release::ReleaseAction;
use bind_ir::jni_path_of;
use bind_ir::BoxedKind;
use bind_ir::IntWidth;
use bind_ir::ObjectKind;
use bind_ir::ParameterDescriptor;
use bind_ir::TypeDescriptor;
use bind_ir::TypeKind;
use std::fmt;

/// Metatable shared by every array wrapper.
pub const ARRAY_METATABLE: &str = "JavaArray";

/// `enum ARRAY_ELEMENT_TYPE` in the runtime header.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ElementTag {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Object,
}

impl ElementTag {
    pub fn of(element: &TypeKind) -> Self {
        match element {
            TypeKind::Boolean => ElementTag::Boolean,
            TypeKind::Integer(IntWidth::W8) => ElementTag::Byte,
            TypeKind::Integer(IntWidth::W16) => ElementTag::Short,
            TypeKind::Integer(IntWidth::W32) => ElementTag::Int,
            TypeKind::Integer(IntWidth::W64) => ElementTag::Long,
            TypeKind::Char => ElementTag::Char,
            TypeKind::Float32 => ElementTag::Float,
            TypeKind::Float64 => ElementTag::Double,
            TypeKind::String => ElementTag::String,

            // void[] never survives parsing
            TypeKind::Object(..) | TypeKind::Void => ElementTag::Object,
        }
    }
}

impl fmt::Display for ElementTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ElementTag::Boolean => "ELEMENT_BOOLEAN",
            ElementTag::Byte => "ELEMENT_BYTE",
            ElementTag::Char => "ELEMENT_CHAR",
            ElementTag::Short => "ELEMENT_SHORT",
            ElementTag::Int => "ELEMENT_INT",
            ElementTag::Long => "ELEMENT_LONG",
            ElementTag::Float => "ELEMENT_FLOAT",
            ElementTag::Double => "ELEMENT_DOUBLE",
            ElementTag::String => "ELEMENT_STRING",
            ElementTag::Object => "ELEMENT_OBJECT",
        };
        write!(f, "{}", name)
    }
}

/// What a script value has to look like to be accepted for one argument
/// slot. Two parameters with equal shapes can't be told apart at runtime.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ArgShape {
    Boolean,
    Integer,
    Number,
    String,
    NilOrBoolean,
    NilOrInteger,
    NilOrNumber,
    Object(String),
    Array {
        element: String,
        dims: usize,
        tag: ElementTag,
    },

    /// Only nil is accepted.
    Nil,
}

impl ArgShape {
    pub fn of(ty: &TypeDescriptor) -> Self {
        if ty.is_array() {
            return ArgShape::Array {
                element: ty.kind.java_name().to_string(),
                dims: ty.dims,
                tag: ElementTag::of(&ty.kind),
            };
        }

        match &ty.kind {
            TypeKind::Boolean => ArgShape::Boolean,
            TypeKind::Integer(..) | TypeKind::Char => ArgShape::Integer,
            TypeKind::Float32 | TypeKind::Float64 => ArgShape::Number,
            TypeKind::String => ArgShape::String,
            TypeKind::Object(ObjectKind::Boxed(boxed)) => match boxed {
                BoxedKind::Boolean => ArgShape::NilOrBoolean,
                BoxedKind::Float | BoxedKind::Double => ArgShape::NilOrNumber,
                BoxedKind::Byte
                | BoxedKind::Character
                | BoxedKind::Short
                | BoxedKind::Integer
                | BoxedKind::Long => ArgShape::NilOrInteger,
            },
            TypeKind::Object(ObjectKind::Class(name)) => ArgShape::Object(name.clone()),
            TypeKind::Void => ArgShape::Nil,
        }
    }

    pub fn test_expr(&self, slot: usize) -> Expr {
        let slot_expr = || Expr::LitInt(slot as i64);
        let is_nil = || Expr::lua(FunctionName::LuaIsNil, [slot_expr()]);
        let check = |func: FunctionName| Expr::lua(func, [slot_expr()]);

        match self {
            ArgShape::Boolean => check(FunctionName::LuaIsBoolean),
            ArgShape::Integer => check(FunctionName::LuaIsInteger),
            ArgShape::Number => check(FunctionName::LuaIsNumber),

            ArgShape::String => {
                let is_string = check(FunctionName::LuaType).eq(Expr::named_var("LUA_TSTRING"));
                is_nil().or(is_string)
            }

            ArgShape::NilOrBoolean => is_nil().or(check(FunctionName::LuaIsBoolean)),
            ArgShape::NilOrInteger => is_nil().or(check(FunctionName::LuaIsInteger)),
            ArgShape::NilOrNumber => is_nil().or(check(FunctionName::LuaIsNumber)),

            ArgShape::Object(class_name) => {
                let udata = Expr::lua(
                    FunctionName::LuaLTestUdata,
                    [slot_expr(), Expr::lit_str(class_name.as_str())],
                );
                is_nil().or(udata.not_eq(Expr::Null))
            }

            ArgShape::Array { element, dims, tag } => {
                let udata = Expr::lua(
                    FunctionName::LuaLTestUdata,
                    [slot_expr(), Expr::lit_str(ARRAY_METATABLE)],
                )
                .cast(Type::from(TypeName::JavaArray).ptr());

                let same_array = Expr::function(FunctionName::EqualJavaArray).call([
                    udata,
                    Expr::lit_str(element.as_str()),
                    Expr::LitInt(*dims as i64),
                    Expr::named_var(tag.to_string()),
                ]);
                is_nil().or(same_array)
            }

            ArgShape::Nil => is_nil(),
        }
    }
}

pub fn test_expr(ty: &TypeDescriptor, slot: usize) -> Expr {
    ArgShape::of(ty).test_expr(slot)
}

/// Native type of a value of this type held in a C local.
pub fn jni_type(ty: &TypeDescriptor) -> Type {
    if ty.is_array() {
        return TypeName::JObject.into();
    }

    match &ty.kind {
        TypeKind::Void => Type::Void,
        TypeKind::Boolean => TypeName::JBoolean.into(),
        TypeKind::Integer(IntWidth::W8) => TypeName::JByte.into(),
        TypeKind::Integer(IntWidth::W16) => TypeName::JShort.into(),
        TypeKind::Integer(IntWidth::W32) => TypeName::JInt.into(),
        TypeKind::Integer(IntWidth::W64) => TypeName::JLong.into(),
        TypeKind::Char => TypeName::JChar.into(),
        TypeKind::Float32 => TypeName::JFloat.into(),
        TypeKind::Float64 => TypeName::JDouble.into(),
        TypeKind::String => TypeName::JString.into(),
        TypeKind::Object(..) => TypeName::JObject.into(),
    }
}

/// Selects the `Call<Kind>Method` and `Get/Set<Kind>Field` families.
pub fn jni_kind(ty: &TypeDescriptor) -> JniKind {
    if ty.is_array() {
        return JniKind::Object;
    }

    match &ty.kind {
        TypeKind::Void => JniKind::Void,
        TypeKind::Boolean => JniKind::Boolean,
        TypeKind::Integer(IntWidth::W8) => JniKind::Byte,
        TypeKind::Integer(IntWidth::W16) => JniKind::Short,
        TypeKind::Integer(IntWidth::W32) => JniKind::Int,
        TypeKind::Integer(IntWidth::W64) => JniKind::Long,
        TypeKind::Char => JniKind::Char,
        TypeKind::Float32 => JniKind::Float,
        TypeKind::Float64 => JniKind::Double,
        TypeKind::String | TypeKind::Object(..) => JniKind::Object,
    }
}

/// Runtime helper used to read a field straight onto the stack. Void fields
/// have none.
pub fn push_kind(ty: &TypeDescriptor) -> Option<PushKind> {
    if ty.is_array() {
        return Some(PushKind::Array);
    }

    let kind = match &ty.kind {
        TypeKind::Void => return None,
        TypeKind::Boolean => PushKind::Boolean,
        TypeKind::Integer(IntWidth::W8) => PushKind::Byte,
        TypeKind::Integer(IntWidth::W16) => PushKind::Short,
        TypeKind::Integer(IntWidth::W32) => PushKind::Int,
        TypeKind::Integer(IntWidth::W64) => PushKind::Long,
        TypeKind::Char => PushKind::Char,
        TypeKind::Float32 => PushKind::Float,
        TypeKind::Float64 => PushKind::Double,
        TypeKind::String => PushKind::String,
        TypeKind::Object(ObjectKind::Boxed(..)) => PushKind::Boxed,
        TypeKind::Object(ObjectKind::Class(..)) => PushKind::Object,
    };
    Some(kind)
}

/// Binary-interface descriptor, e.g. `I`, `Ljava/lang/String;` or `[[J`.
pub fn native_descriptor(ty: &TypeDescriptor) -> String {
    let mut desc = "[".repeat(ty.dims);

    match &ty.kind {
        TypeKind::Void => desc.push('V'),
        TypeKind::Boolean => desc.push('Z'),
        TypeKind::Integer(IntWidth::W8) => desc.push('B'),
        TypeKind::Integer(IntWidth::W16) => desc.push('S'),
        TypeKind::Integer(IntWidth::W32) => desc.push('I'),
        TypeKind::Integer(IntWidth::W64) => desc.push('J'),
        TypeKind::Char => desc.push('C'),
        TypeKind::Float32 => desc.push('F'),
        TypeKind::Float64 => desc.push('D'),
        TypeKind::String | TypeKind::Object(..) => {
            desc.push('L');
            desc.push_str(&jni_path_of(ty.kind.java_name()));
            desc.push(';');
        }
    }

    desc
}

pub fn method_signature(params: &[ParameterDescriptor], return_ty: &TypeDescriptor) -> String {
    let mut sig = String::from("(");
    for param in params {
        sig.push_str(&native_descriptor(&param.ty));
    }
    sig.push(')');
    sig.push_str(&native_descriptor(return_ty));
    sig
}

pub fn param_var(name: &str) -> String {
    format!("p_{}", name)
}

fn wrapper_var(name: &str) -> String {
    format!("jniObj_{}", name)
}

fn slot_value(func: FunctionName, slot: usize) -> Expr {
    Expr::lua(func, [Expr::LitInt(slot as i64)])
}

fn boxed_primitive(boxed: BoxedKind, slot: usize) -> Expr {
    match boxed {
        BoxedKind::Boolean => slot_value(FunctionName::LuaToBoolean, slot).cast(TypeName::JBoolean.into()),
        BoxedKind::Byte => slot_value(FunctionName::LuaToInteger, slot).cast(TypeName::JByte.into()),
        BoxedKind::Character => slot_value(FunctionName::LuaToInteger, slot).cast(TypeName::JChar.into()),
        BoxedKind::Short => slot_value(FunctionName::LuaToInteger, slot).cast(TypeName::JShort.into()),
        BoxedKind::Integer => slot_value(FunctionName::LuaToInteger, slot).cast(TypeName::JInt.into()),
        BoxedKind::Long => slot_value(FunctionName::LuaToInteger, slot).cast(TypeName::JLong.into()),
        BoxedKind::Float => slot_value(FunctionName::LuaToNumber, slot).cast(TypeName::JFloat.into()),
        BoxedKind::Double => slot_value(FunctionName::LuaToNumber, slot).cast(TypeName::JDouble.into()),
    }
}

/// Declares `p_<name>` holding the native value of the argument at `slot`
/// and returns the expression to pass to the call. Every allocation lands
/// on the builder's release list right after its declaration.
pub fn extract(builder: &mut Builder, slot: usize, param: &ParameterDescriptor) -> Expr {
    let var = param_var(&param.name);
    let ty = &param.ty;

    if ty.is_array() {
        extract_wrapped(builder, slot, param, TypeName::JavaArray, ARRAY_METATABLE);
        return Expr::named_var(var);
    }

    match &ty.kind {
        TypeKind::Boolean => {
            let val = slot_value(FunctionName::LuaToBoolean, slot).cast(jni_type(ty));
            builder.decl(jni_type(ty), var.as_str(), Some(val));
        }
        TypeKind::Integer(..) | TypeKind::Char => {
            let val = slot_value(FunctionName::LuaToInteger, slot).cast(jni_type(ty));
            builder.decl(jni_type(ty), var.as_str(), Some(val));
        }
        TypeKind::Float32 | TypeKind::Float64 => {
            let val = slot_value(FunctionName::LuaToNumber, slot).cast(jni_type(ty));
            builder.decl(jni_type(ty), var.as_str(), Some(val));
        }

        TypeKind::String => {
            builder.decl_owned(jni_type(ty), ReleaseAction::DeleteLocalRef(var.clone()), Expr::Null);

            let mut then_branch = builder.branch();
            let chars = slot_value(FunctionName::LuaToString, slot);
            let new_string = Expr::jni("env", JniFunction::NewStringUtf, [chars]);
            then_branch.expr(Expr::assign(Expr::named_var(var.as_str()), new_string));
            then_branch.exception_check();

            let is_string = slot_value(FunctionName::LuaType, slot).eq(Expr::named_var("LUA_TSTRING"));
            builder.push(Statement::if_then(is_string, then_branch.finish()));
        }

        TypeKind::Object(ObjectKind::Boxed(boxed)) => {
            builder.decl_owned(jni_type(ty), ReleaseAction::DeleteLocalRef(var.clone()), Expr::Null);

            let mut then_branch = builder.branch();
            let box_value = Expr::function(FunctionName::BoxValue(*boxed))
                .call([Expr::named_var("env"), boxed_primitive(*boxed, slot)]);
            then_branch.expr(Expr::assign(Expr::named_var(var.as_str()), box_value));
            then_branch.exception_check();

            let not_nil = slot_value(FunctionName::LuaIsNil, slot).not();
            builder.push(Statement::if_then(not_nil, then_branch.finish()));
        }

        TypeKind::Object(ObjectKind::Class(class_name)) => {
            extract_wrapped(builder, slot, param, TypeName::JavaObject, class_name);
        }

        // nothing to pass, validation rejects these
        TypeKind::Void => {
            builder.decl(TypeName::JObject.into(), var.as_str(), Some(Expr::Null));
        }
    }

    Expr::named_var(var)
}

/// Leases the handle behind a `JavaObject`/`JavaArray` userdata.
fn extract_wrapped(
    builder: &mut Builder,
    slot: usize,
    param: &ParameterDescriptor,
    wrapper_ty: TypeName,
    metatable: &str,
) {
    let var = param_var(&param.name);
    let wrapper = wrapper_var(&param.name);
    let wrapper_ptr = Type::from(wrapper_ty).ptr();

    builder.decl(wrapper_ptr.clone(), wrapper.as_str(), Some(Expr::Null));
    builder.decl_owned(TypeName::JObject.into(), ReleaseAction::PutBack(var.clone()), Expr::Null);

    let mut then_branch = builder.branch();
    let udata = Expr::lua(
        FunctionName::LuaLTestUdata,
        [Expr::LitInt(slot as i64), Expr::lit_str(metatable)],
    );
    then_branch.expr(Expr::assign(Expr::named_var(wrapper.as_str()), udata.cast(wrapper_ptr)));

    let mut mismatch = then_branch.branch();
    mismatch.raise(&format!("Parameter {} must be a {}", slot, param.ty), []);
    let is_missing = Expr::named_var(wrapper.as_str()).eq(Expr::Null);
    then_branch.push(Statement::if_then(is_missing, mismatch.finish()));

    let id = Expr::named_var(wrapper.as_str()).arrow(FieldName::Id);
    let take = Expr::function(FunctionName::TakeObject).call([Expr::named_var("env"), id]);
    then_branch.expr(Expr::assign(Expr::named_var(var.as_str()), take));

    let not_nil = slot_value(FunctionName::LuaIsNil, slot).not();
    builder.push(Statement::if_then(not_nil, then_branch.finish()));
}

/// Pushes exactly one value for a native result held in `result`.
/// Object results are handed to a new userdata whose finaliser owns them.
pub fn inject_result(builder: &mut Builder, ty: &TypeDescriptor, result: &str) {
    let value = || Expr::named_var(result);

    if ty.is_array() {
        let wrapped = wrap_array(ty, result);
        builder.push(wrap_or_nil(result, wrapped));
        return;
    }

    match &ty.kind {
        TypeKind::Void => builder.expr(Expr::lua(FunctionName::LuaPushNil, [])),
        TypeKind::Boolean => builder.expr(Expr::lua(FunctionName::LuaPushBoolean, [value()])),
        TypeKind::Integer(..) | TypeKind::Char => {
            builder.expr(Expr::lua(FunctionName::LuaPushInteger, [value()]))
        }
        TypeKind::Float32 | TypeKind::Float64 => {
            builder.expr(Expr::lua(FunctionName::LuaPushNumber, [value()]))
        }

        TypeKind::String => {
            let chars = format!("{}_chars", result);
            let get_chars = Expr::jni("env", JniFunction::GetStringUtfChars, [value(), Expr::Null]);
            let push = Expr::lua(FunctionName::LuaPushString, [Expr::named_var(chars.as_str())]);
            let release_chars = Expr::jni(
                "env",
                JniFunction::ReleaseStringUtfChars,
                [value(), Expr::named_var(chars.as_str())],
            );

            let stmts = vec![
                Statement::VariableDecl {
                    ty: Type::c_string(),
                    name: chars,
                    init: Some(get_chars),
                },
                Statement::Expr(push),
                Statement::Expr(release_chars),
                delete_local_ref(result),
            ];
            builder.push(wrap_or_nil(result, stmts));
        }

        TypeKind::Object(ObjectKind::Boxed(..)) => {
            let push = Expr::function(FunctionName::PushBoxed)
                .call([Expr::named_var("L"), Expr::named_var("env"), value()]);
            builder.push(wrap_or_nil(result, vec![Statement::Expr(push), delete_local_ref(result)]));
        }

        TypeKind::Object(ObjectKind::Class(class_name)) => {
            let wrapped = wrap_object(result, class_name);
            builder.push(wrap_or_nil(result, wrapped));
        }
    }
}

fn delete_local_ref(var: &str) -> Statement {
    Statement::Expr(Expr::jni("env", JniFunction::DeleteLocalRef, [Expr::named_var(var)]))
}

fn wrap_or_nil(result: &str, wrap: Vec<Statement>) -> Statement {
    Statement::if_then_else(
        Expr::named_var(result).not_eq(Expr::Null),
        wrap,
        [Statement::Expr(Expr::lua(FunctionName::LuaPushNil, []))],
    )
}

fn new_wrapper(wrapper_ty: TypeName, result: &str) -> Vec<Statement> {
    let ptr_ty = Type::from(wrapper_ty).ptr();
    let alloc = Expr::lua(FunctionName::LuaNewUserdata, [Expr::SizeOf(wrapper_ty.into())]);
    let cache = Expr::function(FunctionName::CacheObject).call([Expr::named_var("env"), Expr::named_var(result)]);

    vec![
        Statement::VariableDecl {
            ty: ptr_ty.clone(),
            name: "wrapper".to_string(),
            init: Some(alloc.cast(ptr_ty)),
        },
        Statement::Expr(Expr::assign(Expr::named_var("wrapper").arrow(FieldName::Id), cache)),
        delete_local_ref(result),
    ]
}

/// Statements that push a `JavaObject` userdata for the non-NULL local
/// ref `result`, consuming the local ref.
pub fn wrap_object(result: &str, class_name: &str) -> Vec<Statement> {
    let mut stmts = new_wrapper(TypeName::JavaObject, result);
    stmts.push(Statement::Expr(Expr::lua(
        FunctionName::LuaLSetMetatable,
        [Expr::lit_str(class_name)],
    )));
    stmts
}

fn wrap_array(ty: &TypeDescriptor, result: &str) -> Vec<Statement> {
    let wrapper = || Expr::named_var("wrapper");

    let mut stmts = new_wrapper(TypeName::JavaArray, result);
    stmts.extend([
        Statement::Expr(Expr::assign(
            wrapper().arrow(FieldName::Level),
            Expr::LitInt(ty.dims as i64),
        )),
        Statement::Expr(Expr::assign(
            wrapper().arrow(FieldName::Name),
            Expr::lit_str(ty.kind.java_name()),
        )),
        Statement::Expr(Expr::assign(
            wrapper().arrow(FieldName::ElementType),
            Expr::named_var(ElementTag::of(&ty.kind).to_string()),
        )),
        Statement::Expr(Expr::lua(
            FunctionName::LuaLSetMetatable,
            [Expr::lit_str(ARRAY_METATABLE)],
        )),
    ]);
    stmts
}

/// Reads a field onto the stack through the runtime's push helpers, which
/// return 0 when the read raised.
pub fn push_field(kind: PushKind, is_static: bool, ty: &TypeDescriptor, target: Expr, field_id: Expr) -> Expr {
    let mut args = vec![Expr::named_var("L"), Expr::named_var("env"), target, field_id];

    match kind {
        PushKind::Object => args.push(Expr::lit_str(ty.kind.java_name())),
        PushKind::Array => {
            args.push(Expr::lit_str(ty.kind.java_name()));
            args.push(Expr::LitInt(ty.dims as i64));
            args.push(Expr::named_var(ElementTag::of(&ty.kind).to_string()));
        }
        _ => {}
    }

    Expr::function(FunctionName::PushField { is_static, kind }).call(args)
}
