#[cfg(test)]
mod test;

use crate::ast::Builder;
use crate::ast::Expr;
use crate::ast::FieldName;
use crate::ast::FunctionDecl;
use crate::ast::FunctionDef;
use crate::ast::FunctionName;
use crate::ast::JniFunction;
use crate::ast::JniKind;
use crate::ast::Linkage;
use crate::ast::Statement;
use crate::ast::Type;
use crate::ast::TypeName;
use crate::marshal;
use crate::overload;
use crate::overload::OverloadGroup;
use crate::release::ReleaseAction;
use bind_ir::Accessor;
use bind_ir::ClassDescriptor;
use bind_ir::EnumDescriptor;
use bind_ir::EnvironmentDescriptor;
use bind_ir::FieldDescriptor;
use bind_ir::MethodDescriptor;
use bind_ir::ParameterDescriptor;
use bind_ir::TypeDescriptor;
use linked_hash_map::LinkedHashMap;
use tracing::debug;

const KEY_VAR: &str = "keyStr";

pub fn class_info() -> Expr {
    Expr::named_var("classInfo")
}

pub fn info_field(field: FieldName) -> Expr {
    class_info().arrow(field)
}

/// The `ClassInfo` slot holding the ID used to invoke `method`.
pub fn member_id_field(method: &MethodDescriptor) -> FieldName {
    match method.accessor() {
        Some(Accessor::Getter) => FieldName::Getter(method.external_name().to_string()),
        Some(Accessor::Setter) => FieldName::Setter(method.external_name().to_string()),
        None => overload::method_id_field(method),
    }
}

pub fn field_id_field(field: &FieldDescriptor) -> FieldName {
    FieldName::FieldId(field.external_name().to_string())
}

fn take_object(id: Expr) -> Expr {
    Expr::function(FunctionName::TakeObject).call([Expr::named_var("env"), id])
}

/// Where a call finds the object (or class) it runs on.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Receiver {
    /// A `JavaObject` userdata in slot 1 with the given metatable.
    Instance(String),

    /// The cached class handle.
    Static,

    /// The cached `INSTANCE` of a singleton owner.
    Singleton,
}

impl Receiver {
    pub fn of_method(method: &MethodDescriptor, class: &ClassDescriptor) -> Self {
        if method.is_static {
            Receiver::Static
        } else {
            Receiver::Instance(class.name.clone())
        }
    }

    pub fn first_slot(&self) -> usize {
        match self {
            Receiver::Instance(..) => 2,
            Receiver::Static | Receiver::Singleton => 1,
        }
    }

    /// Leases the call target and returns the local naming it.
    pub fn acquire(&self, builder: &mut Builder) -> Expr {
        match self {
            Receiver::Instance(metatable) => {
                check_instance(builder, metatable);
                lease_instance(builder)
            }

            Receiver::Static => {
                let take = take_object(info_field(FieldName::Id)).cast(TypeName::JClass.into());
                let action = ReleaseAction::PutBack("clazz".to_string());
                builder.decl_owned(TypeName::JClass.into(), action, take);
                Expr::named_var("clazz")
            }

            Receiver::Singleton => {
                let take = take_object(info_field(FieldName::InstanceId));
                let action = ReleaseAction::PutBack("obj".to_string());
                builder.decl_owned(TypeName::JObject.into(), action, take);
                Expr::named_var("obj")
            }
        }
    }
}

/// `env` from the runtime and the `ClassInfo` bound as upvalue 1.
/// Declares `object`, the wrapper in slot 1. `luaL_checkudata` raises on
/// anything else, so nothing may be leased before it.
fn check_instance(builder: &mut Builder, metatable: &str) {
    let wrapper_ty = Type::from(TypeName::JavaObject).ptr();
    let check = Expr::lua(
        FunctionName::LuaLCheckUdata,
        [Expr::LitInt(1), Expr::lit_str(metatable)],
    );
    builder.decl(wrapper_ty.clone(), "object", Some(check.cast(wrapper_ty)));
}

fn lease_instance(builder: &mut Builder) -> Expr {
    let id = Expr::named_var("object").arrow(FieldName::Id);
    let action = ReleaseAction::PutBack("obj".to_string());
    builder.decl_owned(TypeName::JObject.into(), action, take_object(id));
    Expr::named_var("obj")
}

fn closure_prologue(builder: &mut Builder) {
    builder.decl(Type::env_ptr(), "env", Some(Expr::lua(FunctionName::GetEnv, [])));

    let upvalue = Expr::function(FunctionName::LuaUpvalueIndex).call([Expr::LitInt(1)]);
    let class_info = Expr::lua(FunctionName::LuaToUserdata, [upvalue]).cast(Type::class_info_ptr());
    builder.decl(Type::class_info_ptr(), "classInfo", Some(class_info));
}

fn call_method(target: Expr, method: &MethodDescriptor, args: Vec<Expr>) -> Expr {
    let func = JniFunction::CallMethod {
        is_static: method.is_static,
        kind: marshal::jni_kind(&method.return_ty),
    };
    let method_id = info_field(member_id_field(method));

    let args = [target, method_id].into_iter().chain(args);
    Expr::jni("env", func, args)
}

fn extract_args(builder: &mut Builder, params: &[ParameterDescriptor], first_slot: usize) -> Vec<Expr> {
    params
        .iter()
        .enumerate()
        .map(|(i, param)| marshal::extract(builder, first_slot + i, param))
        .collect()
}

/// Extracts the arguments, calls, bridges exceptions and pushes one result.
fn call_and_push(builder: &mut Builder, target: Expr, method: &MethodDescriptor, first_slot: usize) {
    let args = extract_args(builder, &method.params, first_slot);
    let call = call_method(target, method, args);

    if method.return_ty.is_void() {
        builder.expr(call);
    } else {
        builder.decl(marshal::jni_type(&method.return_ty), "result", Some(call));
    }
    builder.exception_check();

    marshal::inject_result(builder, &method.return_ty, "result");
}

/// Like `call_and_push`, but the result is dropped.
fn call_and_discard(builder: &mut Builder, target: Expr, method: &MethodDescriptor, first_slot: usize) {
    let args = extract_args(builder, &method.params, first_slot);
    let call = call_method(target, method, args);

    if marshal::jni_kind(&method.return_ty) == JniKind::Object {
        let action = ReleaseAction::DeleteLocalRef("result".to_string());
        builder.decl_owned(TypeName::JObject.into(), action, call);
    } else {
        builder.expr(call);
    }
    builder.exception_check();
}

/// One trampoline per overload group. Every matching arm leaves exactly
/// one value on the stack.
pub fn trampoline(group: &OverloadGroup, receiver: &Receiver, annotate: bool) -> FunctionDef {
    let mut builder = Builder::new(annotate);
    closure_prologue(&mut builder);

    let target = receiver.acquire(&mut builder);
    let first_slot = receiver.first_slot();

    overload::emit_chain(&mut builder, &group.name, &group.methods, first_slot, |branch, method| {
        call_and_push(branch, target.clone(), method, first_slot);
        branch.extend(branch.release_all());
        branch.push(Statement::return_value(Expr::LitInt(1)));
    });

    debug!(
        trampoline = %group.trampoline(),
        overloads = group.methods.len(),
        "generated method trampoline"
    );

    let comment = annotate.then(|| format!("dispatches `{}`", group.name));
    let decl = FunctionDecl::lua_cfunction(group.trampoline()).with_comment(comment);
    FunctionDef::new(decl, builder.finish())
}

fn key_matches(name: &str) -> Expr {
    Expr::function(FunctionName::Strcmp)
        .call([Expr::named_var(KEY_VAR), Expr::lit_str(name)])
        .eq(Expr::LitInt(0))
}

/// Prologue shared by `__index` and `__newindex`: the receiver in slot 1
/// and the key in slot 2. Both are checked before the receiver is leased.
fn member_access_prologue(builder: &mut Builder, class: &ClassDescriptor) {
    closure_prologue(builder);
    check_instance(builder, &class.name);

    let key = Expr::lua(FunctionName::LuaLCheckString, [Expr::LitInt(2)]);
    builder.decl(Type::c_string(), KEY_VAR, Some(key));

    lease_instance(builder);
}

/// Pushes through a runtime field reader, which returns 0 when the read
/// raised.
fn push_checked(builder: &mut Builder, push: Expr) {
    let mut failed = builder.release_all();
    failed.push(Statement::return_value(Expr::lua(FunctionName::LuaError, [])));

    builder.push(Statement::if_then(push.eq(Expr::LitInt(0)), failed));
}

/// The static target of a member lives in the branch that needs it.
fn member_target(builder: &mut Builder, is_static: bool) -> Expr {
    if is_static {
        Receiver::Static.acquire(builder)
    } else {
        Expr::named_var("obj")
    }
}

/// `__index`: fields, then flattened getters, then method closures.
/// Unknown keys read as nil.
pub fn index_method(class: &ClassDescriptor, groups: &[OverloadGroup], annotate: bool) -> FunctionDef {
    let mut builder = Builder::new(annotate);
    member_access_prologue(&mut builder, class);

    let mut arms = Vec::new();

    for field in &class.fields {
        let Some(kind) = marshal::push_kind(&field.ty) else {
            continue;
        };

        let mut branch = builder.branch();
        let depth = branch.release.depth();
        let target = member_target(&mut branch, field.is_static);
        let fid = info_field(field_id_field(field));
        push_checked(&mut branch, marshal::push_field(kind, field.is_static, &field.ty, target, fid));
        branch.release_from(depth);

        arms.push((key_matches(field.external_name()), branch.finish()));
    }

    for getter in class.flattened() {
        if getter.accessor() != Some(Accessor::Getter) {
            continue;
        }

        let mut branch = builder.branch();
        let depth = branch.release.depth();
        let target = member_target(&mut branch, getter.is_static);
        call_and_push(&mut branch, target, getter, 1);
        branch.release_from(depth);

        arms.push((key_matches(getter.external_name()), branch.finish()));
    }

    for group in groups {
        let upvalue = Expr::function(FunctionName::LuaUpvalueIndex).call([Expr::LitInt(1)]);
        let closure = vec![
            Statement::Expr(Expr::lua(FunctionName::LuaPushValue, [upvalue])),
            Statement::Expr(Expr::lua(
                FunctionName::LuaPushCClosure,
                [Expr::function(group.trampoline()), Expr::LitInt(1)],
            )),
        ];
        arms.push((key_matches(&group.name), closure));
    }

    let not_found = vec![Statement::Expr(Expr::lua(FunctionName::LuaPushNil, []))];
    builder.extend(Statement::if_chain(arms, not_found));

    builder.extend(builder.release_all());
    builder.push(Statement::return_value(Expr::LitInt(1)));

    let decl = FunctionDecl::lua_cfunction(FunctionName::IndexMethod);
    FunctionDef::new(decl, builder.finish())
}

/// Raises unless the assigned value in slot 3 fits `ty`.
fn check_assigned(builder: &mut Builder, name: &str, ty: &TypeDescriptor) {
    let mut mismatch = builder.branch();
    mismatch.raise(&format!("Member {} must be a {}", name, ty), []);
    let wrong_type = marshal::test_expr(ty, 3).not();
    builder.push(Statement::if_then(wrong_type, mismatch.finish()));
}

/// `__newindex`: writable fields, then flattened setters. Unknown or
/// read-only keys raise.
pub fn new_index_method(class: &ClassDescriptor, annotate: bool) -> FunctionDef {
    let mut builder = Builder::new(annotate);
    member_access_prologue(&mut builder, class);

    let mut arms = Vec::new();

    for field in class.fields.iter().filter(|field| !field.read_only) {
        let mut branch = builder.branch();
        let depth = branch.release.depth();
        let target = member_target(&mut branch, field.is_static);
        check_assigned(&mut branch, field.external_name(), &field.ty);
        let value = marshal::extract(&mut branch, 3, &ParameterDescriptor::new("value", field.ty.clone()));

        let set = JniFunction::SetField {
            is_static: field.is_static,
            kind: marshal::jni_kind(&field.ty),
        };
        let fid = info_field(field_id_field(field));
        branch.expr(Expr::jni("env", set, [target, fid, value]));
        branch.exception_check();
        branch.release_from(depth);

        arms.push((key_matches(field.external_name()), branch.finish()));
    }

    for setter in class.flattened() {
        if setter.accessor() != Some(Accessor::Setter) {
            continue;
        }

        let mut branch = builder.branch();
        let depth = branch.release.depth();
        let target = member_target(&mut branch, setter.is_static);
        for param in &setter.params {
            check_assigned(&mut branch, setter.external_name(), &param.ty);
        }
        call_and_discard(&mut branch, target, setter, 3);
        branch.release_from(depth);

        arms.push((key_matches(setter.external_name()), branch.finish()));
    }

    let mut not_found = builder.branch();
    not_found.raise("Can't find member %s", [Expr::named_var(KEY_VAR)]);
    builder.extend(Statement::if_chain(arms, not_found.finish()));

    builder.extend(builder.release_all());
    builder.push(Statement::return_value(Expr::LitInt(0)));

    let decl = FunctionDecl::lua_cfunction(FunctionName::NewIndexMethod);
    FunctionDef::new(decl, builder.finish())
}

/// The callable bound to the class's short name: picks a constructor by
/// the guard chain and yields a wrapped instance, or nil.
pub fn constructor_call(class: &ClassDescriptor, ctors: &[MethodDescriptor], annotate: bool) -> FunctionDef {
    let mut builder = Builder::new(annotate);
    closure_prologue(&mut builder);

    let clazz = Receiver::Static.acquire(&mut builder);
    builder.decl(TypeName::JObject.into(), "obj", Some(Expr::Null));

    overload::emit_chain(&mut builder, class.short_name(), ctors, 1, |branch, ctor| {
        let depth = branch.release.depth();
        let args = extract_args(branch, &ctor.params, 1);

        let ctor_id = info_field(overload::constructor_id_field(ctor));
        let new_object = Expr::jni(
            "env",
            JniFunction::NewObject,
            [clazz.clone(), ctor_id].into_iter().chain(args),
        );
        branch.expr(Expr::assign(Expr::named_var("obj"), new_object));
        branch.exception_check();
        branch.release_from(depth);
    });

    builder.push(Statement::if_then_else(
        Expr::named_var("obj").not_eq(Expr::Null),
        marshal::wrap_object("obj", &class.name),
        [Statement::Expr(Expr::lua(FunctionName::LuaPushNil, []))],
    ));

    builder.extend(builder.release_all());
    builder.push(Statement::return_value(Expr::LitInt(1)));

    debug!(class = %class.name, constructors = ctors.len(), "generated constructor trampoline");

    let decl = FunctionDecl::lua_cfunction(FunctionName::ConstructorCall);
    FunctionDef::new(decl, builder.finish())
}

/// `static int inject_<ident>(lua_State* L, JNIEnv* env, void* userData)`
fn inject_decl(ident: &str) -> FunctionDecl {
    FunctionDecl::new(FunctionName::Inject(ident.to_string()), Type::Int, Linkage::Internal)
        .with_param(Type::lua_state_ptr(), "L")
        .with_param(Type::env_ptr(), "env")
        .with_param(Type::Void.ptr(), "userData")
}

fn inject_prologue(builder: &mut Builder) {
    let class_info = Expr::named_var("userData").cast(Type::class_info_ptr());
    builder.decl(Type::class_info_ptr(), "classInfo", Some(class_info));
}

/// Pushes `func` closed over the `ClassInfo` and binds it to `global`.
fn bind_closure(builder: &mut Builder, func: FunctionName, global: &str) {
    builder.expr(Expr::lua(FunctionName::LuaPushLightUserdata, [class_info()]));
    builder.expr(Expr::lua(
        FunctionName::LuaPushCClosure,
        [Expr::function(func), Expr::LitInt(1)],
    ));
    builder.expr(Expr::lua(FunctionName::LuaSetGlobal, [Expr::lit_str(global)]));
}

fn meta_entry(key: &str, func: FunctionName) -> Expr {
    Expr::InitList(vec![Expr::lit_str(key), Expr::function(func)])
}

/// Globals bound for a list of functions, one per external name.
fn function_globals<'a>(functions: impl IntoIterator<Item = &'a MethodDescriptor>) -> Vec<String> {
    let mut names = LinkedHashMap::new();
    for func in functions {
        names.insert(func.external_name().to_string(), ());
    }
    names.into_iter().map(|(name, ())| name).collect()
}

/// Installs the metatable once per state and (re)binds the class globals
/// on every call.
pub fn inject_class(class: &ClassDescriptor, ctors: &[MethodDescriptor], annotate: bool) -> FunctionDef {
    let mut builder = Builder::new(annotate);
    inject_prologue(&mut builder);

    let meta = Expr::InitList(vec![
        meta_entry("__index", FunctionName::IndexMethod),
        meta_entry("__newindex", FunctionName::NewIndexMethod),
        meta_entry("__gc", FunctionName::JavaObjectGc),
        Expr::InitList(vec![Expr::Null, Expr::Null]),
    ]);
    let install = vec![
        Statement::VariableDecl {
            ty: Type::from(TypeName::LuaReg).unsized_array(),
            name: "meta".to_string(),
            init: Some(meta),
        },
        Statement::Expr(Expr::lua(FunctionName::LuaPushLightUserdata, [class_info()])),
        Statement::Expr(Expr::lua(
            FunctionName::LuaLSetFuncs,
            [Expr::named_var("meta"), Expr::LitInt(1)],
        )),
    ];
    let created = Expr::lua(FunctionName::LuaLNewMetatable, [Expr::lit_str(class.name.as_str())]);
    builder.push(Statement::if_then(created, install));
    builder.expr(Expr::lua(FunctionName::LuaPop, [Expr::LitInt(1)]));

    if !ctors.is_empty() {
        bind_closure(&mut builder, FunctionName::ConstructorCall, class.short_name());
    } else if class.uses_default_constructor() {
        builder.comment(format!("auto-registered instance `{}`", class.short_name()));

        let depth = builder.release.depth();
        let clazz = Receiver::Static.acquire(&mut builder);
        let new_object = Expr::jni(
            "env",
            JniFunction::NewObject,
            [clazz, info_field(FieldName::DefaultCtor)],
        );
        builder.decl(TypeName::JObject.into(), "obj", Some(new_object));
        builder.exception_check();

        let mut bind = marshal::wrap_object("obj", &class.name);
        bind.push(Statement::Expr(Expr::lua(
            FunctionName::LuaSetGlobal,
            [Expr::lit_str(class.short_name())],
        )));
        builder.push(Statement::if_then(Expr::named_var("obj").not_eq(Expr::Null), bind));
        builder.release_from(depth);
    }

    for global in function_globals(&class.functions) {
        bind_closure(&mut builder, FunctionName::Method(global.clone()), &global);
    }

    builder.push(Statement::return_value(Expr::LitInt(0)));
    FunctionDef::new(inject_decl(&class.ident()), builder.finish())
}

/// Binds every function group trampoline as a global.
pub fn inject_functions(ident: &str, functions: &[MethodDescriptor], annotate: bool) -> FunctionDef {
    let mut builder = Builder::new(annotate);
    inject_prologue(&mut builder);

    for global in function_globals(functions) {
        bind_closure(&mut builder, FunctionName::Method(global.clone()), &global);
    }

    builder.push(Statement::return_value(Expr::LitInt(0)));
    FunctionDef::new(inject_decl(ident), builder.finish())
}

/// Builds `{NAME = value, ...}` and binds it to the enum's global name.
pub fn inject_enum(enum_desc: &EnumDescriptor) -> FunctionDef {
    let mut builder = Builder::new(false);

    builder.expr(Expr::lua(
        FunctionName::LuaCreateTable,
        [Expr::LitInt(0), Expr::LitInt(enum_desc.constants.len() as i64)],
    ));
    for constant in &enum_desc.constants {
        builder.expr(Expr::lua(FunctionName::LuaPushInteger, [Expr::LitInt(constant.value)]));
        builder.expr(Expr::lua(
            FunctionName::LuaSetField,
            [Expr::LitInt(-2), Expr::lit_str(constant.name.as_str())],
        ));
    }
    builder.expr(Expr::lua(
        FunctionName::LuaSetGlobal,
        [Expr::lit_str(enum_desc.global_name())],
    ));

    builder.push(Statement::return_value(Expr::LitInt(0)));
    FunctionDef::new(inject_decl(&enum_desc.ident()), builder.finish())
}

/// Reads every static field and binds its current value as a global.
pub fn inject_environment(env: &EnvironmentDescriptor, annotate: bool) -> FunctionDef {
    let mut builder = Builder::new(annotate);
    inject_prologue(&mut builder);

    let clazz = Receiver::Static.acquire(&mut builder);
    for field in &env.fields {
        let Some(kind) = marshal::push_kind(&field.ty) else {
            continue;
        };

        let fid = info_field(field_id_field(field));
        push_checked(&mut builder, marshal::push_field(kind, true, &field.ty, clazz.clone(), fid));
        builder.expr(Expr::lua(
            FunctionName::LuaSetGlobal,
            [Expr::lit_str(field.external_name())],
        ));
    }

    builder.extend(builder.release_all());
    builder.push(Statement::return_value(Expr::LitInt(0)));
    FunctionDef::new(inject_decl(&env.ident()), builder.finish())
}
