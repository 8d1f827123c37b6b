
use crate::ast::Expr;
use crate::ast::FunctionDecl;
use crate::ast::FunctionDef;
use crate::ast::FunctionName;
use crate::ast::HeaderUnit;
use crate::ast::Include;
use crate::ast::JniFunction;
use crate::ast::Linkage;
use crate::ast::SourceUnit;
use crate::ast::Statement;
use crate::ast::Type;
use crate::ast::TypeName;
use crate::register::Registration;

const JNI_VERSION: &str = "JNI_VERSION_1_6";

fn env_fn(name: FunctionName) -> FunctionDecl {
    FunctionDecl::new(name, Type::Int, Linkage::External).with_param(Type::env_ptr(), "env")
}

pub fn register_all_decl(umbrella: &str) -> FunctionDecl {
    env_fn(FunctionName::RegisterAll(umbrella.to_string()))
}

pub fn unregister_all_decl(umbrella: &str) -> FunctionDecl {
    env_fn(FunctionName::UnregisterAll(umbrella.to_string()))
}

fn call_with_env(name: FunctionName) -> Expr {
    Expr::function(name).call([Expr::named_var("env")])
}

pub fn header(umbrella: &str) -> HeaderUnit {
    let mut header = HeaderUnit::new(umbrella);
    header.decls.push(register_all_decl(umbrella));
    header.decls.push(unregister_all_decl(umbrella));
    header
}

/// Registers every unit in order and stops at the first that fails.
/// Units registered before the failure stay registered.
pub fn source(umbrella: &str, units: &[Registration]) -> SourceUnit {
    let mut source = SourceUnit::new();
    source.include(Include::Local(format!("{}.h", umbrella)));
    for unit in units {
        source.include(Include::Local(format!("{}.h", unit.ident)));
    }

    let mut register_body: Vec<_> = units
        .iter()
        .map(|unit| {
            let failed = call_with_env(unit.register_name()).not();
            Statement::if_then(failed, [Statement::return_value(Expr::LitInt(0))])
        })
        .collect();
    register_body.push(Statement::return_value(Expr::LitInt(1)));

    let mut unregister_body: Vec<_> = units
        .iter()
        .map(|unit| Statement::Expr(call_with_env(unit.unregister_name())))
        .collect();
    unregister_body.push(Statement::return_value(Expr::LitInt(1)));

    source.add_function(FunctionDef::new(register_all_decl(umbrella), register_body));
    source.add_function(FunctionDef::new(unregister_all_decl(umbrella), unregister_body));
    source
}

/// `(*vm)->GetEnv(vm, (void**)&env, JNI_VERSION_1_6)` into a fresh local,
/// running `on_failure` when the VM has no env for this thread.
fn env_from_vm(on_failure: Statement) -> Vec<Statement> {
    let get_env = Expr::jni(
        "vm",
        JniFunction::GetEnv,
        [
            Expr::named_var("env").addr_of().cast(Type::Void.ptr().ptr()),
            Expr::named_var(JNI_VERSION),
        ],
    );

    vec![
        Statement::VariableDecl {
            ty: Type::env_ptr(),
            name: "env".to_string(),
            init: Some(Expr::Null),
        },
        Statement::if_then(
            get_env.not_eq(Expr::named_var("JNI_OK")),
            [on_failure],
        ),
    ]
}

fn hook_decl(name: FunctionName) -> FunctionDecl {
    let return_ty = match name {
        FunctionName::JniOnUnload => Type::Void,
        _ => TypeName::JInt.into(),
    };

    FunctionDecl::new(name, return_ty, Linkage::JniExport)
        .with_param(Type::from(TypeName::JavaVm).ptr(), "vm")
        .with_param(Type::Void.ptr(), "reserved")
}

/// `JNI_OnLoad`/`JNI_OnUnload` running the umbrella pair when the library
/// is loaded into or dropped from the VM.
pub fn load_hook(umbrella: &str) -> SourceUnit {
    let mut source = SourceUnit::new();
    source.include(Include::System("jni.h".to_string()));
    source.include(Include::Local(format!("{}.h", umbrella)));

    let mut on_load = env_from_vm(Statement::return_value(Expr::named_var("JNI_ERR")));
    on_load.push(Statement::if_then(
        call_with_env(FunctionName::RegisterAll(umbrella.to_string())).not(),
        [Statement::return_value(Expr::named_var("JNI_ERR"))],
    ));
    on_load.push(Statement::return_value(Expr::named_var(JNI_VERSION)));

    let mut on_unload = env_from_vm(Statement::Return(None));
    on_unload.push(Statement::Expr(call_with_env(FunctionName::UnregisterAll(
        umbrella.to_string(),
    ))));

    source.add_function(FunctionDef::new(hook_decl(FunctionName::JniOnLoad), on_load));
    source.add_function(FunctionDef::new(hook_decl(FunctionName::JniOnUnload), on_unload));
    source
}
