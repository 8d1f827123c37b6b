
use crate::ast::FunctionDef;
use crate::ast::HeaderUnit;
use crate::ast::Include;
use crate::ast::SourceUnit;
use crate::dispatch;
use crate::dispatch::Receiver;
use crate::overload;
use crate::register::IdLookup;
use crate::register::Registration;
use bind_ir::BindingError;
use bind_ir::BindingResult;
use bind_ir::BindingUnit;
use bind_ir::ClassDescriptor;
use bind_ir::EnumDescriptor;
use bind_ir::EnvironmentDescriptor;
use bind_ir::FunctionGroupDescriptor;
use common::GenOptions;

/// The `.h`/`.c` pair generated for one binding unit.
#[derive(Debug, Clone)]
pub struct UnitOutput {
    pub ident: String,
    pub header: HeaderUnit,
    pub source: SourceUnit,
    pub registration: Registration,
}

impl UnitOutput {
    pub fn header_file_name(&self) -> String {
        format!("{}.h", self.ident)
    }

    pub fn source_file_name(&self) -> String {
        format!("{}.c", self.ident)
    }
}

pub fn translate_unit(unit: &BindingUnit, opts: &GenOptions) -> BindingResult<UnitOutput> {
    let (registration, functions) = match unit {
        BindingUnit::Class(class) => translate_class(class, opts.annotate)?,
        BindingUnit::Functions(group) => translate_functions(group, opts.annotate)?,
        BindingUnit::Enum(enum_desc) => translate_enum(enum_desc),
        BindingUnit::Environment(env) => translate_environment(env, opts.annotate),
    };

    let ident = unit.ident();

    let mut header = HeaderUnit::new(&ident);
    header.decls.push(registration.register_decl());
    header.decls.push(registration.unregister_decl());

    let mut source = SourceUnit::new();
    source.include(Include::Local(format!("{}.h", ident)));
    source.include(Include::System("lua.h".to_string()));
    source.include(Include::System("lauxlib.h".to_string()));
    source.include(Include::System("lualib.h".to_string()));
    source.include(Include::Local(opts.runtime_header.clone()));
    source.include(Include::System("stdlib.h".to_string()));
    source.include(Include::System("string.h".to_string()));
    source.include(Include::System("stdint.h".to_string()));

    source.structs.extend(registration.class_info());
    for func in functions {
        source.add_function(func);
    }
    source.add_function(registration.register_fn());
    source.add_function(registration.unregister_fn());

    Ok(UnitOutput {
        ident,
        header,
        source,
        registration,
    })
}

fn combine<A, B>(a: BindingResult<A>, b: BindingResult<B>) -> BindingResult<(A, B)> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (a, b) => {
            let mut errors: Vec<BindingError> = Vec::new();
            errors.extend(a.err().into_iter().flatten());
            errors.extend(b.err().into_iter().flatten());
            Err(errors)
        }
    }
}

fn translate_class(
    class: &ClassDescriptor,
    annotate: bool,
) -> BindingResult<(Registration, Vec<FunctionDef>)> {
    let (groups, ctors) = combine(
        overload::group_overloads(&class.name, class.callables()),
        overload::number_constructors(&class.name, &class.constructors),
    )?;

    let mut registration = Registration::new(class.name.as_str(), class.ident());
    for field in &class.fields {
        registration.lookup(IdLookup::field(field));
    }
    for method in groups.iter().flat_map(|group| group.methods.iter()) {
        registration.lookup(IdLookup::method(method));
    }
    for accessor in class.flattened() {
        registration.lookup(IdLookup::method(accessor));
    }
    for ctor in &ctors {
        registration.lookup(IdLookup::constructor(ctor));
    }
    if class.uses_default_constructor() {
        registration.lookup(IdLookup::default_constructor());
    }

    let mut functions = Vec::new();
    functions.push(dispatch::index_method(class, &groups, annotate));
    functions.push(dispatch::new_index_method(class, annotate));

    for group in &groups {
        let receiver = if group.is_static {
            Receiver::Static
        } else {
            Receiver::Instance(class.name.clone())
        };
        functions.push(dispatch::trampoline(group, &receiver, annotate));
    }

    if !ctors.is_empty() {
        functions.push(dispatch::constructor_call(class, &ctors, annotate));
    }

    functions.push(dispatch::inject_class(class, &ctors, annotate));

    Ok((registration, functions))
}

fn translate_functions(
    group_desc: &FunctionGroupDescriptor,
    annotate: bool,
) -> BindingResult<(Registration, Vec<FunctionDef>)> {
    let groups = overload::group_overloads(&group_desc.name, &group_desc.functions)?;

    let mut registration = Registration::new(group_desc.name.as_str(), group_desc.ident());
    registration.singleton = group_desc.singleton;

    for method in groups.iter().flat_map(|group| group.methods.iter()) {
        registration.lookup(IdLookup::method(method));
    }

    let receiver = if group_desc.singleton {
        Receiver::Singleton
    } else {
        Receiver::Static
    };

    let mut functions: Vec<_> = groups
        .iter()
        .map(|group| dispatch::trampoline(group, &receiver, annotate))
        .collect();
    functions.push(dispatch::inject_functions(
        &group_desc.ident(),
        &group_desc.functions,
        annotate,
    ));

    Ok((registration, functions))
}

fn translate_enum(enum_desc: &EnumDescriptor) -> (Registration, Vec<FunctionDef>) {
    let registration = Registration::blockless(enum_desc.name.as_str(), enum_desc.ident());
    (registration, vec![dispatch::inject_enum(enum_desc)])
}

fn translate_environment(env: &EnvironmentDescriptor, annotate: bool) -> (Registration, Vec<FunctionDef>) {
    let mut registration = Registration::new(env.name.as_str(), env.ident());
    for field in &env.fields {
        registration.lookup(IdLookup::field(field));
    }

    (registration, vec![dispatch::inject_environment(env, annotate)])
}
