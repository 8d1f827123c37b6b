
use crate::ast::Builder;
use crate::ast::Expr;
use crate::ast::FieldName;
use crate::ast::FunctionName;
use crate::ast::Statement;
use crate::marshal::ArgShape;
use bind_ir::BindingError;
use bind_ir::BindingErrorKind;
use bind_ir::BindingResult;
use bind_ir::MethodDescriptor;
use linked_hash_map::LinkedHashMap;

/// Callables sharing one external name, dispatched by one trampoline.
#[derive(Debug, Clone)]
pub struct OverloadGroup {
    pub name: String,
    pub is_static: bool,

    /// Declaration order, each with its overload order assigned.
    pub methods: Vec<MethodDescriptor>,
}

impl OverloadGroup {
    pub fn trampoline(&self) -> FunctionName {
        FunctionName::Method(self.name.clone())
    }
}

/// The `ClassInfo` slot caching a method's ID.
pub fn method_id_field(method: &MethodDescriptor) -> FieldName {
    FieldName::MethodId {
        alias: method.external_name().to_string(),
        order: method.overload_order,
    }
}

pub fn constructor_id_field(ctor: &MethodDescriptor) -> FieldName {
    FieldName::Ctor(ctor.overload_order)
}

fn number(methods: &mut [MethodDescriptor]) {
    for (i, method) in methods.iter_mut().enumerate() {
        method.overload_order = if i == 0 { None } else { Some(i) };
    }
}

fn shapes(method: &MethodDescriptor) -> Vec<ArgShape> {
    method.params.iter().map(|param| ArgShape::of(&param.ty)).collect()
}

/// Two overloads the guard chain can never tell apart.
fn check_ambiguity(owner: &str, name: &str, methods: &[MethodDescriptor], errors: &mut Vec<BindingError>) {
    for (i, first) in methods.iter().enumerate() {
        let first_shapes = shapes(first);

        for second in &methods[i + 1..] {
            if first_shapes == shapes(second) {
                let kind = BindingErrorKind::AmbiguousOverload {
                    name: name.to_string(),
                    arity: first.params.len(),
                    first: first.to_string(),
                    second: second.to_string(),
                };
                errors.push(BindingError::new(owner, kind).with_member(second.name.as_str()));
            }
        }
    }
}

/// Groups callables by external name in first-seen order and numbers the
/// members of each group.
pub fn group_overloads<'m>(
    owner: &str,
    methods: impl IntoIterator<Item = &'m MethodDescriptor>,
) -> BindingResult<Vec<OverloadGroup>> {
    let mut by_name: LinkedHashMap<String, Vec<MethodDescriptor>> = LinkedHashMap::new();
    for method in methods {
        by_name
            .entry(method.external_name().to_string())
            .or_insert_with(Vec::new)
            .push(method.clone());
    }

    let mut errors = Vec::new();
    let mut groups = Vec::with_capacity(by_name.len());

    for (name, mut methods) in by_name {
        number(&mut methods);
        check_ambiguity(owner, &name, &methods, &mut errors);

        let is_static = methods.first().map(|m| m.is_static).unwrap_or(false);
        groups.push(OverloadGroup {
            name,
            is_static,
            methods,
        });
    }

    if errors.is_empty() {
        Ok(groups)
    } else {
        Err(errors)
    }
}

/// Constructors form a single group named after the class.
pub fn number_constructors(owner: &str, ctors: &[MethodDescriptor]) -> BindingResult<Vec<MethodDescriptor>> {
    let mut ctors = ctors.to_vec();
    number(&mut ctors);

    let mut errors = Vec::new();
    check_ambiguity(owner, owner, &ctors, &mut errors);

    if errors.is_empty() {
        Ok(ctors)
    } else {
        Err(errors)
    }
}

/// `lua_gettop(L) == N && test_1 && ... && test_k`, with the first
/// argument at `first_slot`.
pub fn guard(method: &MethodDescriptor, first_slot: usize) -> Expr {
    let top = first_slot - 1 + method.params.len();
    let arity = Expr::lua(FunctionName::LuaGetTop, []).eq(Expr::LitInt(top as i64));

    let tests = method
        .params
        .iter()
        .enumerate()
        .map(|(i, param)| ArgShape::of(&param.ty).test_expr(first_slot + i));

    Expr::all(std::iter::once(arity).chain(tests))
}

/// Emits the guard chain in declaration order. Each arm fills its own
/// branch of the builder; arms that don't return continue after the chain.
/// Nothing matching raises `<name>: no matching overload`.
pub fn emit_chain(
    builder: &mut Builder,
    name: &str,
    methods: &[MethodDescriptor],
    first_slot: usize,
    mut arm: impl FnMut(&mut Builder, &MethodDescriptor),
) {
    let arms: Vec<_> = methods
        .iter()
        .map(|method| {
            let mut branch = builder.branch();
            branch.comment(method.to_string());
            arm(&mut branch, method);
            (guard(method, first_slot), branch.finish())
        })
        .collect();

    let mut otherwise = builder.branch();
    otherwise.raise(&format!("{}: no matching overload", name), []);

    builder.extend(Statement::if_chain(arms, otherwise.finish()));
}
