#[cfg(test)]
mod test;

use crate::error::*;
use crate::member::*;
use crate::ty::is_class_name;
use crate::unit::*;
use crate::ORDER_SEPARATOR;
use linked_hash_map::LinkedHashMap;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn ident_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
    })
}

fn member_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("member name pattern is valid")
    })
}

/// Valid as both a C identifier and a Lua name.
pub fn is_script_ident(name: &str) -> bool {
    ident_pattern().is_match(name)
}

/// Checks every unit of the module and returns all problems found, in unit
/// declaration order.
pub fn validate(module: &BindingModule) -> BindingResult<()> {
    let mut errors = Vec::new();
    let mut seen_idents = HashSet::new();

    for unit in &module.units {
        if !seen_idents.insert(unit.ident()) {
            errors.push(BindingError::new(unit.name(), BindingErrorKind::DuplicateUnit));
        }

        errors.extend(validate_unit(unit));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_unit(unit: &BindingUnit) -> Vec<BindingError> {
    let mut validator = Validator {
        owner: unit.name(),
        errors: Vec::new(),
    };

    if !is_class_name(unit.name()) {
        validator.error(BindingErrorKind::InvalidClassName);
        return validator.errors;
    }

    match unit {
        BindingUnit::Class(class) => validator.class(class),
        BindingUnit::Functions(group) => validator.function_group(group),
        BindingUnit::Enum(enum_desc) => validator.enumeration(enum_desc),
        BindingUnit::Environment(env) => validator.environment(env),
    }

    validator.errors
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Binding {
    Field,
    Accessors { getter: bool, setter: bool },
    Callable,
}

impl Binding {
    fn describe(self) -> &'static str {
        match self {
            Binding::Field => "field",
            Binding::Accessors { .. } => "flattened accessor",
            Binding::Callable => "method",
        }
    }
}

struct Validator<'a> {
    owner: &'a str,
    errors: Vec<BindingError>,
}

impl<'a> Validator<'a> {
    fn error(&mut self, kind: BindingErrorKind) {
        self.errors.push(BindingError::new(self.owner, kind));
    }

    fn member_error(&mut self, member: &str, kind: BindingErrorKind) {
        self.errors
            .push(BindingError::new(self.owner, kind).with_member(member));
    }

    fn script_name(&mut self, member: &str, role: &'static str, name: &str) {
        if !is_script_ident(name) {
            let kind = BindingErrorKind::InvalidIdentifier {
                role,
                name: name.to_string(),
            };
            self.member_error(member, kind);
        }
    }

    fn member_name(&mut self, name: &str, alias: Option<&str>) {
        if !member_pattern().is_match(name) {
            let kind = BindingErrorKind::InvalidIdentifier {
                role: "member name",
                name: name.to_string(),
            };
            self.member_error(name, kind);
        }

        let external = alias.unwrap_or(name);
        self.script_name(name, "external name", external);

        if external.contains(ORDER_SEPARATOR) {
            let kind = BindingErrorKind::ReservedSeparator {
                name: external.to_string(),
            };
            self.member_error(name, kind);
        }
    }

    fn global_name(&mut self, name: &str) {
        if !is_script_ident(name) {
            self.error(BindingErrorKind::InvalidIdentifier {
                role: "global name",
                name: name.to_string(),
            });
        }
    }

    fn field(&mut self, field: &FieldDescriptor) {
        self.member_name(&field.name, field.alias.as_deref());
        if field.ty.is_void() {
            let kind = BindingErrorKind::VoidField {
                name: field.name.clone(),
            };
            self.member_error(&field.name, kind);
        }
    }

    fn params(&mut self, method: &MethodDescriptor) {
        for param in &method.params {
            self.script_name(&method.name, "parameter name", &param.name);
            if param.ty.is_void() {
                let kind = BindingErrorKind::VoidParam {
                    method: method.name.clone(),
                    param: param.name.clone(),
                };
                self.member_error(&method.name, kind);
            }
        }
    }

    fn method(&mut self, method: &MethodDescriptor) {
        self.member_name(&method.name, method.alias.as_deref());
        self.params(method);

        if method.flatten_to_field {
            match method.accessor() {
                None => {
                    let kind = BindingErrorKind::FlattenArity {
                        name: method.name.clone(),
                        count: method.params.len(),
                    };
                    self.member_error(&method.name, kind);
                }
                Some(Accessor::Getter) if method.return_ty.is_void() => {
                    let kind = BindingErrorKind::FlattenGetterReturnsVoid {
                        name: method.name.clone(),
                    };
                    self.member_error(&method.name, kind);
                }
                Some(..) => {}
            }
        }
    }

    fn constructor(&mut self, ctor: &MethodDescriptor) {
        self.params(ctor);
        if !ctor.return_ty.is_void() {
            let kind = BindingErrorKind::ConstructorReturnType {
                ty: ctor.return_ty.clone(),
            };
            self.member_error(&ctor.name, kind);
        }
    }

    /// All members sharing one external name must agree on whether they
    /// take a receiver, since they share one trampoline.
    fn overload_groups<'m>(&mut self, methods: impl Iterator<Item = &'m MethodDescriptor>) {
        let mut groups: LinkedHashMap<&str, bool> = LinkedHashMap::new();
        for method in methods {
            let name = method.external_name();
            match groups.get(name) {
                Some(is_static) if *is_static != method.is_static => {
                    let kind = BindingErrorKind::StaticMismatch {
                        name: name.to_string(),
                    };
                    self.member_error(&method.name, kind);
                }
                Some(..) => {}
                None => {
                    groups.insert(name, method.is_static);
                }
            }
        }
    }

    fn bind(
        &mut self,
        names: &mut LinkedHashMap<String, Binding>,
        member: &str,
        name: &str,
        binding: Binding,
    ) {
        if !names.contains_key(name) {
            names.insert(name.to_string(), binding);
            return;
        }

        let existing = match names.get_mut(name) {
            Some(existing) => existing,
            None => return,
        };

        match (existing, binding) {
            (Binding::Callable, Binding::Callable) => {}

            (
                Binding::Accessors { getter, setter },
                Binding::Accessors {
                    getter: new_getter,
                    setter: new_setter,
                },
            ) => {
                let duplicate = if new_getter && *getter {
                    Some(Accessor::Getter)
                } else if new_setter && *setter {
                    Some(Accessor::Setter)
                } else {
                    None
                };

                *getter |= new_getter;
                *setter |= new_setter;

                if let Some(accessor) = duplicate {
                    let kind = BindingErrorKind::DuplicateAccessor {
                        name: name.to_string(),
                        accessor,
                    };
                    self.member_error(member, kind);
                }
            }

            (existing, binding) => {
                let kind = BindingErrorKind::NameCollision {
                    name: name.to_string(),
                    existing: existing.describe(),
                    new: binding.describe(),
                };
                self.member_error(member, kind);
            }
        }
    }

    fn class(&mut self, class: &ClassDescriptor) {
        if !class.constructors.is_empty() || class.auto_register {
            self.global_name(class.short_name());
        }

        let mut names = LinkedHashMap::new();

        for field in &class.fields {
            self.field(field);
            self.bind(&mut names, &field.name, field.external_name(), Binding::Field);
        }

        for method in &class.methods {
            self.method(method);
        }

        for method in class.flattened() {
            if let Some(accessor) = method.accessor() {
                let binding = Binding::Accessors {
                    getter: accessor == Accessor::Getter,
                    setter: accessor == Accessor::Setter,
                };
                self.bind(&mut names, &method.name, method.external_name(), binding);
            }
        }

        for func in &class.functions {
            self.method(func);
            if !func.is_static {
                let kind = BindingErrorKind::InstanceFunction {
                    name: func.name.clone(),
                };
                self.member_error(&func.name, kind);
            }
        }

        for method in class.callables() {
            self.bind(&mut names, &method.name, method.external_name(), Binding::Callable);
        }
        self.overload_groups(class.callables());

        for ctor in &class.constructors {
            self.constructor(ctor);
        }
    }

    fn function_group(&mut self, group: &FunctionGroupDescriptor) {
        for func in &group.functions {
            self.method(func);

            // singleton groups call through the cached instance
            if func.is_static == group.singleton {
                let kind = BindingErrorKind::FunctionReceiverMismatch {
                    name: func.name.clone(),
                    singleton: group.singleton,
                };
                self.member_error(&func.name, kind);
            }

            if func.flatten_to_field {
                let kind = BindingErrorKind::FlattenArity {
                    name: func.name.clone(),
                    count: func.params.len(),
                };
                self.member_error(&func.name, kind);
            }
        }
    }

    fn enumeration(&mut self, enum_desc: &EnumDescriptor) {
        self.global_name(enum_desc.global_name());

        let mut seen = HashSet::new();
        for constant in &enum_desc.constants {
            self.script_name(&constant.name, "enum constant", &constant.name);
            if !seen.insert(constant.name.as_str()) {
                let kind = BindingErrorKind::DuplicateEnumConstant {
                    name: constant.name.clone(),
                };
                self.member_error(&constant.name, kind);
            }
        }
    }

    fn environment(&mut self, env: &EnvironmentDescriptor) {
        let mut names = LinkedHashMap::new();
        for field in &env.fields {
            self.field(field);
            self.bind(&mut names, &field.name, field.external_name(), Binding::Field);

            if !field.is_static {
                let kind = BindingErrorKind::InstanceEnvironmentField {
                    name: field.name.clone(),
                };
                self.member_error(&field.name, kind);
            }
        }
    }
}
