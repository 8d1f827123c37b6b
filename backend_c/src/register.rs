#[cfg(test)]
mod test;

use crate::ast::Expr;
use crate::ast::FieldName;
use crate::ast::FunctionDecl;
use crate::ast::FunctionDef;
use crate::ast::FunctionName;
use crate::ast::JniFunction;
use crate::ast::JniKind;
use crate::ast::Linkage;
use crate::ast::Statement;
use crate::ast::StructDef;
use crate::ast::Type;
use crate::ast::TypeName;
use crate::dispatch;
use crate::marshal;
use bind_ir::jni_path_of;
use bind_ir::FieldDescriptor;
use bind_ir::MethodDescriptor;
use bind_ir::CONSTRUCTOR_NAME;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LookupKind {
    Field,
    Method,
}

/// One member ID resolved at registration and cached in the `ClassInfo`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IdLookup {
    pub slot: FieldName,
    pub kind: LookupKind,
    pub is_static: bool,
    pub java_name: String,
    pub signature: String,
}

impl IdLookup {
    pub fn field(field: &FieldDescriptor) -> Self {
        Self {
            slot: dispatch::field_id_field(field),
            kind: LookupKind::Field,
            is_static: field.is_static,
            java_name: field.name.clone(),
            signature: marshal::native_descriptor(&field.ty),
        }
    }

    pub fn method(method: &MethodDescriptor) -> Self {
        Self {
            slot: dispatch::member_id_field(method),
            kind: LookupKind::Method,
            is_static: method.is_static,
            java_name: method.name.clone(),
            signature: marshal::method_signature(&method.params, &method.return_ty),
        }
    }

    pub fn constructor(ctor: &MethodDescriptor) -> Self {
        Self {
            slot: crate::overload::constructor_id_field(ctor),
            kind: LookupKind::Method,
            is_static: false,
            java_name: CONSTRUCTOR_NAME.to_string(),
            signature: marshal::method_signature(&ctor.params, &ctor.return_ty),
        }
    }

    pub fn default_constructor() -> Self {
        Self {
            slot: FieldName::DefaultCtor,
            kind: LookupKind::Method,
            is_static: false,
            java_name: CONSTRUCTOR_NAME.to_string(),
            signature: "()V".to_string(),
        }
    }

    fn slot_type(&self) -> TypeName {
        match self.kind {
            LookupKind::Field => TypeName::JFieldId,
            LookupKind::Method => TypeName::JMethodId,
        }
    }

    fn to_statement(&self) -> Statement {
        let func = match self.kind {
            LookupKind::Field => JniFunction::GetFieldId {
                is_static: self.is_static,
            },
            LookupKind::Method => JniFunction::GetMethodId {
                is_static: self.is_static,
            },
        };

        let lookup = Expr::jni(
            "env",
            func,
            [
                Expr::named_var("clazz"),
                Expr::lit_str(self.java_name.as_str()),
                Expr::lit_str(self.signature.as_str()),
            ],
        );
        Statement::Expr(Expr::assign(dispatch::info_field(self.slot.clone()), lookup))
    }
}

/// Everything the register/unregister pair of one unit needs.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Binary class name, also the registry key.
    pub name: String,
    pub ident: String,
    pub lookups: Vec<IdLookup>,

    /// Caches the owner's `INSTANCE` as `instanceId`.
    pub singleton: bool,

    /// Units without a `ClassInfo` publish a NULL block.
    pub has_block: bool,
}

impl Registration {
    pub fn new(name: impl Into<String>, ident: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ident: ident.into(),
            lookups: Vec::new(),
            singleton: false,
            has_block: true,
        }
    }

    /// A unit that registers only its name.
    pub fn blockless(name: impl Into<String>, ident: impl Into<String>) -> Self {
        Self {
            has_block: false,
            ..Self::new(name, ident)
        }
    }

    pub fn lookup(&mut self, lookup: IdLookup) {
        if !self.lookups.iter().any(|existing| existing.slot == lookup.slot) {
            self.lookups.push(lookup);
        }
    }

    pub fn register_name(&self) -> FunctionName {
        FunctionName::RegisterUnit(self.ident.clone())
    }

    pub fn unregister_name(&self) -> FunctionName {
        FunctionName::UnregisterUnit(self.ident.clone())
    }

    /// The per-unit `ClassInfo` layout.
    pub fn class_info(&self) -> Option<StructDef> {
        if !self.has_block {
            return None;
        }

        let mut def = StructDef::new(TypeName::ClassInfo);
        def.member(FieldName::Name, Type::c_string());
        def.member(FieldName::Id, Type::Int64);
        if self.singleton {
            def.member(FieldName::InstanceId, Type::Int64);
        }
        for lookup in &self.lookups {
            def.member(lookup.slot.clone(), lookup.slot_type());
        }

        Some(def)
    }

    fn decl(name: FunctionName) -> FunctionDecl {
        FunctionDecl::new(name, Type::Int, Linkage::External).with_param(Type::env_ptr(), "env")
    }

    pub fn register_decl(&self) -> FunctionDecl {
        Self::decl(self.register_name())
    }

    pub fn unregister_decl(&self) -> FunctionDecl {
        Self::decl(self.unregister_name())
    }

    fn publish(&self, block: Expr) -> Statement {
        Statement::Expr(Expr::function(FunctionName::Register).call([
            Expr::lit_str(self.name.as_str()),
            Expr::function(FunctionName::Inject(self.ident.clone())),
            block,
        ]))
    }

    /// Allocates and fills the `ClassInfo`, then publishes it. Returns 0
    /// when the block can't be allocated or the class can't be found.
    pub fn register_fn(&self) -> FunctionDef {
        let mut body = Vec::new();

        if !self.has_block {
            body.push(self.publish(Expr::Null));
            body.push(Statement::return_value(Expr::LitInt(1)));
            return FunctionDef::new(self.register_decl(), body);
        }

        let class_info = || Expr::named_var("classInfo");
        let clazz = || Expr::named_var("clazz");
        let env = || Expr::named_var("env");

        let alloc = Expr::function(FunctionName::Malloc)
            .call([Expr::SizeOf(TypeName::ClassInfo.into())])
            .cast(Type::class_info_ptr());
        body.push(Statement::VariableDecl {
            ty: Type::class_info_ptr(),
            name: "classInfo".to_string(),
            init: Some(alloc),
        });
        body.push(Statement::if_then(
            class_info().eq(Expr::Null),
            [Statement::return_value(Expr::LitInt(0))],
        ));

        body.push(Statement::Expr(Expr::assign(
            dispatch::info_field(FieldName::Name),
            Expr::lit_str(self.name.as_str()),
        )));

        let find_class = Expr::jni(
            "env",
            JniFunction::FindClass,
            [Expr::lit_str(jni_path_of(&self.name))],
        );
        body.push(Statement::VariableDecl {
            ty: TypeName::JClass.into(),
            name: "clazz".to_string(),
            init: Some(find_class),
        });
        body.push(Statement::if_then(
            clazz().eq(Expr::Null),
            [
                Statement::Expr(Expr::function(FunctionName::Free).call([class_info()])),
                Statement::return_value(Expr::LitInt(0)),
            ],
        ));

        body.extend(self.lookups.iter().map(IdLookup::to_statement));

        if self.singleton {
            let instance_fid = Expr::jni(
                "env",
                JniFunction::GetFieldId { is_static: true },
                [
                    clazz(),
                    Expr::lit_str("INSTANCE"),
                    Expr::lit_str(format!("L{};", jni_path_of(&self.name))),
                ],
            );
            let get_instance = Expr::jni(
                "env",
                JniFunction::GetField {
                    is_static: true,
                    kind: JniKind::Object,
                },
                [clazz(), Expr::named_var("instanceFieldId")],
            );
            let cache_instance = Expr::function(FunctionName::CacheObject).call([env(), Expr::named_var("instance")]);

            body.extend([
                Statement::VariableDecl {
                    ty: TypeName::JFieldId.into(),
                    name: "instanceFieldId".to_string(),
                    init: Some(instance_fid),
                },
                Statement::VariableDecl {
                    ty: TypeName::JObject.into(),
                    name: "instance".to_string(),
                    init: Some(get_instance),
                },
                Statement::Expr(Expr::assign(dispatch::info_field(FieldName::InstanceId), cache_instance)),
                Statement::Expr(Expr::jni("env", JniFunction::DeleteLocalRef, [Expr::named_var("instance")])),
            ]);
        }

        let cache_class = Expr::function(FunctionName::CacheObject).call([env(), clazz()]);
        body.push(Statement::Expr(Expr::assign(dispatch::info_field(FieldName::Id), cache_class)));
        body.push(Statement::Expr(Expr::jni("env", JniFunction::DeleteLocalRef, [clazz()])));

        body.push(self.publish(class_info()));
        body.push(Statement::return_value(Expr::LitInt(1)));

        FunctionDef::new(self.register_decl(), body)
    }

    /// Retracts the registration and releases whatever it cached. A unit
    /// that was never registered is not an error.
    pub fn unregister_fn(&self) -> FunctionDef {
        let unregister = Expr::function(FunctionName::Unregister).call([Expr::lit_str(self.name.as_str())]);

        let mut body = Vec::new();

        if !self.has_block {
            body.push(Statement::Expr(unregister));
            body.push(Statement::return_value(Expr::LitInt(1)));
            return FunctionDef::new(self.unregister_decl(), body);
        }

        body.push(Statement::VariableDecl {
            ty: Type::class_info_ptr(),
            name: "classInfo".to_string(),
            init: Some(unregister.cast(Type::class_info_ptr())),
        });

        let release = |field: FieldName| {
            Statement::Expr(
                Expr::function(FunctionName::ReleaseObject)
                    .call([Expr::named_var("env"), dispatch::info_field(field)]),
            )
        };

        let mut cleanup = Vec::new();
        if self.singleton {
            cleanup.push(release(FieldName::InstanceId));
        }
        cleanup.push(release(FieldName::Id));
        cleanup.push(Statement::Expr(
            Expr::function(FunctionName::Free).call([Expr::named_var("classInfo")]),
        ));

        body.push(Statement::if_then(
            Expr::named_var("classInfo").not_eq(Expr::Null),
            cleanup,
        ));
        body.push(Statement::return_value(Expr::LitInt(1)));

        FunctionDef::new(self.unregister_decl(), body)
    }
}
