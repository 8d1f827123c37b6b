use crate::validate::validate_unit;
use crate::*;

fn ty(s: &str) -> TypeDescriptor {
    s.parse().unwrap()
}

fn param(name: &str, ty_name: &str) -> ParameterDescriptor {
    ParameterDescriptor::new(name, ty(ty_name))
}

fn class_errors(class: ClassDescriptor) -> Vec<BindingErrorKind> {
    validate_unit(&BindingUnit::Class(class))
        .into_iter()
        .map(|err| err.kind)
        .collect()
}

#[test]
fn well_formed_class_passes() {
    let mut class = ClassDescriptor::new("com.example.Point");
    class.fields.push(FieldDescriptor::new("x", ty("int")));
    class.fields.push(FieldDescriptor::new("label", ty("java.lang.String")).read_only());
    class.methods.push(MethodDescriptor::new("getLength", ty("double")).with_alias("length").flattened());
    class.methods.push(
        MethodDescriptor::new("setLength", ty("void"))
            .with_alias("length")
            .with_params([param("value", "double")])
            .flattened(),
    );
    class.methods.push(MethodDescriptor::new("move", ty("void")).with_params([param("dx", "int")]));
    class.methods.push(
        MethodDescriptor::new("move", ty("void")).with_params([param("dx", "int"), param("dy", "int")]),
    );
    class.constructors.push(MethodDescriptor::constructor([]));

    let module = BindingModule {
        units: vec![BindingUnit::Class(class)],
    };
    assert_eq!(Ok(()), validate(&module));
}

#[test]
fn field_and_method_sharing_a_name_collide() {
    let mut class = ClassDescriptor::new("com.example.Foo");
    class.fields.push(FieldDescriptor::new("size", ty("int")));
    class.methods.push(MethodDescriptor::new("size", ty("int")));

    let errors = class_errors(class);
    assert_eq!(1, errors.len());
    assert!(matches!(
        &errors[0],
        BindingErrorKind::NameCollision { name, existing: "field", new: "method" } if name == "size"
    ));
}

#[test]
fn flattened_getter_collides_with_field_alias() {
    let mut class = ClassDescriptor::new("com.example.Foo");
    class.fields.push(FieldDescriptor::new("mCount", ty("int")).with_alias("count"));
    class.methods.push(MethodDescriptor::new("getCount", ty("int")).with_alias("count").flattened());

    let errors = class_errors(class);
    assert!(matches!(&errors[..], [BindingErrorKind::NameCollision { .. }]));
}

#[test]
fn duplicate_getter_is_reported() {
    let mut class = ClassDescriptor::new("com.example.Foo");
    class.methods.push(MethodDescriptor::new("a", ty("int")).with_alias("value").flattened());
    class.methods.push(MethodDescriptor::new("b", ty("int")).with_alias("value").flattened());

    let errors = class_errors(class);
    assert!(matches!(
        &errors[..],
        [BindingErrorKind::DuplicateAccessor { accessor: Accessor::Getter, .. }]
    ));
}

#[test]
fn overloads_must_agree_on_static() {
    let mut class = ClassDescriptor::new("com.example.Foo");
    class.methods.push(MethodDescriptor::new("run", ty("void")));
    class.methods.push(
        MethodDescriptor::new("run", ty("void"))
            .with_params([param("n", "int")])
            .static_method(),
    );

    let errors = class_errors(class);
    assert!(matches!(&errors[..], [BindingErrorKind::StaticMismatch { name }] if name == "run"));
}

#[test]
fn unsupported_shapes_are_all_reported() {
    let mut class = ClassDescriptor::new("com.example.Foo");
    class.fields.push(FieldDescriptor::new("nothing", ty("void")));
    class.methods.push(
        MethodDescriptor::new("set", ty("void"))
            .with_params([param("a", "int"), param("b", "int")])
            .flattened(),
    );
    class.methods.push(MethodDescriptor::new("touch", ty("void")).flattened());
    class.constructors.push(MethodDescriptor::constructor([]).with_params([param("x", "void")]));
    class.functions.push(MethodDescriptor::new("helper", ty("int")));

    let errors = class_errors(class);
    assert!(errors.contains(&BindingErrorKind::VoidField { name: "nothing".to_string() }));
    assert!(errors.contains(&BindingErrorKind::FlattenArity {
        name: "set".to_string(),
        count: 2
    }));
    assert!(errors.contains(&BindingErrorKind::FlattenGetterReturnsVoid { name: "touch".to_string() }));
    assert!(errors.contains(&BindingErrorKind::VoidParam {
        method: CONSTRUCTOR_NAME.to_string(),
        param: "x".to_string()
    }));
    assert!(errors.contains(&BindingErrorKind::InstanceFunction { name: "helper".to_string() }));
}

#[test]
fn nested_member_names_need_an_alias() {
    let mut class = ClassDescriptor::new("com.example.Foo");
    class.methods.push(MethodDescriptor::new("access$000", ty("int")));
    class.methods.push(MethodDescriptor::new("access$001", ty("int")).with_alias("access"));

    let errors = class_errors(class);
    assert_eq!(1, errors.len());
    assert!(matches!(
        &errors[0],
        BindingErrorKind::InvalidIdentifier { role: "external name", name } if name == "access$000"
    ));
}

#[test]
fn external_names_cannot_spell_an_overload_number() {
    let mut class = ClassDescriptor::new("com.example.Foo");
    class.methods.push(MethodDescriptor::new("foo", ty("int")));
    class.methods.push(MethodDescriptor::new("foo", ty("int")).with_params([param("n", "int")]));
    class.methods.push(MethodDescriptor::new("fooAgain", ty("int")).with_alias("foo__1"));
    class.fields.push(FieldDescriptor::new("count__2", ty("int")));

    let errors = class_errors(class);
    assert_eq!(
        vec![
            BindingErrorKind::ReservedSeparator { name: "count__2".to_string() },
            BindingErrorKind::ReservedSeparator { name: "foo__1".to_string() },
        ],
        errors
    );
}

#[test]
fn duplicate_unit_idents_are_rejected() {
    // different binary names, same C identifier
    let module = BindingModule {
        units: vec![
            BindingUnit::Class(ClassDescriptor::new("a.b_c")),
            BindingUnit::Class(ClassDescriptor::new("a_b.c")),
        ],
    };

    let errors = validate(&module).unwrap_err();
    assert_eq!(1, errors.len());
    assert_eq!("a_b.c", errors[0].owner);
    assert_eq!(BindingErrorKind::DuplicateUnit, errors[0].kind);
}

#[test]
fn singleton_group_rejects_static_functions() {
    let mut group = FunctionGroupDescriptor::new("com.example.Tools");
    group.singleton = true;
    group.functions.push(MethodDescriptor::new("ok", ty("int")));
    group.functions.push(MethodDescriptor::new("bad", ty("int")).static_method());

    let errors = validate_unit(&BindingUnit::Functions(group));
    assert_eq!(1, errors.len());
    assert_eq!(Some("bad".to_string()), errors[0].member);
}

#[test]
fn environment_fields_must_be_static() {
    let env = EnvironmentDescriptor {
        name: "com.example.Env".to_string(),
        fields: vec![
            FieldDescriptor::new("VERSION", ty("int")).static_field(),
            FieldDescriptor::new("local", ty("int")),
        ],
    };

    let errors = validate_unit(&BindingUnit::Environment(env));
    assert_eq!(1, errors.len());
    assert_eq!(
        BindingErrorKind::InstanceEnvironmentField { name: "local".to_string() },
        errors[0].kind
    );
}

#[test]
fn enum_constants_must_be_unique() {
    let enum_desc = EnumDescriptor {
        name: "com.example.Color".to_string(),
        alias: None,
        constants: vec![
            EnumConstant { name: "RED".to_string(), value: 0 },
            EnumConstant { name: "RED".to_string(), value: 1 },
        ],
    };

    let errors = validate_unit(&BindingUnit::Enum(enum_desc));
    assert_eq!(
        vec![BindingErrorKind::DuplicateEnumConstant { name: "RED".to_string() }],
        errors.into_iter().map(|e| e.kind).collect::<Vec<_>>()
    );
}

#[test]
fn invalid_class_name_stops_unit_checks() {
    let mut class = ClassDescriptor::new("com.example.");
    class.fields.push(FieldDescriptor::new("x", ty("void")));

    assert_eq!(vec![BindingErrorKind::InvalidClassName], class_errors(class));
}

#[test]
fn module_loads_from_json() {
    let json = r#"{
        "units": [
            {
                "kind": "class",
                "name": "com.example.Outer$Inner",
                "auto_register": true,
                "fields": [{ "name": "count", "type": "int", "read_only": true }],
                "methods": [
                    { "name": "getName", "alias": "name", "return_type": "java.lang.String", "flatten": true },
                    { "name": "create", "return_type": "com.example.Outer$Inner", "static": true,
                      "params": [{ "name": "seed", "type": "long[]" }] }
                ]
            },
            { "kind": "enum", "name": "com.example.Mode", "constants": [{ "name": "ON", "value": 1 }] }
        ]
    }"#;

    let module: BindingModule = serde_json::from_str(json).unwrap();
    assert_eq!(2, module.units.len());

    let class = match &module.units[0] {
        BindingUnit::Class(class) => class,
        other => panic!("expected class, got {}", other),
    };
    assert_eq!("com_example_Outer__Inner", class.ident());
    assert_eq!("Inner", class.short_name());
    assert!(class.uses_default_constructor());
    assert!(class.fields[0].read_only);
    assert_eq!(Some(Accessor::Getter), class.methods[0].accessor());
    assert!(class.methods[1].is_static);
    assert_eq!(1, class.methods[1].params[0].ty.dims);
    assert_eq!(None, class.methods[1].overload_order);

    assert_eq!(Ok(()), validate(&module));
}
