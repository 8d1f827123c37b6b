use super::*;
use crate::overload::group_overloads;
use bind_ir::FieldDescriptor;

fn ty(s: &str) -> TypeDescriptor {
    s.parse().unwrap()
}

fn param(name: &str, ty_name: &str) -> ParameterDescriptor {
    ParameterDescriptor::new(name, ty(ty_name))
}

fn calls_in(expr: &Expr) -> Vec<Expr> {
    let mut calls = Vec::new();
    expr.walk(&mut |e| {
        if let Expr::Call { .. } = e {
            calls.push(e.clone());
        }
    });
    calls
}

/// Expressions evaluated by a statement itself, not by nested blocks.
fn direct_exprs(stmt: &Statement) -> Vec<&Expr> {
    match stmt {
        Statement::Expr(expr) => vec![expr],
        Statement::VariableDecl { init: Some(init), .. } => vec![init],
        Statement::Return(Some(val)) => vec![val],
        Statement::IfCond { cond, .. } => vec![cond],
        _ => vec![],
    }
}

fn raising_jni_call(stmt: &Statement) -> Option<JniFunction> {
    direct_exprs(stmt)
        .into_iter()
        .flat_map(calls_in)
        .find_map(|call| match call {
            Expr::Call { func, .. } => match *func {
                Expr::Arrow {
                    field: FieldName::Jni(jni_func),
                    ..
                } if jni_func.may_raise() => Some(jni_func),
                _ => None,
            },
            _ => None,
        })
}

fn is_exception_check(stmt: &Statement) -> bool {
    match stmt {
        Statement::IfCond { cond, .. } => calls_in(cond).iter().any(|call| {
            matches!(call, Expr::Call { func, .. } if **func == Expr::Function(FunctionName::CatchJavaException))
        }),
        _ => false,
    }
}

/// Every native call that can leave an exception pending is followed
/// directly by the check that bridges it.
fn assert_exceptions_bridged(stmts: &[Statement]) {
    for (i, stmt) in stmts.iter().enumerate() {
        if let Some(func) = raising_jni_call(stmt) {
            let next = stmts.get(i + 1);
            assert!(
                next.map(is_exception_check).unwrap_or(false),
                "{} is not followed by an exception check: {}",
                func,
                stmt
            );
        }

        if let Statement::IfCond {
            then_branch,
            else_branch,
            ..
        } = stmt
        {
            assert_exceptions_bridged(then_branch);
            assert_exceptions_bridged(else_branch);
        }
    }
}

/// `if (h != NULL) { <release h>; }`
fn released_handle(stmt: &Statement) -> Option<String> {
    let Statement::IfCond {
        cond,
        then_branch,
        else_branch,
    } = stmt
    else {
        return None;
    };

    let (Expr::InfixOp { lhs, op: crate::ast::InfixOp::NotEq, rhs }, [Statement::Expr(release)], []) =
        (cond, then_branch.as_slice(), else_branch.as_slice())
    else {
        return None;
    };
    let (Expr::Variable(handle), Expr::Null) = (lhs.as_ref(), rhs.as_ref()) else {
        return None;
    };

    let releases = calls_in(release).iter().any(|call| match call {
        Expr::Call { func, .. } => matches!(
            func.as_ref(),
            Expr::Function(FunctionName::PutBackObject)
                | Expr::Arrow {
                    field: FieldName::Jni(JniFunction::DeleteLocalRef),
                    ..
                }
        ),
        _ => false,
    });

    releases.then(|| handle.clone())
}

/// Whether control can't fall off the end of `stmts`.
fn terminates(stmts: &[Statement]) -> bool {
    match stmts.last() {
        Some(Statement::Return(..)) => true,
        Some(Statement::IfCond {
            then_branch,
            else_branch,
            ..
        }) => terminates(then_branch) && terminates(else_branch),
        _ => false,
    }
}

/// Argument checks that raise a Lua error, leaving the function without
/// running any release.
fn raises_on_bad_argument(stmt: &Statement) -> bool {
    direct_exprs(stmt).into_iter().flat_map(calls_in).any(|call| {
        matches!(
            &call,
            Expr::Call { func, .. } if matches!(
                func.as_ref(),
                Expr::Function(FunctionName::LuaLCheckUdata | FunctionName::LuaLCheckString)
            )
        )
    })
}

/// Walks every path through `stmts`, asserting that each tracked handle
/// declared on the path is released before the path returns, raises or
/// leaves the block that declared it.
fn assert_released(stmts: &[Statement], tracked: &[&str], mut live: Vec<String>) {
    let outer = live.len();

    for stmt in stmts {
        if raises_on_bad_argument(stmt) {
            assert!(live.is_empty(), "argument check can raise with {:?} still held: {}", live, stmt);
        }

        match stmt {
            Statement::VariableDecl { name, .. } if tracked.contains(&name.as_str()) => {
                live.push(name.clone());
            }

            Statement::Return(..) => {
                assert!(live.is_empty(), "returning with {:?} still held", live);
                return;
            }

            Statement::IfCond {
                then_branch,
                else_branch,
                ..
            } => match released_handle(stmt) {
                Some(handle) => live.retain(|held| *held != handle),
                None => {
                    assert_released(then_branch, tracked, live.clone());
                    assert_released(else_branch, tracked, live.clone());
                }
            },

            _ => {}
        }
    }

    if terminates(stmts) {
        return;
    }

    assert!(
        live.len() <= outer,
        "block falls through holding {:?}",
        &live[outer.min(live.len())..]
    );
}

fn point_class() -> ClassDescriptor {
    let mut class = ClassDescriptor::new("com.example.Point");
    class.fields.push(FieldDescriptor::new("x", ty("int")));
    class.fields.push(FieldDescriptor::new("label", ty("java.lang.String")).read_only());
    class.fields.push(FieldDescriptor::new("ORIGIN", ty("com.example.Point")).static_field());
    class.methods.push(
        MethodDescriptor::new("distanceTo", ty("double")).with_params([param("other", "com.example.Point")]),
    );
    class.methods.push(
        MethodDescriptor::new("rename", ty("java.lang.String"))
            .with_params([param("other", "com.example.Point"), param("name", "java.lang.String")]),
    );
    class
}

fn render(func: &FunctionDef) -> String {
    func.to_string()
}

#[test]
fn trampolines_bridge_every_exception() {
    let class = point_class();
    let groups = group_overloads(&class.name, class.callables()).unwrap();

    for group in &groups {
        let receiver = Receiver::of_method(&group.methods[0], &class);
        let func = trampoline(group, &receiver, false);
        assert_exceptions_bridged(&func.body);
    }

    assert_exceptions_bridged(&index_method(&class, &groups, false).body);
    assert_exceptions_bridged(&new_index_method(&class, false).body);
}

#[test]
fn trampoline_releases_on_every_path() {
    let class = point_class();
    let groups = group_overloads(&class.name, class.callables()).unwrap();
    let rename = groups.iter().find(|g| g.name == "rename").unwrap();

    let func = trampoline(rename, &Receiver::Instance(class.name.clone()), false);
    assert_released(&func.body, &["obj", "p_other", "p_name"], Vec::new());

    let out = render(&func);
    assert!(out.starts_with("static int method_rename(lua_State* L) {"));
    assert!(out.contains("JavaObject* object = (JavaObject*)luaL_checkudata(L, 1, \"com.example.Point\");"));
    assert!(out.contains("jobject obj = luaJniTakeObject(env, object->id);"));
    assert!(out.contains("lua_gettop(L) == 3 && (lua_isnil(L, 2) || luaL_testudata(L, 2, \"com.example.Point\") != NULL)"));
    assert!(out.contains("jstring result = (*env)->CallObjectMethod(env, obj, classInfo->mid_rename, p_other, p_name);"));
    assert!(out.contains("\"rename: no matching overload\""));
}

#[test]
fn member_access_releases_on_every_path() {
    let mut class = point_class();
    class
        .methods
        .push(MethodDescriptor::new("getCenter", ty("com.example.Point")).with_alias("center").flattened());
    class.methods.push(
        MethodDescriptor::new("setCenter", ty("void"))
            .with_alias("center")
            .with_params([param("value", "com.example.Point")])
            .flattened(),
    );
    let groups = group_overloads(&class.name, class.callables()).unwrap();

    let tracked = ["obj", "clazz", "p_value"];
    assert_released(&index_method(&class, &groups, false).body, &tracked, Vec::new());
    assert_released(&new_index_method(&class, false).body, &tracked, Vec::new());
}

#[test]
fn member_access_checks_the_key_before_leasing() {
    let class = point_class();
    let groups = group_overloads(&class.name, class.callables()).unwrap();

    for func in [index_method(&class, &groups, false), new_index_method(&class, false)] {
        let out = render(&func);
        let check = out.find("const char* keyStr = luaL_checkstring(L, 2);").unwrap();
        let take = out.find("jobject obj = luaJniTakeObject(env, object->id);").unwrap();
        assert!(check < take, "{}", out);

        assert_released(&func.body, &["obj"], Vec::new());
    }
}

#[test]
fn index_tries_fields_then_getters_then_methods() {
    let mut class = point_class();
    class
        .methods
        .push(MethodDescriptor::new("getLength", ty("double")).with_alias("length").flattened());
    let groups = group_overloads(&class.name, class.callables()).unwrap();

    let out = render(&index_method(&class, &groups, false));
    let x = out.find("strcmp(keyStr, \"x\") == 0").unwrap();
    let length = out.find("strcmp(keyStr, \"length\") == 0").unwrap();
    let distance = out.find("strcmp(keyStr, \"distanceTo\") == 0").unwrap();
    assert!(x < length && length < distance);

    assert!(out.contains("if (luaJniPushIntField(L, env, obj, classInfo->fid_x) == 0) {"));
    assert!(out.contains("lua_pushcclosure(L, method_distanceTo, 1);"));

    // unknown keys read as nil
    assert!(out.contains("} else {\n    lua_pushnil(L);\n  }"));
}

#[test]
fn static_fields_lease_the_class_inside_their_branch() {
    let class = point_class();
    let groups = group_overloads(&class.name, class.callables()).unwrap();
    let func = index_method(&class, &groups, false);

    let out = render(&func);
    assert!(out.contains(
        "luaJniPushStaticObjectField(L, env, clazz, classInfo->fid_ORIGIN, \"com.example.Point\") == 0"
    ));

    // no top-level statement touches the class handle
    let top_level: Vec<_> = func
        .body
        .iter()
        .filter(|stmt| !matches!(stmt, Statement::IfCond { .. }) || released_handle(stmt).is_some())
        .map(|stmt| stmt.to_string())
        .collect();
    assert!(top_level.iter().all(|stmt| !stmt.contains("clazz")));
}

#[test]
fn new_index_rejects_unknown_and_read_only_members() {
    let class = point_class();
    let out = render(&new_index_method(&class, false));

    assert!(out.contains("strcmp(keyStr, \"x\") == 0"));
    assert!(!out.contains("\"label\""));

    assert!(out.contains("if (!lua_isinteger(L, 3)) {"));
    assert!(out.contains("\"Member x must be a int\""));
    assert!(out.contains("(*env)->SetIntField(env, obj, classInfo->fid_x, p_value);"));
    assert!(out.contains("(*env)->SetStaticObjectField(env, clazz, classInfo->fid_ORIGIN, p_value);"));

    let not_found = out.find("return luaL_error(L, \"Can\\'t find member %s\", keyStr);").unwrap();
    let last_put_back = out[..not_found].rfind("luaJniPutBackObject(env, obj);").unwrap();
    assert!(last_put_back < not_found);
    assert!(out.trim_end().ends_with("return 0;\n}"));
}

#[test]
fn flattened_accessors_behave_like_a_field() {
    let mut field_class = ClassDescriptor::new("com.example.Counter");
    field_class.fields.push(FieldDescriptor::new("count", ty("int")));

    let mut accessor_class = ClassDescriptor::new("com.example.Counter");
    accessor_class
        .methods
        .push(MethodDescriptor::new("getCount", ty("int")).with_alias("count").flattened());
    accessor_class.methods.push(
        MethodDescriptor::new("setCount", ty("void"))
            .with_alias("count")
            .with_params([param("value", "int")])
            .flattened(),
    );

    for class in [&field_class, &accessor_class] {
        let index = render(&index_method(class, &[], false));
        let new_index = render(&new_index_method(class, false));

        assert!(index.contains("strcmp(keyStr, \"count\") == 0"), "{}", index);
        assert!(new_index.contains("strcmp(keyStr, \"count\") == 0"), "{}", new_index);
        assert!(new_index.contains("if (!lua_isinteger(L, 3)) {"));
        assert!(new_index.contains("\"Member count must be a int\""));
    }

    let index = render(&index_method(&accessor_class, &[], false));
    assert!(index.contains("jint result = (*env)->CallIntMethod(env, obj, classInfo->getter_count);"));
    assert!(index.contains("lua_pushinteger(L, result);"));

    let new_index = render(&new_index_method(&accessor_class, false));
    assert!(new_index.contains("jint p_value = (jint)lua_tointeger(L, 3);"));
    assert!(new_index.contains("(*env)->CallVoidMethod(env, obj, classInfo->setter_count, p_value);"));
}

#[test]
fn static_and_singleton_receivers() {
    let mut builder = Builder::new(false);
    let target = Receiver::Static.acquire(&mut builder);
    assert_eq!("clazz", target.to_string());
    assert_eq!(
        "jclass clazz = (jclass)luaJniTakeObject(env, classInfo->id);",
        builder.stmts[0].to_string()
    );

    let mut builder = Builder::new(false);
    Receiver::Singleton.acquire(&mut builder);
    assert_eq!(
        "jobject obj = luaJniTakeObject(env, classInfo->instanceId);",
        builder.stmts[0].to_string()
    );
    assert_eq!(1, Receiver::Singleton.first_slot());
    assert_eq!(1, builder.release.depth());

    let method = MethodDescriptor::new("max", ty("int"))
        .with_params([param("a", "int"), param("b", "int")])
        .static_method();
    let groups = group_overloads("com.example.MathUtil", [&method]).unwrap();
    let out = render(&trampoline(&groups[0], &Receiver::Static, false));
    assert!(out.contains("lua_gettop(L) == 2 && lua_isinteger(L, 1) && lua_isinteger(L, 2)"));
    assert!(out.contains("jint result = (*env)->CallStaticIntMethod(env, clazz, classInfo->mid_max, p_a, p_b);"));
}

#[test]
fn constructor_wraps_or_yields_nil() {
    let mut class = ClassDescriptor::new("com.example.Outer$Point");
    class.constructors.push(MethodDescriptor::constructor([]));
    class
        .constructors
        .push(MethodDescriptor::constructor([param("x", "int"), param("y", "int")]));
    let ctors = overload::number_constructors(&class.name, &class.constructors).unwrap();

    let func = constructor_call(&class, &ctors, false);
    assert_exceptions_bridged(&func.body);
    assert_released(&func.body, &["clazz"], Vec::new());

    let out = render(&func);
    assert!(out.contains("obj = (*env)->NewObject(env, clazz, classInfo->ctor);"));
    assert!(out.contains("obj = (*env)->NewObject(env, clazz, classInfo->ctor_1, p_x, p_y);"));
    assert!(out.contains("\"Point: no matching overload\""));
    assert!(out.contains("luaL_setmetatable(L, \"com.example.Outer$Point\");"));
    assert!(out.contains("} else {\n    lua_pushnil(L);\n  }"));
}

#[test]
fn injection_builds_the_metatable_once() {
    let mut class = point_class();
    class.constructors.push(MethodDescriptor::constructor([]));
    class.functions.push(
        MethodDescriptor::new("parse", ty("com.example.Point"))
            .with_params([param("text", "java.lang.String")])
            .static_method(),
    );
    let ctors = overload::number_constructors(&class.name, &class.constructors).unwrap();

    let func = inject_class(&class, &ctors, false);
    let guarded = func
        .body
        .iter()
        .find_map(|stmt| match stmt {
            Statement::IfCond { cond, then_branch, .. } if cond.to_string().starts_with("luaL_newmetatable") => {
                Some(then_branch)
            }
            _ => None,
        })
        .unwrap();

    let guarded: Vec<_> = guarded.iter().map(|stmt| stmt.to_string()).collect();
    assert_eq!(
        "luaL_Reg meta[] = {{\"__index\", _indexMethod}, {\"__newindex\", _newIndexMethod}, {\"__gc\", luaJniJavaObjectGc}, {NULL, NULL}};",
        guarded[0]
    );
    assert_eq!("luaL_setfuncs(L, meta, 1);", guarded[2]);

    // globals are rebound on every call, outside the guard
    let top_level: Vec<_> = func.body.iter().map(|stmt| stmt.to_string()).collect();
    assert!(top_level.contains(&"lua_pop(L, 1);".to_string()));
    assert!(top_level.contains(&"lua_pushcclosure(L, constructor_call, 1);".to_string()));
    assert!(top_level.contains(&"lua_setglobal(L, \"Point\");".to_string()));
    assert!(top_level.contains(&"lua_pushcclosure(L, method_parse, 1);".to_string()));
    assert!(top_level.contains(&"lua_setglobal(L, \"parse\");".to_string()));

    let out = render(&func);
    assert!(out.starts_with("static int inject_com_example_Point(lua_State* L, JNIEnv* env, void* userData) {"));
}

#[test]
fn auto_registered_class_binds_an_instance() {
    let mut class = ClassDescriptor::new("com.example.Console");
    class.auto_register = true;

    let func = inject_class(&class, &[], false);
    assert_exceptions_bridged(&func.body);
    assert_released(&func.body, &["clazz"], Vec::new());

    let out = render(&func);
    assert!(out.contains("jobject obj = (*env)->NewObject(env, clazz, classInfo->ctor_default);"));
    assert!(out.contains("lua_setglobal(L, \"Console\");"));
    assert!(!out.contains("constructor_call"));
}

#[test]
fn enum_injection_builds_a_table() {
    let enum_desc = EnumDescriptor {
        name: "com.example.Color".to_string(),
        alias: Some("Colors".to_string()),
        constants: vec![
            bind_ir::EnumConstant {
                name: "RED".to_string(),
                value: 0,
            },
            bind_ir::EnumConstant {
                name: "GREEN".to_string(),
                value: 1,
            },
        ],
    };

    let out = render(&inject_enum(&enum_desc));
    let expected = [
        "lua_createtable(L, 0, 2);",
        "lua_pushinteger(L, 0);",
        "lua_setfield(L, -2, \"RED\");",
        "lua_pushinteger(L, 1);",
        "lua_setfield(L, -2, \"GREEN\");",
        "lua_setglobal(L, \"Colors\");",
        "return 0;",
    ];
    let mut at = 0;
    for line in expected {
        at += out[at..].find(line).unwrap_or_else(|| panic!("missing `{}` in\n{}", line, out));
    }
}

#[test]
fn environment_injection_binds_static_values() {
    let env = EnvironmentDescriptor {
        name: "com.example.Env".to_string(),
        fields: vec![
            FieldDescriptor::new("VERSION", ty("java.lang.String")).static_field(),
            FieldDescriptor::new("DEBUG", ty("boolean")).static_field(),
        ],
    };

    let func = inject_environment(&env, false);
    assert_released(&func.body, &["clazz"], Vec::new());

    let out = render(&func);
    assert!(out.contains("if (luaJniPushStaticStringField(L, env, clazz, classInfo->fid_VERSION) == 0) {"));
    assert!(out.contains("lua_setglobal(L, \"VERSION\");"));
    assert!(out.contains("if (luaJniPushStaticBooleanField(L, env, clazz, classInfo->fid_DEBUG) == 0) {"));
}
