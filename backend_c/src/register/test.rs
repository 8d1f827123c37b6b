use super::*;
use bind_ir::ParameterDescriptor;
use bind_ir::TypeDescriptor;

fn ty(s: &str) -> TypeDescriptor {
    s.parse().unwrap()
}

fn point_registration() -> Registration {
    let mut registration = Registration::new("com.example.Point", "com_example_Point");
    registration.lookup(IdLookup::field(&FieldDescriptor::new("x", ty("int"))));
    registration.lookup(IdLookup::field(
        &FieldDescriptor::new("ORIGIN", ty("com.example.Point")).static_field(),
    ));
    registration.lookup(IdLookup::method(
        &MethodDescriptor::new("scale", ty("com.example.Point"))
            .with_params([ParameterDescriptor::new("factor", ty("double"))]),
    ));
    registration.lookup(IdLookup::constructor(&MethodDescriptor::constructor([
        ParameterDescriptor::new("x", ty("int")),
        ParameterDescriptor::new("y", ty("int")),
    ])));
    registration
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn lookups_resolve_against_the_class() {
    let out = point_registration().register_fn().to_string();

    assert!(out.contains("classInfo->fid_x = (*env)->GetFieldID(env, clazz, \"x\", \"I\");"));
    assert!(out.contains(
        "classInfo->fid_ORIGIN = (*env)->GetStaticFieldID(env, clazz, \"ORIGIN\", \"Lcom/example/Point;\");"
    ));
    assert!(out.contains(
        "classInfo->mid_scale = (*env)->GetMethodID(env, clazz, \"scale\", \"(D)Lcom/example/Point;\");"
    ));
    assert!(out.contains("classInfo->ctor = (*env)->GetMethodID(env, clazz, \"<init>\", \"(II)V\");"));
}

#[test]
fn duplicate_slots_are_looked_up_once() {
    let mut registration = point_registration();
    let before = registration.lookups.len();
    registration.lookup(IdLookup::field(&FieldDescriptor::new("x", ty("int"))));
    assert_eq!(before, registration.lookups.len());

    registration.lookup(IdLookup::default_constructor());
    registration.lookup(IdLookup::default_constructor());
    assert_eq!(before + 1, registration.lookups.len());
}

#[test]
fn class_info_layout() {
    let def = point_registration().class_info().unwrap();
    let out = def.to_string();

    let name = out.find("const char* name;").unwrap();
    let id = out.find("int64_t id;").unwrap();
    let fid = out.find("jfieldID fid_x;").unwrap();
    let ctor = out.find("jmethodID ctor;").unwrap();
    assert!(name < id && id < fid && fid < ctor);
    assert!(out.contains("jmethodID mid_scale;"));
    assert!(!out.contains("instanceId"));
}

#[test]
fn register_and_unregister_pair_up() {
    let registration = point_registration();
    let register = registration.register_fn().to_string();
    let unregister = registration.unregister_fn().to_string();

    assert!(register.starts_with("int register_com_example_Point(JNIEnv* env) {"));
    assert!(unregister.starts_with("int unregister_com_example_Point(JNIEnv* env) {"));

    assert_eq!(1, count(&register, "luaJniCacheObject("));
    assert_eq!(1, count(&unregister, "luaJniReleaseObject("));
    assert!(register.contains("classInfo->id = luaJniCacheObject(env, clazz);"));
    assert!(unregister.contains("luaJniReleaseObject(env, classInfo->id);"));

    assert!(register.contains("luaJniRegister(\"com.example.Point\", inject_com_example_Point, classInfo);"));
    assert!(unregister.contains(
        "ClassInfo* classInfo = (ClassInfo*)luaJniUnregister(\"com.example.Point\");"
    ));

    // the local class ref is dropped once cached
    let cached = register.find("luaJniCacheObject(env, clazz)").unwrap();
    let dropped = register.find("(*env)->DeleteLocalRef(env, clazz);").unwrap();
    let published = register.find("luaJniRegister(").unwrap();
    assert!(cached < dropped && dropped < published);
    assert!(register.trim_end().ends_with("return 1;\n}"));
}

#[test]
fn failed_registration_frees_the_block() {
    let out = point_registration().register_fn().to_string();

    assert!(out.contains("ClassInfo* classInfo = (ClassInfo*)malloc(sizeof(ClassInfo));"));
    assert!(out.contains("if (classInfo == NULL) {\n    return 0;\n  }"));
    assert!(out.contains("jclass clazz = (*env)->FindClass(env, \"com/example/Point\");"));
    assert!(out.contains("if (clazz == NULL) {\n    free(classInfo);\n    return 0;\n  }"));

    let find = out.find("FindClass").unwrap();
    let first_lookup = out.find("GetFieldID").unwrap();
    assert!(find < first_lookup);
}

#[test]
fn unregistering_twice_is_harmless() {
    let out = point_registration().unregister_fn().to_string();

    let guard = out.find("if (classInfo != NULL) {").unwrap();
    let release = out.find("luaJniReleaseObject(env, classInfo->id);").unwrap();
    let free = out.find("free(classInfo);").unwrap();
    assert!(guard < release && release < free);
    assert!(out.trim_end().ends_with("return 1;\n}"));
}

#[test]
fn singleton_caches_its_instance() {
    let mut registration = Registration::new("com.example.Clock", "com_example_Clock");
    registration.singleton = true;

    let def = registration.class_info().unwrap().to_string();
    assert!(def.contains("int64_t instanceId;"));

    let register = registration.register_fn().to_string();
    assert!(register.contains(
        "jfieldID instanceFieldId = (*env)->GetStaticFieldID(env, clazz, \"INSTANCE\", \"Lcom/example/Clock;\");"
    ));
    assert!(register.contains("jobject instance = (*env)->GetStaticObjectField(env, clazz, instanceFieldId);"));
    assert!(register.contains("classInfo->instanceId = luaJniCacheObject(env, instance);"));
    assert!(register.contains("(*env)->DeleteLocalRef(env, instance);"));
    assert_eq!(2, count(&register, "luaJniCacheObject("));

    let unregister = registration.unregister_fn().to_string();
    let instance = unregister.find("luaJniReleaseObject(env, classInfo->instanceId);").unwrap();
    let class = unregister.find("luaJniReleaseObject(env, classInfo->id);").unwrap();
    assert!(instance < class);
}

#[test]
fn blockless_units_publish_null() {
    let registration = Registration::blockless("com.example.Color", "com_example_Color");
    assert!(registration.class_info().is_none());

    let register = registration.register_fn().to_string();
    assert_eq!(
        "int register_com_example_Color(JNIEnv* env) {\n  luaJniRegister(\"com.example.Color\", inject_com_example_Color, NULL);\n  return 1;\n}",
        register
    );

    let unregister = registration.unregister_fn().to_string();
    assert_eq!(
        "int unregister_com_example_Color(JNIEnv* env) {\n  luaJniUnregister(\"com.example.Color\");\n  return 1;\n}",
        unregister
    );
}
