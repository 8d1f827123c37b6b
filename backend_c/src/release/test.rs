use super::*;

fn render(stmts: &[Statement]) -> Vec<String> {
    stmts.iter().map(|stmt| stmt.to_string()).collect()
}

#[test]
fn actions_are_guarded_against_null() {
    let put_back = ReleaseAction::PutBack("p_target".to_string()).to_statement();
    assert_eq!(
        "if (p_target != NULL) {\n  luaJniPutBackObject(env, p_target);\n}",
        put_back.to_string()
    );

    let delete = ReleaseAction::DeleteLocalRef("p_name".to_string()).to_statement();
    assert_eq!(
        "if (p_name != NULL) {\n  (*env)->DeleteLocalRef(env, p_name);\n}",
        delete.to_string()
    );
}

#[test]
fn emits_in_allocation_order() {
    let mut list = ReleaseList::new();
    list.push(ReleaseAction::PutBack("obj".to_string()));
    list.push(ReleaseAction::DeleteLocalRef("p_a".to_string()));
    list.push(ReleaseAction::PutBack("p_b".to_string()));

    let out = render(&list.emit_all());
    assert_eq!(3, out.len());
    assert!(out[0].contains("luaJniPutBackObject(env, obj)"));
    assert!(out[1].contains("DeleteLocalRef(env, p_a)"));
    assert!(out[2].contains("luaJniPutBackObject(env, p_b)"));
}

#[test]
fn emit_from_skips_outer_allocations() {
    let mut list = ReleaseList::new();
    list.push(ReleaseAction::PutBack("obj".to_string()));

    let depth = list.depth();
    list.push(ReleaseAction::PutBack("clazz".to_string()));

    let inner = render(&list.emit_from(depth));
    assert_eq!(1, inner.len());
    assert!(inner[0].contains("clazz"));

    list.truncate(depth);
    assert_eq!(1, list.emit_all().len());
}

#[test]
fn cloned_branches_are_independent() {
    let mut outer = ReleaseList::new();
    outer.push(ReleaseAction::PutBack("obj".to_string()));

    let mut left = outer.clone();
    left.push(ReleaseAction::DeleteLocalRef("p_s".to_string()));

    let right = outer.clone();

    assert_eq!(2, left.depth());
    assert_eq!(1, right.depth());
    assert_eq!(1, outer.depth());
}
