use std::rc::Rc;

use luna::{
    environment::Environment,
    value::{Value, ValueKind},
};

fn number(value: &Value) -> f64 {
    match value.kind() {
        ValueKind::Number(n) => *n,
        _ => panic!("expected number, found {}", value.type_name()),
    }
}

#[test]
fn missing_names_are_undefined() {
    let env = Environment::new();
    let value = Environment::lookup(&env, "nothing");
    assert!(matches!(value.kind(), ValueKind::Undefined));
    assert!(!Environment::has(&env, "nothing"));
}

#[test]
fn lookup_walks_parent_chain() {
    let root = Environment::new();
    root.borrow_mut().declare("x", Value::number(1.0), false);
    let child = Environment::with_parent(Rc::clone(&root));
    let grandchild = Environment::with_parent(Rc::clone(&child));
    assert!(Environment::has(&grandchild, "x"));
    assert_eq!(number(&Environment::lookup(&grandchild, "x")), 1.0);
}

#[test]
fn assign_mutates_nearest_existing_binding() {
    let root = Environment::new();
    root.borrow_mut().declare("x", Value::number(1.0), false);
    let child = Environment::with_parent(Rc::clone(&root));
    Environment::assign(&child, "x", Value::number(5.0));
    assert_eq!(number(&Environment::lookup(&root, "x")), 5.0);
    assert!(child.borrow().local("x").is_none());
}

#[test]
fn assign_declares_locally_when_missing() {
    let root = Environment::new();
    let child = Environment::with_parent(Rc::clone(&root));
    Environment::assign(&child, "fresh", Value::number(2.0));
    assert!(Environment::has(&child, "fresh"));
    assert!(!Environment::has(&root, "fresh"));
}

#[test]
fn constants_ignore_assignment() {
    let root = Environment::new();
    root.borrow_mut().declare("pi", Value::number(3.0), true);
    let child = Environment::with_parent(Rc::clone(&root));
    Environment::assign(&child, "pi", Value::number(4.0));
    assert_eq!(number(&Environment::lookup(&child, "pi")), 3.0);
    assert!(root.borrow().is_constant("pi"));
    assert!(child.borrow().local("pi").is_none());
}

#[test]
fn local_declaration_shadows_parent() {
    let root = Environment::new();
    root.borrow_mut().declare("x", Value::number(1.0), false);
    let child = Environment::with_parent(Rc::clone(&root));
    child.borrow_mut().declare("x", Value::number(2.0), false);
    assert_eq!(number(&Environment::lookup(&child, "x")), 2.0);
    assert_eq!(number(&Environment::lookup(&root, "x")), 1.0);
}

#[test]
fn names_preserve_declaration_order() {
    let env = Environment::new();
    env.borrow_mut().declare("b", Value::null(), false);
    env.borrow_mut().declare("a", Value::null(), false);
    let names: Vec<String> = env.borrow().names().map(str::to_string).collect();
    assert_eq!(names, vec!["b", "a"]);
}
