#![allow(missing_docs)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use jsongroup::{marshal, marshal_with_options, ErrorKind, GroupObject, Opaque, Options};

#[derive(GroupObject)]
struct Nested {
    #[jsongroup(json = "value", groups = "public")]
    pub value: usize,
    #[jsongroup(json = "child,omitempty", groups = "public")]
    pub child: Option<Box<Nested>>,
    #[jsongroup(json = "-")]
    pub ignored: String,
}

/// A chain of `len` boxed nodes. Every node costs two levels: the box and the struct.
fn chain(len: usize) -> Box<Nested> {
    let mut node = Box::new(Nested {
        value: len - 1,
        child: None,
        ignored: String::new(),
    });
    for value in (0..len - 1).rev() {
        node = Box::new(Nested {
            value,
            child: Some(node),
            ignored: String::new(),
        });
    }
    node
}

#[derive(GroupObject)]
struct Node {
    #[jsongroup(json = "value", groups = "public")]
    pub value: i32,
    #[jsongroup(json = "next,omitempty", groups = "public")]
    pub next: RefCell<Option<Rc<Node>>>,
    #[jsongroup(json = "prev,omitempty", groups = "public")]
    pub prev: RefCell<Option<Rc<Node>>>,
}

fn node(value: i32) -> Rc<Node> {
    Rc::new(Node {
        value,
        next: RefCell::new(None),
        prev: RefCell::new(None),
    })
}

fn unlink(nodes: &[&Rc<Node>]) {
    for n in nodes {
        n.next.borrow_mut().take();
        n.prev.borrow_mut().take();
    }
}

// --- DEPTH ---

#[test]
fn test_depth_law_default_limit() {
    assert!(marshal(&chain(5), &["public"]).is_ok());
    assert!(marshal(&chain(16), &["public"]).is_ok());

    let err = marshal(&chain(17), &["public"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DepthExceeded);
    assert!(err.path().starts_with("child.child"));
}

#[test]
fn test_depth_law_custom_and_unlimited() {
    let opts = Options::default().with_max_depth(10);
    assert!(marshal_with_options(&chain(5), &opts, &["public"]).is_ok());
    let err = marshal_with_options(&chain(11), &opts, &["public"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DepthExceeded);

    let unlimited = Options::default().with_max_depth(0);
    assert!(marshal_with_options(&chain(50), &unlimited, &["public"]).is_ok());
}

#[test]
fn test_depth_error_message() {
    let opts = Options::default().with_max_depth(2);
    let err = marshal_with_options(&chain(3), &opts, &["public"]).unwrap_err();
    assert_eq!(err.to_string(), "maximum depth of 2 exceeded at path 'child'");
}

#[test]
fn test_chars_are_scalars_for_depth() {
    let opts = Options::default().with_max_depth(2);
    assert_eq!(
        marshal_with_options(&vec![vec!['a']], &opts, &[]).unwrap(),
        br#"[["a"]]"#
    );
    assert_eq!(
        marshal_with_options(&vec![vec![1u8]], &opts, &[]).unwrap(),
        br#"[[1]]"#
    );
}

// --- CYCLES ---

#[test]
fn test_two_node_cycle() {
    let a = node(1);
    let b = node(2);
    *a.next.borrow_mut() = Some(Rc::clone(&b));
    *b.next.borrow_mut() = Some(Rc::clone(&a));

    let err = marshal(&a, &["public"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularReference);
    assert_eq!(err.path(), "next.next");
    match &err {
        jsongroup::JsonGroupError::CircularReference { first_seen, .. } => {
            assert_eq!(first_seen, "")
        }
        other => panic!("unexpected error: {other}"),
    }
    unlink(&[&a, &b]);
}

#[test]
fn test_longer_and_self_cycles() {
    let (a, b, c) = (node(1), node(2), node(3));
    *a.next.borrow_mut() = Some(Rc::clone(&b));
    *b.next.borrow_mut() = Some(Rc::clone(&c));
    *c.next.borrow_mut() = Some(Rc::clone(&a));
    let err = marshal(&a, &["public"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularReference);
    assert_eq!(err.path(), "next.next.next");
    unlink(&[&a, &b, &c]);

    let (a, b) = (node(1), node(2));
    *a.next.borrow_mut() = Some(Rc::clone(&b));
    *b.prev.borrow_mut() = Some(Rc::clone(&a));
    let err = marshal(&a, &["public"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularReference);
    assert_eq!(err.path(), "next.prev");
    unlink(&[&a, &b]);

    let me = node(1);
    *me.next.borrow_mut() = Some(Rc::clone(&me));
    let err = marshal(&me, &["public"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularReference);
    unlink(&[&me]);
}

#[test]
fn test_cycle_path_names_the_fields() {
    #[derive(GroupObject)]
    struct Outer {
        #[jsongroup(json = "name", groups = "public")]
        pub name: String,
        #[jsongroup(json = "data", groups = "public")]
        pub data: Rc<Node>,
    }

    let inner = node(42);
    *inner.next.borrow_mut() = Some(Rc::clone(&inner));
    let outer = Outer {
        name: "test".into(),
        data: Rc::clone(&inner),
    };

    let err = marshal(&outer, &["public"]).unwrap_err();
    assert_eq!(err.path(), "data.next");
    assert!(err.to_string().contains("first seen at 'data'"));
    unlink(&[&inner]);
}

#[test]
fn test_acyclic_chain_is_fine() {
    let (a, b) = (node(1), node(2));
    *a.next.borrow_mut() = Some(Rc::clone(&b));
    let bytes = marshal(&a, &["public"]).unwrap();
    assert_eq!(bytes, br#"{"next":{"value":2},"value":1}"#);
    unlink(&[&a, &b]);
}

// --- BOUNDARY ERRORS ---

#[test]
fn test_unsupported_value() {
    #[derive(GroupObject)]
    struct BadType {
        #[jsongroup(json = "value", groups = "public")]
        pub value: Opaque<HashMap<Vec<u8>, i32>>,
    }

    let bad = BadType {
        value: Opaque(HashMap::from([(vec![1u8], 1)])),
    };
    let err = marshal(&bad, &["public"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedType);
    assert_eq!(err.path(), "value");
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_borrowed_cell_is_a_reflection_error() {
    let a = node(1);
    *a.next.borrow_mut() = Some(node(2));
    let _guard = a.prev.borrow_mut();

    let err = marshal(&a, &["public"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reflection);
    assert_eq!(err.path(), "prev");
}
