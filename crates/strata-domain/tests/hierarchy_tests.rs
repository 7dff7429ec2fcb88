use super::*;

fn sample() -> Hierarchy {
    let mut b = HierarchyBuilder::new();
    b.add_interface("IBase", &[]).unwrap();
    b.add_interface("IA", &["IBase"]).unwrap();
    b.add_class("Base", None, &[], false).unwrap();
    b.add_class("A", Some("Base"), &["IA"], false).unwrap();
    b.add_class("AA", Some("A"), &[], true).unwrap();
    b.add_class("B", Some("Base"), &[], false).unwrap();
    b.add_class("Lone", None, &[], false).unwrap();
    b.add_record("RBase", None, false).unwrap();
    b.add_record("R", Some("RBase"), true).unwrap();
    b.build()
}

#[test]
fn resolution_and_identity() {
    let h = sample();
    let a1 = h.resolve_class("A").unwrap();
    let a2 = h.resolve_class("A").unwrap();
    assert!(a1.same(&a2));
    assert_eq!(a1, a2);
    assert!(h.resolve_class("Nope").is_none());
    assert_eq!(a1.name().as_str(), "A");
}

#[test]
fn awaitable_is_always_present() {
    let h = sample();
    let aw = h.awaitable_class();
    assert_eq!(aw.name().as_str(), AWAITABLE);
    assert!(h.resolve_class(AWAITABLE).unwrap().same(&aw));
}

#[test]
fn subtype_walks_parents_and_interfaces() {
    let h = sample();
    let base = h.resolve_class("Base").unwrap();
    let a = h.resolve_class("A").unwrap();
    let aa = h.resolve_class("AA").unwrap();
    let ia = h.resolve_class("IA").unwrap();
    let ibase = h.resolve_class("IBase").unwrap();
    let b = h.resolve_class("B").unwrap();

    assert!(aa.subtype_of(&a));
    assert!(aa.subtype_of(&base));
    assert!(aa.subtype_of(&ia));
    assert!(aa.subtype_of(&ibase));
    assert!(a.subtype_of(&ia));
    assert!(!base.subtype_of(&a));
    assert!(!b.subtype_of(&ia));
    assert!(ia.subtype_of(&ibase));
}

#[test]
fn common_ancestor_uses_class_chains() {
    let h = sample();
    let base = h.resolve_class("Base").unwrap();
    let a = h.resolve_class("A").unwrap();
    let aa = h.resolve_class("AA").unwrap();
    let b = h.resolve_class("B").unwrap();
    let lone = h.resolve_class("Lone").unwrap();

    assert_eq!(a.common_ancestor(&b), Some(base.clone()));
    assert_eq!(b.common_ancestor(&a), Some(base.clone()));
    assert_eq!(aa.common_ancestor(&base), Some(base.clone()));
    assert_eq!(aa.common_ancestor(&a), Some(a.clone()));
    assert_eq!(a.common_ancestor(&lone), None);
}

#[test]
fn interface_and_override_flags() {
    let h = sample();
    assert!(h.resolve_class("IA").unwrap().could_be_interface());
    assert!(!h.resolve_class("A").unwrap().could_be_interface());
    assert!(h.resolve_class("AA").unwrap().no_override());
    assert!(!h.resolve_class("A").unwrap().no_override());
}

#[test]
fn records_resolve_with_finality() {
    let h = sample();
    let rb = h.resolve_record("RBase").unwrap();
    let r = h.resolve_record("R").unwrap();
    assert!(r.subtype_of(&rb));
    assert!(!rb.subtype_of(&r));
    assert!(r.is_final());
    assert!(!rb.is_final());
    assert_eq!(r.common_ancestor(&rb), Some(rb.clone()));
}

#[test]
fn builder_rejects_malformed_declarations() {
    let mut b = HierarchyBuilder::new();
    b.add_class("X", None, &[], false).unwrap();
    assert!(matches!(
        b.add_class("X", None, &[], false),
        Err(HierarchyError::DuplicateName(_))
    ));
    assert!(matches!(
        b.add_class("Y", Some("Missing"), &[], false),
        Err(HierarchyError::UnknownParent { .. })
    ));
    assert!(matches!(
        b.add_class("Y", None, &["Missing"], false),
        Err(HierarchyError::UnknownInterface { .. })
    ));
    assert!(matches!(
        b.add_class("Y", None, &["X"], false),
        Err(HierarchyError::NotAnInterface { .. })
    ));
    b.add_interface("I", &[]).unwrap();
    assert!(matches!(
        b.add_class("Y", Some("I"), &[], false),
        Err(HierarchyError::ParentNotClass { .. })
    ));
    b.add_record("R", None, false).unwrap();
    assert!(matches!(
        b.add_record("S", Some("Q"), false),
        Err(HierarchyError::UnknownParent { .. })
    ));
}
