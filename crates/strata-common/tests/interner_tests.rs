use super::*;

#[test]
fn interning_is_idempotent() {
    let a = Atom::new("Widget");
    let b = Atom::new("Widget");
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "Widget");
}

#[test]
fn distinct_strings_get_distinct_atoms() {
    let a = Atom::new("alpha");
    let b = Atom::new("beta");
    assert_ne!(a, b);
    assert_eq!(a.as_str(), "alpha");
    assert_eq!(b.as_str(), "beta");
}

#[test]
fn empty_string_is_atom_zero() {
    assert_eq!(Atom::new(""), Atom::EMPTY);
    assert!(Atom::new("").is_empty());
    assert_eq!(Atom::EMPTY.as_str(), "");
}

#[test]
fn common_strings_are_preseeded() {
    assert_eq!(Atom::new("Awaitable").as_str(), "Awaitable");
}

#[test]
fn atoms_survive_concurrent_interning() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let s = format!("name{}", i % 2);
                Atom::new(&s)
            })
        })
        .collect();
    let atoms: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for pair in atoms.chunks(2) {
        assert_eq!(pair[0].as_str(), pair[0].as_str());
    }
    assert_eq!(Atom::new("name0"), Atom::new("name0"));
}
