//! String interner for identifier and literal deduplication.
//!
//! Strings are interned into a global pool and passed around as u32 indices
//! (`Atom`s). Comparisons become integer comparisons instead of string
//! comparisons, and every consumer of a name (class identities, map keys,
//! literal string values) stores four bytes rather than an allocation.
//!
//! The pool is append-only: interned strings live for the life of the
//! process, so `as_str` can hand out `&'static str` without bookkeeping.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use rustc_hash::FxBuildHasher;
use std::sync::RwLock;

/// An interned string identifier.
///
/// Atoms are cheap to copy (just a u32) and can be compared with `==` in
/// O(1). To get the actual string, use [`Atom::as_str`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Atom(pub u32);

impl Atom {
    /// The empty string, always atom zero.
    pub const EMPTY: Atom = Atom(0);

    /// Intern `s`, returning its atom.
    pub fn new(s: &str) -> Atom {
        POOL.intern(s)
    }

    /// The string this atom names.
    pub fn as_str(self) -> &'static str {
        POOL.resolve(self)
    }

    /// Check for the empty-string atom.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw index value.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strings interned at startup so hot-path names never hit the slow path.
const COMMON_STRINGS: &[&str] = &[
    "",
    "Awaitable",
    "this",
    "parent",
    "self",
    "static",
    "class",
    "key",
    "value",
];

struct Pool {
    map: DashMap<&'static str, Atom, FxBuildHasher>,
    strings: RwLock<Vec<&'static str>>,
}

static POOL: Lazy<Pool> = Lazy::new(|| {
    let pool = Pool {
        map: DashMap::default(),
        strings: RwLock::new(Vec::with_capacity(256)),
    };
    for s in COMMON_STRINGS {
        pool.intern(s);
    }
    pool
});

impl Pool {
    fn intern(&self, s: &str) -> Atom {
        if let Some(atom) = self.map.get(s) {
            return *atom;
        }
        let mut strings = self.strings.write().expect("interner pool poisoned");
        // Re-check under the write lock so two racing interns agree.
        if let Some(atom) = self.map.get(s) {
            return *atom;
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let atom = Atom(u32::try_from(strings.len()).expect("interner pool overflow"));
        strings.push(leaked);
        self.map.insert(leaked, atom);
        atom
    }

    fn resolve(&self, atom: Atom) -> &'static str {
        let strings = self.strings.read().expect("interner pool poisoned");
        strings
            .get(atom.0 as usize)
            .copied()
            .expect("atom from a foreign interner")
    }
}

#[cfg(test)]
#[path = "../tests/interner_tests.rs"]
mod tests;
