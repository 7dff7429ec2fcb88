//! Class and record identity, and the injected hierarchy index.
//!
//! The lattice never owns the program's class table. It consumes opaque
//! handles (`ClassRef`, `RecordRef`) resolved through a read-only
//! [`Hierarchy`] built once per analysis pass. Handles compare by name —
//! names are unique within a pass — and carry enough shared structure
//! (parent links, implemented interfaces) to answer ancestry queries
//! without going back to the index.
//!
//! Cycle rejection happens at build time; every query below may assume the
//! inheritance graph is acyclic.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use strata_common::Atom;
use tracing::trace;

/// Name of the builtin awaitable class, registered in every hierarchy.
pub const AWAITABLE: &str = "Awaitable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    Class,
    Interface,
}

#[derive(Debug)]
struct ClassNode {
    name: Atom,
    kind: ClassKind,
    parent: Option<ClassRef>,
    interfaces: Vec<ClassRef>,
    no_override: bool,
}

/// An opaque handle to a resolved class or interface.
#[derive(Clone)]
pub struct ClassRef(Arc<ClassNode>);

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for ClassRef {}

impl std::hash::Hash for ClassRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({})", self.0.name)
    }
}

impl ClassRef {
    pub fn name(&self) -> Atom {
        self.0.name
    }

    pub fn same(&self, other: &ClassRef) -> bool {
        self == other
    }

    /// Whether values typed with this handle might be interface-typed.
    /// Interface membership never pins a runtime layout.
    pub fn could_be_interface(&self) -> bool {
        self.0.kind == ClassKind::Interface
    }

    /// Whether the resolver knows no class overrides this one. The subtype
    /// set of such a class is the singleton {itself}.
    pub fn no_override(&self) -> bool {
        self.0.no_override
    }

    /// True when every instance of `self` is an instance of `other`,
    /// through the parent chain or implemented interfaces.
    pub fn subtype_of(&self, other: &ClassRef) -> bool {
        if self.same(other) {
            return true;
        }
        if self.0.interfaces.iter().any(|i| i.subtype_of(other)) {
            return true;
        }
        match &self.0.parent {
            Some(p) => p.subtype_of(other),
            None => false,
        }
    }

    /// Nearest class both handles descend from, through parent chains only.
    /// Interfaces have no parent chain, so they ancestor only with
    /// themselves.
    pub fn common_ancestor(&self, other: &ClassRef) -> Option<ClassRef> {
        let mut chain = Vec::new();
        let mut cur = Some(self.clone());
        while let Some(c) = cur {
            chain.push(c.clone());
            cur = c.0.parent.clone();
        }
        let mut cand = Some(other.clone());
        while let Some(c) = cand {
            if chain.iter().any(|a| a.same(&c)) {
                return Some(c);
            }
            cand = c.0.parent.clone();
        }
        None
    }

    /// Whether a value could satisfy both handles at once.
    pub fn could_be(&self, other: &ClassRef) -> bool {
        self.subtype_of(other)
            || other.subtype_of(self)
            || self.could_be_interface()
            || other.could_be_interface()
    }
}

#[derive(Debug)]
struct RecordNode {
    name: Atom,
    parent: Option<RecordRef>,
    is_final: bool,
}

/// An opaque handle to a resolved record.
#[derive(Clone)]
pub struct RecordRef(Arc<RecordNode>);

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for RecordRef {}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordRef({})", self.0.name)
    }
}

impl RecordRef {
    pub fn name(&self) -> Atom {
        self.0.name
    }

    pub fn same(&self, other: &RecordRef) -> bool {
        self == other
    }

    /// Final records admit no further derivation; their sub shape and exact
    /// shape coincide.
    pub fn is_final(&self) -> bool {
        self.0.is_final
    }

    pub fn subtype_of(&self, other: &RecordRef) -> bool {
        if self.same(other) {
            return true;
        }
        match &self.0.parent {
            Some(p) => p.subtype_of(other),
            None => false,
        }
    }

    pub fn common_ancestor(&self, other: &RecordRef) -> Option<RecordRef> {
        let mut chain = Vec::new();
        let mut cur = Some(self.clone());
        while let Some(c) = cur {
            chain.push(c.clone());
            cur = c.0.parent.clone();
        }
        let mut cand = Some(other.clone());
        while let Some(c) = cand {
            if chain.iter().any(|a| a.same(&c)) {
                return Some(c);
            }
            cand = c.0.parent.clone();
        }
        None
    }
}

/// Errors reported while registering declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    DuplicateName(Atom),
    UnknownParent { child: Atom, parent: Atom },
    UnknownInterface { child: Atom, interface: Atom },
    ParentNotClass { child: Atom, parent: Atom },
    NotAnInterface { child: Atom, name: Atom },
}

impl fmt::Display for HierarchyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HierarchyError::DuplicateName(n) => write!(f, "duplicate declaration of `{n}`"),
            HierarchyError::UnknownParent { child, parent } => {
                write!(f, "`{child}` extends unknown `{parent}`")
            }
            HierarchyError::UnknownInterface { child, interface } => {
                write!(f, "`{child}` implements unknown `{interface}`")
            }
            HierarchyError::ParentNotClass { child, parent } => {
                write!(f, "`{child}` extends `{parent}`, which is not a class")
            }
            HierarchyError::NotAnInterface { child, name } => {
                write!(f, "`{child}` implements `{name}`, which is not an interface")
            }
        }
    }
}

impl std::error::Error for HierarchyError {}

/// The read-only resolution index the lattice is handed.
///
/// Resolution results are stable for the duration of one analysis pass; the
/// index is queried, never mutated, so shared references are safe across
/// threads.
pub struct Hierarchy {
    classes: FxHashMap<Atom, ClassRef>,
    records: FxHashMap<Atom, RecordRef>,
    awaitable: ClassRef,
}

impl Hierarchy {
    pub fn resolve_class(&self, name: &str) -> Option<ClassRef> {
        self.classes.get(&Atom::new(name)).cloned()
    }

    pub fn resolve_record(&self, name: &str) -> Option<RecordRef> {
        self.records.get(&Atom::new(name)).cloned()
    }

    /// The builtin awaitable class every wait handle is an instance of.
    pub fn awaitable_class(&self) -> ClassRef {
        self.awaitable.clone()
    }
}

/// Accumulates declarations and freezes them into a [`Hierarchy`].
///
/// Parents and interfaces must be declared before their children, which
/// keeps the graph acyclic by construction.
pub struct HierarchyBuilder {
    classes: FxHashMap<Atom, ClassRef>,
    records: FxHashMap<Atom, RecordRef>,
}

impl Default for HierarchyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        let mut b = HierarchyBuilder {
            classes: FxHashMap::default(),
            records: FxHashMap::default(),
        };
        // The awaitable builtin is part of every program.
        b.insert_class(ClassNode {
            name: Atom::new(AWAITABLE),
            kind: ClassKind::Class,
            parent: None,
            interfaces: Vec::new(),
            no_override: false,
        });
        b
    }

    fn insert_class(&mut self, node: ClassNode) -> ClassRef {
        let r = ClassRef(Arc::new(node));
        trace!(name = %r.name(), "hierarchy: register class");
        self.classes.insert(r.name(), r.clone());
        r
    }

    pub fn add_interface(&mut self, name: &str, extends: &[&str]) -> Result<(), HierarchyError> {
        let atom = Atom::new(name);
        if self.classes.contains_key(&atom) {
            return Err(HierarchyError::DuplicateName(atom));
        }
        let mut interfaces = Vec::with_capacity(extends.len());
        for e in extends {
            let r = self.classes.get(&Atom::new(e)).cloned().ok_or_else(|| {
                HierarchyError::UnknownInterface {
                    child: atom,
                    interface: Atom::new(e),
                }
            })?;
            if !r.could_be_interface() {
                return Err(HierarchyError::NotAnInterface {
                    child: atom,
                    name: r.name(),
                });
            }
            interfaces.push(r);
        }
        self.insert_class(ClassNode {
            name: atom,
            kind: ClassKind::Interface,
            parent: None,
            interfaces,
            no_override: false,
        });
        Ok(())
    }

    pub fn add_class(
        &mut self,
        name: &str,
        parent: Option<&str>,
        implements: &[&str],
        no_override: bool,
    ) -> Result<(), HierarchyError> {
        let atom = Atom::new(name);
        if self.classes.contains_key(&atom) {
            return Err(HierarchyError::DuplicateName(atom));
        }
        let parent = match parent {
            None => None,
            Some(p) => {
                let r = self.classes.get(&Atom::new(p)).cloned().ok_or_else(|| {
                    HierarchyError::UnknownParent {
                        child: atom,
                        parent: Atom::new(p),
                    }
                })?;
                if r.could_be_interface() {
                    return Err(HierarchyError::ParentNotClass {
                        child: atom,
                        parent: r.name(),
                    });
                }
                Some(r)
            }
        };
        let mut interfaces = Vec::with_capacity(implements.len());
        for i in implements {
            let r = self.classes.get(&Atom::new(i)).cloned().ok_or_else(|| {
                HierarchyError::UnknownInterface {
                    child: atom,
                    interface: Atom::new(i),
                }
            })?;
            if !r.could_be_interface() {
                return Err(HierarchyError::NotAnInterface {
                    child: atom,
                    name: r.name(),
                });
            }
            interfaces.push(r);
        }
        self.insert_class(ClassNode {
            name: atom,
            kind: ClassKind::Class,
            parent,
            interfaces,
            no_override,
        });
        Ok(())
    }

    pub fn add_record(
        &mut self,
        name: &str,
        parent: Option<&str>,
        is_final: bool,
    ) -> Result<(), HierarchyError> {
        let atom = Atom::new(name);
        if self.records.contains_key(&atom) {
            return Err(HierarchyError::DuplicateName(atom));
        }
        let parent = match parent {
            None => None,
            Some(p) => Some(self.records.get(&Atom::new(p)).cloned().ok_or_else(
                || HierarchyError::UnknownParent {
                    child: atom,
                    parent: Atom::new(p),
                },
            )?),
        };
        let r = RecordRef(Arc::new(RecordNode {
            name: atom,
            parent,
            is_final,
        }));
        trace!(name = %r.name(), "hierarchy: register record");
        self.records.insert(atom, r);
        Ok(())
    }

    pub fn build(self) -> Hierarchy {
        let awaitable = self.classes[&Atom::new(AWAITABLE)].clone();
        Hierarchy {
            classes: self.classes,
            records: self.records,
            awaitable,
        }
    }
}

#[cfg(test)]
#[path = "../tests/hierarchy_tests.rs"]
mod tests;
