//! Literal constant values.
//!
//! A `ConstVal` is a fully-known runtime constant: the thing a
//! fully-determined scalar `Type` denotes, and the leaf currency of literal
//! array payloads. String and array constants always refer to the
//! static (uncounted) representation of their content; whether a *type*
//! admits counted copies of that content is tracked in its bits, not here.

use crate::bits::ArrKind;
use std::sync::Arc;
use strata_common::Atom;

/// A literal constant value.
#[derive(Debug, Clone)]
pub enum ConstVal {
    Uninit,
    Null,
    Bool(bool),
    Int(i64),
    Dbl(f64),
    Str(Atom),
    Arr(Arc<ArrConst>),
}

impl PartialEq for ConstVal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstVal::Uninit, ConstVal::Uninit) => true,
            (ConstVal::Null, ConstVal::Null) => true,
            (ConstVal::Bool(a), ConstVal::Bool(b)) => a == b,
            (ConstVal::Int(a), ConstVal::Int(b)) => a == b,
            // Bitwise: NaN compares equal to itself, and +0.0 != -0.0.
            (ConstVal::Dbl(a), ConstVal::Dbl(b)) => a.to_bits() == b.to_bits(),
            (ConstVal::Str(a), ConstVal::Str(b)) => a == b,
            (ConstVal::Arr(a), ConstVal::Arr(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ConstVal {}

impl ConstVal {
    /// True for values the runtime treats as false in a boolean context.
    pub fn is_falsy(&self) -> bool {
        match self {
            ConstVal::Uninit | ConstVal::Null => true,
            ConstVal::Bool(b) => !*b,
            ConstVal::Int(i) => *i == 0,
            ConstVal::Dbl(d) => *d == 0.0,
            ConstVal::Str(s) => s.is_empty(),
            ConstVal::Arr(a) => a.is_empty(),
        }
    }
}

/// A key of a literal array: an int or a (static) string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstKey {
    Int(i64),
    Str(Atom),
}

/// A literal array value: shape family plus ordered entries.
///
/// Vec-shaped families keep their implicit 0..n keys materialized so lookup
/// and iteration read the same for every family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrConst {
    pub kind: ArrKind,
    pub entries: Vec<(ConstKey, ConstVal)>,
}

impl ArrConst {
    /// A vec-family literal from its values.
    pub fn vec(values: Vec<ConstVal>) -> Arc<ArrConst> {
        Self::vec_shaped(ArrKind::Vec, values)
    }

    /// A varray-family literal from its values.
    pub fn varr(values: Vec<ConstVal>) -> Arc<ArrConst> {
        Self::vec_shaped(ArrKind::VArr, values)
    }

    fn vec_shaped(kind: ArrKind, values: Vec<ConstVal>) -> Arc<ArrConst> {
        let entries = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (ConstKey::Int(i as i64), v))
            .collect();
        Arc::new(ArrConst { kind, entries })
    }

    /// A dict-family literal from key/value pairs. Keys must be unique.
    pub fn dict(entries: Vec<(ConstKey, ConstVal)>) -> Arc<ArrConst> {
        Self::keyed(ArrKind::Dict, entries)
    }

    /// A darray-family literal from key/value pairs. Keys must be unique.
    pub fn darr(entries: Vec<(ConstKey, ConstVal)>) -> Arc<ArrConst> {
        Self::keyed(ArrKind::DArr, entries)
    }

    fn keyed(kind: ArrKind, entries: Vec<(ConstKey, ConstVal)>) -> Arc<ArrConst> {
        debug_assert!(
            entries
                .iter()
                .enumerate()
                .all(|(i, (k, _))| entries[..i].iter().all(|(k2, _)| k2 != k)),
            "duplicate key in literal array"
        );
        Arc::new(ArrConst { kind, entries })
    }

    /// A keyset literal: every element is both key and value.
    pub fn keyset(keys: Vec<ConstKey>) -> Arc<ArrConst> {
        let entries = keys
            .into_iter()
            .map(|k| {
                let v = match k {
                    ConstKey::Int(i) => ConstVal::Int(i),
                    ConstKey::Str(s) => ConstVal::Str(s),
                };
                (k, v)
            })
            .collect();
        Arc::new(ArrConst {
            kind: ArrKind::Keyset,
            entries,
        })
    }

    /// The empty literal of a family.
    pub fn empty(kind: ArrKind) -> Arc<ArrConst> {
        Arc::new(ArrConst {
            kind,
            entries: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact-key lookup.
    pub fn lookup(&self, key: ConstKey) -> Option<&ConstVal> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Whether the entries are exactly 0..n int keys in order.
    pub fn is_packed(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(i, (k, _))| *k == ConstKey::Int(i as i64))
    }
}

#[cfg(test)]
#[path = "../tests/scalar_tests.rs"]
mod tests;
