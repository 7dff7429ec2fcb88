//! Shared infrastructure for the strata analyzer.
//!
//! This crate holds the pieces every other crate in the workspace leans on:
//! the global string interner (identifiers, literal strings, class and record
//! names all become cheap `Atom` handles) and the centralized limits module.

pub mod interner;
pub use interner::Atom;

pub mod limits;
