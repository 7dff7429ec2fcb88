//! Raw constructors for test corpora.
//!
//! These bypass the public constructors' choice of bits so tests can place
//! payloads on any compatible bit pattern (a literal int riding alongside
//! boolean bits, map payloads over combined family bits, and so on). Not
//! part of the supported API.

use crate::bits::Trep;
use crate::data::LegacyMark;
use crate::types::Type;

/// Replace the bits of a type, keeping its payload. The caller is
/// responsible for choosing bits the payload supports.
pub fn set_trep(t: Type, bits: Trep) -> Type {
    match t.data {
        None => Type::from_bits(bits),
        Some(d) => Type::with_data(bits, d),
    }
}

/// Stamp a legacy mark on an array payload. No-op on anything else.
pub fn set_mark(mut t: Type, mark: LegacyMark) -> Type {
    if let Some(d) = t.data.as_mut() {
        d.set_mark(mark);
    }
    t
}

/// The mark carried by an array payload, if any.
pub fn get_mark(t: &Type) -> Option<LegacyMark> {
    t.data.as_ref().and_then(|d| d.mark())
}
