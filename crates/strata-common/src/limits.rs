//! Centralized limits and thresholds for the analyzer.
//!
//! Keeping these in one module prevents duplicate definitions with
//! inconsistent values and documents the rationale for each limit.

/// Maximum payload nesting depth the widening union preserves.
///
/// Self-referential array shapes (a dict whose values contain that same
/// dict) would otherwise grow a deeper specialization on every fixpoint
/// iteration and never converge. Once a widening union has descended this
/// many levels into nested array or wait-handle payloads, the inner
/// specialization collapses to its bit-only type, which caps the height of
/// any chain of widened types.
pub const WIDENING_DEPTH: u32 = 8;

/// Elements above which an enumerated map payload is not worth keeping.
///
/// A known-keys map with hundreds of entries costs more to union and
/// intersect than the precision is worth; array algebra degrades such maps
/// to their homogeneous key/value form instead of appending further.
pub const MAX_MAP_ELEMS: usize = 64;

/// Elements above which a packed tuple payload degrades to its homogeneous
/// element form, for the same reason as [`MAX_MAP_ELEMS`].
pub const MAX_PACKED_ELEMS: usize = 64;
