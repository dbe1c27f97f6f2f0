//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. A transport code
/// `"railway"` is the same value wherever it appears; a passenger record for
/// `(1995, railway)` carrying the same count is the same record.
///
/// To "modify" a value object, build a new one. Constructors validate, so a
/// value object that exists is always valid.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
