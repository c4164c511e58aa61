//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. `Amount` is the
/// canonical example: two amounts with the same value and currency are the
/// same amount. To "modify" a value object, construct a new one - this keeps
/// sharing across threads safe and state transitions explicit.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
