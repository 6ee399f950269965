//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new one. [`Money`](crate::Money) is the main example
/// in this workspace: `Money::from_cents(100) == Money::from_cents(100)`
/// regardless of where either value came from.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
