//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Products, lots, sales and ledger transactions are entities: two rows with
/// the same id are the same thing even when their quantities or amounts differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
