//! Entity trait: identity + continuity across reads.

/// Entity marker + minimal interface.
///
/// Implemented by `Account` (identity collaborator) and `Statement` (ledger).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
