//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Orders and assets are entities: two records with the same id are the same
/// physical thing even when every other attribute differs.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
