//! Entity trait: identity + continuity across state changes.

use uuid::Uuid;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier, convertible to and from its UUID.
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug + Into<Uuid> + From<Uuid>;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
