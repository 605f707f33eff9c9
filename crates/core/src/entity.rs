//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Every record kept by a repository is an entity: it is looked up, updated and
/// deleted by its identifier.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display + Send + Sync;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Human-readable entity kind, used in error messages and logs.
    fn kind() -> &'static str;
}
