//! Inventory domain module (company stock items).
//!
//! Business rules for items, implemented as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod item;

pub use item::{Item, ItemId, NewItem};
