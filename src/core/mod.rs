//! Name canonicalization, scheduling indices and the locked state store.

/// Contestant name normalization and fuzzy matching.
pub mod canon;
/// Presence and meeting-history indices.
pub mod indices;
/// Lock-guarded, versioned judging state store.
pub mod store;
