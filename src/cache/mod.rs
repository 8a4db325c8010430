//! Cache Module
//!
//! Namespaced JSON cache façade with prefix invalidation.

mod facade;
mod keyspace;
mod stats;


// Re-export public types
pub use facade::KeyValueCache;
pub use keyspace::KeySpace;
pub use stats::CacheStats;

// == Public Constants ==
/// Separator between the namespace and caller keys
pub const NAMESPACE_SEPARATOR: char = ':';
