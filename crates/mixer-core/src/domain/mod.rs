//! Domain layer: mixer entities, the value store, and the bootstrap loader.
//!
//! Nothing in this module performs I/O.  The loader decides *which* address
//! to request next, but the caller is the one that actually sends it.

pub mod loader;
pub mod mixer;
pub mod store;
