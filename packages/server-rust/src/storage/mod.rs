//! In-memory collaborators for the patch pipeline.
//!
//! - [`PropertyDefinitions`]: field and group declarations (implements both
//!   registry traits)
//! - [`InMemoryPropertyStore`]: approved property values per target

pub mod definitions;
pub mod values;

pub use definitions::{DefinitionsFile, PropertyDefinitions};
pub use values::InMemoryPropertyStore;
