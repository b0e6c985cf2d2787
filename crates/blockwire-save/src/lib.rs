//! Blockwire Save -- versioned persistence for block circuits.
//!
//! A save is a JSON document `{ version, blocks: [...] }`. Loading reads the
//! version, refuses data newer than this build, runs every migration step
//! above the stored version, and decodes the result into the current shape.
//! Placing that document into a circuit is atomic.
//!
//! ```rust,ignore
//! let doc = blockwire_save::parse(&text)?;
//! let placed = blockwire_save::place(&doc, &mut circuit, &mut world)?;
//! ```

pub mod document;
pub mod migration;
pub mod serializer;
mod steps;

pub use document::{PersistedConfig, SaveDocument, SerializedBlock};
pub use migration::{CURRENT_VERSION, MigrationChain, MigrationError};
pub use serializer::{LoadError, load, parse, place, save, to_pretty_json, upgrade, version_of};
