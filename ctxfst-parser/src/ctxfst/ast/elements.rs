//! Element types for the CtxFST format
//!
//!     A document is described twice: once by its preamble, which declares chunks and
//!     their metadata, and once by its body, where the chunks actually live. The two
//!     descriptions are parsed independently and reconciled by the validator.
//!
//!     Declared:
//!         What the preamble says about a chunk. See [declared](declared).
//!
//!     Scanned:
//!         What the body contains: an id, its literal content and where it sits.
//!         See [scanned](scanned).
//!
//!     Resolved:
//!         The merge of both, handed to callers and exporters. See [record](record).
//!
//!     Typed preamble values are wrapped in a [Field](field::Field), which keeps "not
//!     given" apart from "given but unusable".

pub mod declared;
pub mod field;
pub mod record;
pub mod scanned;

pub use declared::{ChunkKind, DeclaredChunk, Priority};
pub use field::Field;
pub use record::{ChunkMetadata, ResolvedChunkRecord};
pub use scanned::ScannedChunk;
