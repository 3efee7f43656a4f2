//! # Linesink Shared
//!
//! Shared types and data structures for the linesink system: the line
//! record and checkpoint entities stored by the repository, and the
//! structured payload codec used on the log boundary.

pub mod payload;
pub mod record;

pub use payload::{LinePayload, PayloadError};
pub use record::{LineRecord, PartitionCheckpoint};
