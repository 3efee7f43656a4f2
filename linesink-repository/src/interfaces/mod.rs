//! Store boundary traits.

mod record_store;

pub use record_store::{ApplyOutcome, RecordStore};
