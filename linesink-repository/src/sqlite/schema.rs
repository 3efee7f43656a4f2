//! Table definitions for the record store.
//!
//! `file_lines` holds the business records, `partition_offsets` the
//! per-partition checkpoints. The consumer relies on both existing and on
//! the `(source, line)` and `partition_id` primary keys for its upserts.

pub(crate) const CREATE_FILE_LINES: &str = "\
CREATE TABLE IF NOT EXISTS file_lines (
    source TEXT NOT NULL,
    line INTEGER NOT NULL,
    length INTEGER NOT NULL,
    PRIMARY KEY (source, line)
)";

pub(crate) const CREATE_PARTITION_OFFSETS: &str = "\
CREATE TABLE IF NOT EXISTS partition_offsets (
    partition_id INTEGER NOT NULL PRIMARY KEY,
    last_offset INTEGER NOT NULL
)";

pub(crate) const DROP_FILE_LINES: &str = "DROP TABLE IF EXISTS file_lines";

pub(crate) const DROP_PARTITION_OFFSETS: &str = "DROP TABLE IF EXISTS partition_offsets";
