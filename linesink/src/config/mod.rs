//! Configuration and dependency wiring for the batch runner.

mod dependencies;

pub use dependencies::Dependencies;
