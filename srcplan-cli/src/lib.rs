//! Library half of the `srcplan` binary: config discovery and merging.

pub mod config;
