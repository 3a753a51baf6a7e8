//! Shared vocabulary for building an install plan from source packages.
//!
//! A solver, a fetcher and a builder all pass these values between each other,
//! so they have to agree on them exactly.
//!
//! # Design constraints
//! - Values are immutable once handed to a build worker.
//! - Serialized forms are plain JSON; keep changes additive.
//! - Synthesized component ids never pass for installed ones, in memory or on disk.

pub mod component;
pub mod configured;
pub mod description;
pub mod identity;
pub mod location;
pub mod outcome;
pub mod ready;
pub mod repo;
pub mod source;
