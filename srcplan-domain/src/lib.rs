//! Domain logic over install-plan values.
//!
//! Everything here is a pure transform of `srcplan-types` values. Fetching,
//! building and scheduling belong to the caller; this crate supplies the
//! dependency edges and the bookkeeping that decides what may still be built.

mod finalize;
mod graph;
mod ledger;
mod stanzas;

pub use finalize::{ConfigurationError, FinalizeError, check_configuration, finalize_dependencies};
pub use graph::{DependencyGraph, GraphError};
pub use ledger::{LedgerError, LedgerSummary, OutcomeLedger};
pub use stanzas::enable_stanzas;
