//! Catalog synchronization
//!
//! - `key`: reconciliation key derivation
//! - `phase`: the phases a run moves through
//! - `engine`: the crawl, extract and reconcile pipeline
//! - `report`: what a run reports back

mod engine;
mod key;
mod phase;
mod report;

pub use engine::SyncEngine;
pub use key::{derive_key, has_prefix, parse_key};
pub use phase::SyncPhase;
pub use report::{ItemSummary, SyncReport};
