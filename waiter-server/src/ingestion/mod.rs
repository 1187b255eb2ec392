//! Order ingestion
//!
//! Converts the external store's changing record set into an ordered,
//! deduplicated stream of dispatch events.

mod poller;
mod processed;

pub use poller::{OrderIngestionPoller, PollerConfig, TickOutcome};
pub use processed::ProcessedSet;
