//! Service layer for the Paparazzi news terminal
//!
//! Storage (embedded SQLite), the refresh orchestrator, the duplicate
//! sweeper, the content expander and push notification delivery.

pub mod dedup;
pub mod expander;
pub mod push;
pub mod refresh;
pub mod store;

pub use dedup::DedupService;
pub use expander::{ContentExpander, ExpandEvent};
pub use push::{PushService, VapidConfig};
pub use refresh::{RefreshConfig, RefreshService};
pub use store::{NewsStore, StoreError};
