//! Core types for the Paparazzi entertainment news terminal
//!
//! This crate defines the shared data structures used across the terminal:
//! news categories, records produced by the refresh pipeline, push
//! subscriptions, and the common error type.

pub mod category;
pub mod error;
pub mod push;
pub mod record;
pub mod refresh;

pub use category::Category;
pub use error::{PaparazziError, PaparazziResult};
pub use push::{PushPayload, PushSubscription};
pub use record::{NewsDraft, NewsRecord, FALLBACK_IMAGE_URL};
pub use refresh::{CategoryOutcome, RefreshSummary};
