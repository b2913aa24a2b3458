//! # Event subscribers.
//!
//! ```text
//! Master/Workers ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                              │
//!                                                    ┌─────────┼─────────┐
//!                                                    ▼         ▼         ▼
//!                                                LogWriter  Metrics   Custom
//! ```
//!
//! - [`Subscribe`] extension trait
//! - [`SubscriberSet`] per-subscriber queues and workers
//! - [`LogWriter`] renders events through `tracing`

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
