//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `event_store` - Persisted scan log (JSONL) and in-memory source
//! - `notification` - Branch and queue banners from a JSON file
//! - `http` - Board HTTP API (hyper)
//! - `prometheus` - Prometheus text exposition of request metrics

pub mod event_store;
pub mod http;
pub mod notification;
pub mod prometheus;

// Re-export commonly used types
pub use event_store::{EventSource, JsonlEventStore, MemoryEventStore, ScanQuery};
pub use http::{start_board_server, BoardState};
pub use notification::NotificationBoard;
