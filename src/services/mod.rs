//! Services - the progress-reconstruction engine
//!
//! This module turns raw scans into status-board rows:
//! - `log_filter` - Matches scans to a pathway's stages and orders them by time
//! - `occupancy` - Open/close state machine shared by both policies
//! - `chronological` - One row per contiguous visit (revisits allowed)
//! - `fixed_template` - One row per configured stage, in ordinal order
//! - `active_stage` - Picks the single row flagged as the current location
//! - `progress` - Policy dispatch entry point

pub mod active_stage;
pub mod chronological;
pub mod fixed_template;
pub mod log_filter;
pub mod occupancy;
pub mod progress;

#[cfg(test)]
mod fixtures;

// Re-export commonly used types
pub use occupancy::Occupancy;
pub use progress::reconstruct;
