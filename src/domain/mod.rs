//! Domain models - core clinic types
//!
//! This module contains the canonical data types used throughout the system:
//! - `ScanEvent` - a persisted enter/exit scan at a location
//! - `ProgressRow` - one reconstructed stage occupancy for display
//! - `Pathway` - a reconstruction policy plus its stages
//! - `StageCatalog` - every pathway the board knows about

pub mod catalog;
pub mod types;

// Re-export commonly used types at module level
pub use catalog::{CatalogError, Pathway, ReconstructionPolicy, StageCatalog, StageDescriptor};
pub use types::{ProgressRow, ScanEvent, ScanKind};
