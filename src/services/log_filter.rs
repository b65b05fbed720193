//! Log filter - keeps only scans that belong to a pathway's stages
//!
//! Matched scans are tagged with their stage index and ordered by time.
//! Scans sharing a timestamp keep their input order, which the open/close
//! pairing downstream depends on.

use crate::domain::catalog::Pathway;
use crate::domain::types::{ScanEvent, ScanKind};
use chrono::NaiveDateTime;
use tracing::trace;

/// A scan that matched one of the pathway's stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchedScan {
    /// Index into `Pathway::stages()`
    pub stage: usize,
    pub at: NaiveDateTime,
    pub kind: ScanKind,
}

/// Match scans against the pathway's location codes and sort them by time.
///
/// The caller's slice is left untouched; sorting happens on a private copy.
pub fn filter_scans(events: &[ScanEvent], pathway: &Pathway) -> Vec<MatchedScan> {
    let mut matched: Vec<MatchedScan> = events
        .iter()
        .filter_map(|event| match pathway.stage_index(&event.location_code) {
            Some(stage) => Some(MatchedScan { stage, at: event.timestamp, kind: event.kind }),
            None => {
                trace!(code = %event.location_code, pathway = %pathway.code(), "scan_unmatched");
                None
            }
        })
        .collect();

    // Stable: ties keep input order
    matched.sort_by_key(|scan| scan.at);
    matched
}
