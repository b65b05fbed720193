//! Chronological visit reconstruction
//!
//! Used for open-ended pathways where a patient may return to a stage.
//! The time-ordered scans are split into runs of consecutive scans at the
//! same stage, and every run becomes its own row.

use crate::domain::catalog::Pathway;
use crate::domain::types::{ProgressRow, ScanEvent};
use crate::services::active_stage::{select_active, ActiveRule, StageVisit};
use crate::services::log_filter::{filter_scans, MatchedScan};
use crate::services::occupancy::Occupancy;
use tracing::debug;

/// One row per contiguous same-stage run, in run-start order
pub fn reconstruct(events: &[ScanEvent], pathway: &Pathway) -> Vec<ProgressRow> {
    let matched = filter_scans(events, pathway);
    let visits = visits(&matched, pathway);

    debug!(
        pathway = %pathway.code(),
        scans = %events.len(),
        matched = %matched.len(),
        runs = %visits.len(),
        "chronological_reconstructed"
    );

    select_active(visits, ActiveRule::MostRecentVisit)
}

fn visits<'a>(matched: &[MatchedScan], pathway: &'a Pathway) -> Vec<StageVisit<'a>> {
    matched
        .chunk_by(|a, b| a.stage == b.stage)
        .map(|run| StageVisit {
            stage: &pathway.stages()[run[0].stage],
            occupancy: Occupancy::from_scans(run.iter().map(|scan| (scan.kind, scan.at))),
        })
        .collect()
}
