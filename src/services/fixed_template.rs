//! Fixed-template reconstruction
//!
//! Used for pathways with a known, bounded sequence of stages. Every
//! configured stage gets exactly one row in ordinal order, built from all
//! of that stage's scans no matter how they interleave with other stages.
//! The active stage is the furthest stage reached, not the latest in time,
//! so a late scan at an earlier stage leaves the highlight where it is.

use crate::domain::catalog::Pathway;
use crate::domain::types::{ProgressRow, ScanEvent};
use crate::services::active_stage::{select_active, ActiveRule, StageVisit};
use crate::services::log_filter::filter_scans;
use crate::services::occupancy::Occupancy;
use tracing::debug;

/// One row per configured stage, or no rows when nothing matched at all
pub fn reconstruct(events: &[ScanEvent], pathway: &Pathway) -> Vec<ProgressRow> {
    let matched = filter_scans(events, pathway);
    if matched.is_empty() {
        debug!(pathway = %pathway.code(), scans = %events.len(), "fixed_template_no_match");
        return Vec::new();
    }

    // `matched` is already time-ordered and stable, so each per-stage
    // subsequence is too
    let visits: Vec<StageVisit<'_>> = pathway
        .stages()
        .iter()
        .enumerate()
        .map(|(idx, stage)| StageVisit {
            stage,
            occupancy: Occupancy::from_scans(
                matched.iter().filter(|scan| scan.stage == idx).map(|scan| (scan.kind, scan.at)),
            ),
        })
        .collect();

    debug!(
        pathway = %pathway.code(),
        scans = %events.len(),
        matched = %matched.len(),
        stages = %visits.len(),
        "fixed_template_reconstructed"
    );

    select_active(visits, ActiveRule::FurthestTouchedStage)
}
