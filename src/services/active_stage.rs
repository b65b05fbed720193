//! Active-stage selection
//!
//! At most one row is flagged as the patient's current location. Each
//! policy nominates a single candidate; the candidate is active only while
//! its occupancy is still open.

use crate::domain::catalog::StageDescriptor;
use crate::domain::types::ProgressRow;
use crate::services::occupancy::Occupancy;

/// A stage together with the occupancy reconstructed for it
#[derive(Debug, Clone)]
pub struct StageVisit<'a> {
    pub stage: &'a StageDescriptor,
    pub occupancy: Occupancy,
}

/// Rule used to nominate the active candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveRule {
    /// The most recently started visit (last row)
    MostRecentVisit,
    /// The touched stage with the highest ordinal
    FurthestTouchedStage,
}

impl ActiveRule {
    pub fn candidate(&self, visits: &[StageVisit<'_>]) -> Option<usize> {
        match self {
            ActiveRule::MostRecentVisit => visits.len().checked_sub(1),
            ActiveRule::FurthestTouchedStage => visits
                .iter()
                .enumerate()
                .filter(|(_, visit)| visit.occupancy.touched())
                .max_by_key(|(_, visit)| visit.stage.ordinal())
                .map(|(idx, _)| idx),
        }
    }
}

/// Turn visits into display rows, flagging the active one
pub fn select_active(visits: Vec<StageVisit<'_>>, rule: ActiveRule) -> Vec<ProgressRow> {
    let active = rule.candidate(&visits).filter(|&idx| visits[idx].occupancy.is_open());

    visits
        .into_iter()
        .enumerate()
        .map(|(idx, visit)| ProgressRow {
            display_name: visit.stage.display_name().to_string(),
            entry_time: visit.occupancy.entered_at(),
            exit_time: visit.occupancy.exited_at(),
            active: active == Some(idx),
        })
        .collect()
}
