//! Progress reconstruction entry point
//!
//! Dispatches on the pathway's policy. The computation is pure: the same
//! scans and pathway always give the same rows, and the scans are never
//! mutated.

use crate::domain::catalog::{Pathway, ReconstructionPolicy};
use crate::domain::types::{ProgressRow, ScanEvent};
use crate::services::{chronological, fixed_template};

/// Reconstruct the status-board rows for one patient on one pathway.
///
/// An empty result means the pathway has no data for this patient, which
/// is distinct from a templated list whose stages are all blank.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use patient_flow_board::domain::{Pathway, ReconstructionPolicy, ScanEvent, StageDescriptor};
/// use patient_flow_board::services::reconstruct;
///
/// let pathway = Pathway::new(
///     "pol",
///     "Poli",
///     ReconstructionPolicy::Chronological,
///     vec![StageDescriptor::new("Refraksi", ["REF"], None)],
/// )
/// .unwrap();
/// let at = NaiveDate::from_ymd_opt(2021, 4, 18).unwrap().and_hms_opt(9, 0, 0).unwrap();
///
/// let rows = reconstruct(&[ScanEvent::enter("ref", at)], &pathway);
/// assert_eq!(rows.len(), 1);
/// assert!(rows[0].active);
/// ```
pub fn reconstruct(events: &[ScanEvent], pathway: &Pathway) -> Vec<ProgressRow> {
    match pathway.policy() {
        ReconstructionPolicy::Chronological => chronological::reconstruct(events, pathway),
        ReconstructionPolicy::FixedTemplate => fixed_template::reconstruct(events, pathway),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::StageDescriptor;
    use crate::services::fixtures::{enter, exit, outpatient, row, surgery, t};

    fn active_count(rows: &[ProgressRow]) -> usize {
        rows.iter().filter(|r| r.active).count()
    }

    #[test]
    fn test_scenario_chronological_duplicates() {
        let pathway = Pathway::new(
            "pol",
            "Poli",
            ReconstructionPolicy::Chronological,
            vec![
                StageDescriptor::new("Rekam Medik", ["RM"], None),
                StageDescriptor::new("Refraksi", ["REF"], None),
                StageDescriptor::new("Ruang Konsul", ["POLI"], None),
            ],
        )
        .unwrap();
        let events = vec![
            enter("RM", 0),
            exit("RM", 0),
            exit("RM", 1),
            enter("REF", 2),
            enter("REF", 3),
            exit("REF", 3),
            enter("POLI", 4),
            enter("POLI", 5),
        ];
        assert_eq!(
            reconstruct(&events, &pathway),
            vec![
                row("Rekam Medik", Some(0), Some(0), false),
                row("Refraksi", Some(2), Some(3), false),
                row("Ruang Konsul", Some(4), None, true),
            ]
        );
    }

    #[test]
    fn test_scenario_fixed_template_jump() {
        let events = vec![enter("OT", 2), enter("PREPOST", 3)];
        assert_eq!(
            reconstruct(&events, &surgery()),
            vec![
                row("Persiapan", None, None, false),
                row("Tindakan", Some(2), None, false),
                row("Pemulihan", Some(3), None, true),
            ]
        );
    }

    #[test]
    fn test_scenario_fixed_template_no_match() {
        let events = vec![enter("REG", 0), enter("POLI", 1)];
        assert!(reconstruct(&events, &surgery()).is_empty());
    }

    #[test]
    fn test_scenario_toggling_run() {
        let events = vec![enter("PP", 1), exit("PP", 2), enter("PP", 3), exit("PP", 4)];
        assert_eq!(
            reconstruct(&events, &outpatient()),
            vec![row("Pemeriksaan Penunjang", Some(1), Some(4), false)]
        );
    }

    #[test]
    fn test_template_cardinality() {
        let pathway = surgery();
        for events in [vec![enter("PREOP", 0)], vec![exit("OT2", 3)], vec![enter("PREPOST", 9)]] {
            assert_eq!(reconstruct(&events, &pathway).len(), pathway.stages().len());
        }
    }

    #[test]
    fn test_deterministic_and_single_active() {
        let events = vec![
            enter("POLI", 4),
            enter("OT", 3),
            exit("REF", 3),
            enter("REF", 2),
            enter("RM", 0),
            exit("RM", 0),
            enter("PREOP", 1),
            exit("PREOP", 5),
            enter("PREPOST", 6),
        ];
        for pathway in [outpatient(), surgery()] {
            let first = reconstruct(&events, &pathway);
            let second = reconstruct(&events, &pathway);
            assert_eq!(first, second);
            assert!(active_count(&first) <= 1);
        }
    }

    #[test]
    fn test_same_timestamp_order_decides_pairing() {
        // exit before enter at the same instant leaves the stage open
        let open = reconstruct(&[exit("REF", 0), enter("REF", 0)], &outpatient());
        assert_eq!(open, vec![row("Refraksi", Some(0), Some(0), true)]);

        let closed = reconstruct(&[enter("REF", 0), exit("REF", 0)], &outpatient());
        assert_eq!(closed, vec![row("Refraksi", Some(0), Some(0), false)]);
        assert_eq!(closed[0].entry_time, Some(t(0)));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        /// Codes from both pathways, in mixed case, plus codes neither knows
        const CODES: &[&str] = &[
            "REG", "rm", "Pa", "REF", "poli", "LAB", "pp", "PREOP", "ot", "OT1", "Ot2", "prepost",
            "XRAY", "kasir",
        ];

        fn scans() -> impl Strategy<Value = Vec<ScanEvent>> {
            // A narrow time range forces plenty of timestamp ties
            let scan = (prop::sample::select(CODES), 0i64..6, any::<bool>()).prop_map(
                |(code, secs, entering)| if entering { enter(code, secs) } else { exit(code, secs) },
            );
            proptest::collection::vec(scan, 0..24)
        }

        /// Runs counted independently: matched stages in stable time order, then dedup
        fn expected_runs(events: &[ScanEvent], pathway: &Pathway) -> usize {
            let mut matched: Vec<(chrono::NaiveDateTime, usize)> = events
                .iter()
                .filter_map(|e| pathway.stage_index(&e.location_code).map(|s| (e.timestamp, s)))
                .collect();
            matched.sort_by_key(|(at, _)| *at);
            let mut stages: Vec<usize> = matched.into_iter().map(|(_, stage)| stage).collect();
            stages.dedup();
            stages.len()
        }

        proptest! {
            #[test]
            fn reconstruction_is_deterministic(events in scans()) {
                for pathway in [outpatient(), surgery()] {
                    let before = events.clone();
                    let first = reconstruct(&events, &pathway);
                    prop_assert_eq!(&first, &reconstruct(&events, &pathway));
                    prop_assert_eq!(&events, &before);
                }
            }

            #[test]
            fn at_most_one_active_row(events in scans()) {
                for pathway in [outpatient(), surgery()] {
                    prop_assert!(active_count(&reconstruct(&events, &pathway)) <= 1);
                }
            }

            #[test]
            fn template_is_empty_or_full(events in scans()) {
                let pathway = surgery();
                let rows = reconstruct(&events, &pathway);
                let any_match =
                    events.iter().any(|e| pathway.stage_index(&e.location_code).is_some());
                if any_match {
                    prop_assert_eq!(rows.len(), pathway.stages().len());
                } else {
                    prop_assert!(rows.is_empty());
                }
            }

            #[test]
            fn chronological_row_per_run(events in scans()) {
                let pathway = outpatient();
                let rows = reconstruct(&events, &pathway);
                prop_assert_eq!(rows.len(), expected_runs(&events, &pathway));
            }

            #[test]
            fn active_row_was_entered(events in scans()) {
                for pathway in [outpatient(), surgery()] {
                    for row in reconstruct(&events, &pathway) {
                        prop_assert!(!row.active || row.entry_time.is_some());
                    }
                }
            }
        }
    }
}
