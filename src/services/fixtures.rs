//! Shared pathways and timestamps for engine tests

use crate::domain::catalog::{Pathway, ReconstructionPolicy, StageDescriptor};
use crate::domain::types::{ProgressRow, ScanEvent};
use chrono::{Duration, NaiveDate, NaiveDateTime};

pub fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 4, 18).unwrap().and_hms_opt(8, 30, 0).unwrap()
}

/// t0 plus `secs` seconds
pub fn t(secs: i64) -> NaiveDateTime {
    t0() + Duration::seconds(secs)
}

pub fn enter(code: &str, secs: i64) -> ScanEvent {
    ScanEvent::enter(code, t(secs))
}

pub fn exit(code: &str, secs: i64) -> ScanEvent {
    ScanEvent::exit(code, t(secs))
}

pub fn row(name: &str, entry: Option<i64>, exit: Option<i64>, active: bool) -> ProgressRow {
    ProgressRow {
        display_name: name.to_string(),
        entry_time: entry.map(t),
        exit_time: exit.map(t),
        active,
    }
}

pub fn outpatient() -> Pathway {
    Pathway::new(
        "pol",
        "Poli / Rawat Jalan",
        ReconstructionPolicy::Chronological,
        vec![
            StageDescriptor::new("Registrasi", ["REG"], None),
            StageDescriptor::new("Rekam Medik", ["RM"], None),
            StageDescriptor::new("Pemeriksaan Awal", ["PA"], None),
            StageDescriptor::new("Refraksi", ["REF"], None),
            StageDescriptor::new("Ruang Konsul", ["POLI"], None),
            StageDescriptor::new("Laboratorium", ["LAB"], None),
            StageDescriptor::new("Pemeriksaan Penunjang", ["PP"], None),
        ],
    )
    .unwrap()
}

pub fn surgery() -> Pathway {
    Pathway::new(
        "opr",
        "Operasi",
        ReconstructionPolicy::FixedTemplate,
        vec![
            StageDescriptor::new("Persiapan", ["PREOP"], Some(0)),
            StageDescriptor::new("Tindakan", ["OT", "OT1", "OT2"], Some(1)),
            StageDescriptor::new("Pemulihan", ["PREPOST"], Some(2)),
        ],
    )
    .unwrap()
}
