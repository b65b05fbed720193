//! Shared types for the patient flow board

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Kind of a badge/location scan
///
/// Any scan that is not an explicit exit counts as entering the location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    Enter,
    Exit,
}

impl std::str::FromStr for ScanKind {
    type Err = UnknownScanKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "I" | "IN" | "ENTER" | "M" => Ok(ScanKind::Enter),
            "O" | "OUT" | "EXIT" | "K" => Ok(ScanKind::Exit),
            _ => Err(UnknownScanKind(s.to_string())),
        }
    }
}

/// Raw action code that maps to neither an enter nor an exit scan
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scan action '{0}'")]
pub struct UnknownScanKind(pub String);

/// A single persisted scan of a patient at a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub location_code: String,
    pub timestamp: NaiveDateTime,
    pub kind: ScanKind,
}

impl ScanEvent {
    pub fn new(location_code: &str, timestamp: NaiveDateTime, kind: ScanKind) -> Self {
        Self { location_code: location_code.to_string(), timestamp, kind }
    }

    #[inline]
    pub fn enter(location_code: &str, timestamp: NaiveDateTime) -> Self {
        Self::new(location_code, timestamp, ScanKind::Enter)
    }

    #[inline]
    pub fn exit(location_code: &str, timestamp: NaiveDateTime) -> Self {
        Self::new(location_code, timestamp, ScanKind::Exit)
    }
}

/// One reconstructed stage occupancy as shown on the status board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressRow {
    pub display_name: String,
    pub entry_time: Option<NaiveDateTime>,
    pub exit_time: Option<NaiveDateTime>,
    pub active: bool,
}
