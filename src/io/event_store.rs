//! Event store - reads persisted scans for one patient and day
//!
//! The scan log is JSONL, one record per line:
//! `{"branch":"1","patient":"A001","room":"RM","time":"2021-04-18 08:00:00","action":"I"}`
//!
//! Records that cannot be parsed are excluded here, so the engine only ever
//! sees well-formed scans.

use crate::domain::types::{ScanEvent, ScanKind};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Timestamp layout used by the scan log
pub const SCAN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("failed to read scan log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which scans to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanQuery {
    /// Branch identifier as written in the scan log
    pub branch_id: String,
    /// Queue number, compared case-insensitively
    pub patient_id: String,
    pub date: NaiveDate,
}

impl ScanQuery {
    fn matches(&self, branch_id: &str, patient_id: &str, at: &NaiveDateTime) -> bool {
        branch_id == self.branch_id
            && patient_id.eq_ignore_ascii_case(&self.patient_id)
            && at.date() == self.date
    }
}

/// Scans returned for a query, plus how many malformed records were dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanBatch {
    pub events: Vec<ScanEvent>,
    pub skipped: u64,
}

/// Source of persisted scans
pub trait EventSource: Send + Sync {
    fn scans(&self, query: &ScanQuery) -> Result<ScanBatch, EventStoreError>;
}

#[derive(Debug, Deserialize)]
struct ScanRecord {
    branch: String,
    patient: String,
    room: String,
    time: String,
    action: String,
}

impl ScanRecord {
    fn parse(line: &str) -> Result<(Self, NaiveDateTime, ScanKind), String> {
        let record: ScanRecord = serde_json::from_str(line).map_err(|e| e.to_string())?;
        let at = NaiveDateTime::parse_from_str(&record.time, SCAN_TIME_FORMAT)
            .map_err(|e| format!("bad time '{}': {e}", record.time))?;
        let kind = record.action.parse::<ScanKind>().map_err(|e| e.to_string())?;
        Ok((record, at, kind))
    }
}

/// Scan log stored as a JSONL file, re-read on every query
pub struct JsonlEventStore {
    path: PathBuf,
}

impl JsonlEventStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl EventSource for JsonlEventStore {
    fn scans(&self, query: &ScanQuery) -> Result<ScanBatch, EventStoreError> {
        let io_err = |source| EventStoreError::Io { path: self.path.clone(), source };
        let file = File::open(&self.path).map_err(io_err)?;

        let mut batch = ScanBatch::default();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(io_err)?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match ScanRecord::parse(line) {
                Ok((record, at, kind)) => {
                    if query.matches(&record.branch, &record.patient, &at) {
                        batch.events.push(ScanEvent::new(&record.room, at, kind));
                    }
                }
                Err(reason) => {
                    warn!(
                        file = %self.path.display(),
                        line = %(idx + 1),
                        reason = %reason,
                        "scan_record_skipped"
                    );
                    batch.skipped += 1;
                }
            }
        }

        debug!(
            branch = %query.branch_id,
            patient = %query.patient_id,
            date = %query.date,
            scans = %batch.events.len(),
            skipped = %batch.skipped,
            "scans_loaded"
        );
        Ok(batch)
    }
}

/// In-memory scan log
#[derive(Debug, Clone, Default)]
pub struct MemoryEventStore {
    records: Vec<(String, String, ScanEvent)>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, branch_id: &str, patient_id: &str, event: ScanEvent) {
        self.records.push((branch_id.to_string(), patient_id.to_string(), event));
    }

    pub fn with_scan(mut self, branch_id: &str, patient_id: &str, event: ScanEvent) -> Self {
        self.push(branch_id, patient_id, event);
        self
    }
}

impl EventSource for MemoryEventStore {
    fn scans(&self, query: &ScanQuery) -> Result<ScanBatch, EventStoreError> {
        let events = self
            .records
            .iter()
            .filter(|(branch, patient, event)| query.matches(branch, patient, &event.timestamp))
            .map(|(_, _, event)| event.clone())
            .collect();
        Ok(ScanBatch { events, skipped: 0 })
    }
}
