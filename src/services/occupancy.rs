//! Open/close state machine shared by both reconstruction policies
//!
//! A stage starts Open with no times recorded. The first enter sets the
//! entry time; an enter after a close reopens the stage. An exit while Open
//! records the exit time and closes; an exit while Closed is ignored.

use crate::domain::types::ScanKind;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OccupancyState {
    Open,
    Closed,
}

/// Entry/exit bookkeeping for one run or one stage subsequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    entered_at: Option<NaiveDateTime>,
    exited_at: Option<NaiveDateTime>,
    state: OccupancyState,
}

impl Occupancy {
    pub fn new() -> Self {
        Self { entered_at: None, exited_at: None, state: OccupancyState::Open }
    }

    /// Fold a sequence of time-ordered scans into a fresh occupancy
    pub fn from_scans<I>(scans: I) -> Self
    where
        I: IntoIterator<Item = (ScanKind, NaiveDateTime)>,
    {
        let mut occupancy = Self::new();
        for (kind, at) in scans {
            occupancy.apply(kind, at);
        }
        occupancy
    }

    pub fn apply(&mut self, kind: ScanKind, at: NaiveDateTime) {
        match kind {
            ScanKind::Enter => {
                if self.entered_at.is_none() {
                    self.entered_at = Some(at);
                }
                self.state = OccupancyState::Open;
            }
            ScanKind::Exit => {
                if self.state == OccupancyState::Open {
                    self.exited_at = Some(at);
                    self.state = OccupancyState::Closed;
                }
            }
        }
    }

    #[inline]
    pub fn entered_at(&self) -> Option<NaiveDateTime> {
        self.entered_at
    }

    #[inline]
    pub fn exited_at(&self) -> Option<NaiveDateTime> {
        self.exited_at
    }

    /// Whether the stage was ever entered
    #[inline]
    pub fn touched(&self) -> bool {
        self.entered_at.is_some()
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == OccupancyState::Open
    }
}

impl Default for Occupancy {
    fn default() -> Self {
        Self::new()
    }
}
