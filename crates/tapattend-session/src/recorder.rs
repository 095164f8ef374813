use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tapattend_frame::StudentProfile;
use tracing::info;

/// One attendance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub identifier: String,
    pub first_name: String,
    pub last_name: String,
    pub major: String,
    pub timestamp: NaiveDateTime,
}

impl AttendanceEntry {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Result of offering a profile to the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Logged(AttendanceEntry),
    AlreadyLogged,
}

#[derive(Debug, Default)]
struct Logged {
    ids: HashSet<String>,
    last_timestamp: Option<NaiveDateTime>,
}

/// Identifiers already logged in this run.
///
/// Clones share the same set. The set only grows.
#[derive(Debug, Clone, Default)]
pub struct AttendanceRecorder {
    inner: Arc<Mutex<Logged>>,
}

impl AttendanceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from identifiers already present in the persisted record.
    pub fn seeded<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let recorder = Self::new();
        recorder.lock().ids.extend(ids.into_iter().map(Into::into));
        recorder
    }

    fn lock(&self) -> MutexGuard<'_, Logged> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.lock().ids.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.lock().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Log `profile` unless its identifier is already present.
    ///
    /// Check and insert happen under one lock. Timestamps never go backwards:
    /// a clock step back reuses the previous timestamp.
    pub fn record(&self, profile: &StudentProfile, now: NaiveDateTime) -> RecordOutcome {
        let mut logged = self.lock();
        if !logged.ids.insert(profile.identifier.clone()) {
            return RecordOutcome::AlreadyLogged;
        }

        let timestamp = match logged.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        logged.last_timestamp = Some(timestamp);

        info!(identifier = %profile.identifier, %timestamp, "attendance logged");
        RecordOutcome::Logged(AttendanceEntry {
            identifier: profile.identifier.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            major: profile.major.clone(),
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::NaiveDate;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 3)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .expect("valid timestamp")
    }

    fn profile(id: &str) -> StudentProfile {
        StudentProfile::new(id, "Ada", "Lovelace", "Math")
    }

    #[test]
    fn logs_once_per_identifier() {
        let recorder = AttendanceRecorder::new();
        let first = recorder.record(&profile("300"), at(9, 0, 0));
        assert!(matches!(first, RecordOutcome::Logged(ref e) if e.identifier == "300"));

        for _ in 0..5 {
            assert_eq!(
                recorder.record(&profile("300"), at(9, 0, 1)),
                RecordOutcome::AlreadyLogged
            );
        }
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn seeded_identifiers_are_already_logged() {
        let recorder = AttendanceRecorder::seeded(["100", "200"]);
        assert_eq!(
            recorder.record(&profile("100"), at(9, 0, 0)),
            RecordOutcome::AlreadyLogged
        );
        assert!(matches!(
            recorder.record(&profile("300"), at(9, 0, 0)),
            RecordOutcome::Logged(_)
        ));
        assert_eq!(recorder.len(), 3);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let recorder = AttendanceRecorder::new();
        let RecordOutcome::Logged(a) = recorder.record(&profile("1"), at(10, 0, 0)) else {
            panic!("first record should log");
        };
        let RecordOutcome::Logged(b) = recorder.record(&profile("2"), at(9, 59, 0)) else {
            panic!("second record should log");
        };
        assert_eq!(a.timestamp, at(10, 0, 0));
        assert_eq!(b.timestamp, at(10, 0, 0));
    }

    #[test]
    fn concurrent_record_logs_exactly_once() {
        let recorder = AttendanceRecorder::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let recorder = recorder.clone();
                thread::spawn(move || recorder.record(&profile("42"), at(12, 0, 0)))
            })
            .collect();

        let logged = handles
            .into_iter()
            .map(|h| h.join().expect("recorder thread should complete"))
            .filter(|outcome| matches!(outcome, RecordOutcome::Logged(_)))
            .count();
        assert_eq!(logged, 1);
    }
}
