//! Notification suppression across poll cycles.
//!
//! A tag sitting on the reader is seen every cycle. The tracker turns that
//! stream of identical observations into one notice per state change:
//!
//! | Seen          | Notice                                   | Repeats?                      |
//! |---------------|------------------------------------------|-------------------------------|
//! | no tag        | waiting for a tag                        | no, until something else seen |
//! | blank tag     | assign a roster row                      | no, until the tag leaves      |
//! | logged id     | already signed in                        | no, until the tag leaves      |
//! | new id        | logged entry                             | n/a                           |
//! | tag removed   | card removed                             | no, until something else seen |
//! | other failure | error notice                             | no, while the failure is same |

use chrono::NaiveDateTime;
use tapattend_frame::StudentProfile;
use tracing::debug;

use crate::event::{ErrorNotice, SessionEvent, StatusNotice};
use crate::outcome::{PollFault, PollOutcome};
use crate::recorder::{AttendanceRecorder, RecordOutcome};

/// Last deduplicated notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusKey {
    NoTag,
    TagRemoved,
    Fault(String),
}

/// Per-run notification state.
///
/// Logged identifiers live in the shared [`AttendanceRecorder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub last_notified: Option<StatusKey>,
    pub sign_in_notified: bool,
    pub suppress_empty_notice: bool,
}

impl SessionState {
    /// The tag left the reader: the next tag gets fresh notices.
    fn tag_left(&mut self) {
        self.sign_in_notified = false;
        self.suppress_empty_notice = false;
    }

    /// Notify once per consecutive run of the same key.
    fn notify_once(
        &mut self,
        key: StatusKey,
        event: SessionEvent,
        events: &mut Vec<SessionEvent>,
    ) {
        if self.last_notified.as_ref() != Some(&key) {
            events.push(event);
            self.last_notified = Some(key);
        }
    }

    fn already_signed_in(&mut self, profile: &StudentProfile, events: &mut Vec<SessionEvent>) {
        if !self.sign_in_notified {
            events.push(SessionEvent::Status(StatusNotice::AlreadySignedIn {
                identifier: profile.identifier.clone(),
                name: profile.display_name(),
            }));
            self.sign_in_notified = true;
        }
    }
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub state: SessionState,
    pub events: Vec<SessionEvent>,
}

/// Advance the session by one poll outcome.
pub fn step(
    mut state: SessionState,
    outcome: PollOutcome,
    recorder: &AttendanceRecorder,
    now: NaiveDateTime,
) -> Step {
    let mut events = Vec::new();

    match outcome {
        PollOutcome::NoTag => {
            state.notify_once(
                StatusKey::NoTag,
                SessionEvent::Status(StatusNotice::WaitingForTag),
                &mut events,
            );
            state.tag_left();
        }
        PollOutcome::EmptyTag => {
            state.last_notified = None;
            if !state.suppress_empty_notice {
                events.push(SessionEvent::Status(StatusNotice::AssignRow));
                state.suppress_empty_notice = true;
            }
        }
        PollOutcome::Decoded(profile) => {
            state.last_notified = None;
            if recorder.contains(&profile.identifier) {
                state.already_signed_in(&profile, &mut events);
            } else {
                state.sign_in_notified = false;
                match recorder.record(&profile, now) {
                    RecordOutcome::Logged(entry) => {
                        events.push(SessionEvent::Logged(entry));
                        // The tag is still on the reader; don't follow up
                        // with "already signed in".
                        state.sign_in_notified = true;
                    }
                    RecordOutcome::AlreadyLogged => state.already_signed_in(&profile, &mut events),
                }
            }
        }
        PollOutcome::Fault(PollFault::Transport(err)) if err.is_tag_gone() => {
            state.tag_left();
            state.notify_once(
                StatusKey::TagRemoved,
                SessionEvent::Status(StatusNotice::TagRemoved),
                &mut events,
            );
        }
        PollOutcome::Fault(fault) => {
            if matches!(fault, PollFault::Transport(_)) {
                state.tag_left();
            }
            let message = fault.to_string();
            state.notify_once(
                StatusKey::Fault(message.clone()),
                SessionEvent::Error(ErrorNotice::new("poll", message)),
                &mut events,
            );
        }
    }

    Step { state, events }
}

/// Owns the session state between cycles.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    state: SessionState,
    recorder: AttendanceRecorder,
}

impl SessionTracker {
    pub fn new(recorder: AttendanceRecorder) -> Self {
        Self {
            state: SessionState::default(),
            recorder,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn recorder(&self) -> &AttendanceRecorder {
        &self.recorder
    }

    /// Feed one outcome; returns the notices it produced.
    pub fn observe(&mut self, outcome: PollOutcome, now: NaiveDateTime) -> Vec<SessionEvent> {
        let kind = outcome.kind();
        let Step { state, events } = step(
            std::mem::take(&mut self.state),
            outcome,
            &self.recorder,
            now,
        );
        debug!(outcome = kind, notices = events.len(), "poll cycle classified");
        self.state = state;
        events
    }
}
