use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::BytesMut;
use chrono::{Local, NaiveDateTime};
use tapattend_frame::{encode_record, RecordConfig, StudentProfile};
use tapattend_transport::{CardReader, TagSession};
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::event::{ErrorNotice, SessionEvent, StatusNotice};
use crate::outcome::PollOutcome;
use crate::recorder::{AttendanceEntry, AttendanceRecorder};
use crate::roster::Roster;
use crate::store::AttendanceStore;
use crate::tracker::SessionTracker;

/// Default interval between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default bound on waiting for the worker to stop.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Poller behavior.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay between cycles. Default: 500ms.
    pub interval: Duration,
    /// How long `shutdown` waits for the worker. Default: 2s.
    pub join_timeout: Duration,
    /// Record codec settings used when provisioning.
    pub record: RecordConfig,
    /// Stop on its own after this many cycles.
    pub max_cycles: Option<u64>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            record: RecordConfig::default(),
            max_cycles: None,
        }
    }
}

type Clock = Box<dyn Fn() -> NaiveDateTime + Send>;

/// Requests marshaled onto the worker.
#[derive(Debug)]
enum Request {
    ProvisionRow(usize),
    Provision(StudentProfile),
    Stop,
}

/// Owns the reader and runs poll cycles.
///
/// Every transport operation, polls and provisioning writes alike, goes
/// through this value, so operations never interleave on the reader.
pub struct Poller<R> {
    session: TagSession<R>,
    tracker: SessionTracker,
    store: Box<dyn AttendanceStore>,
    roster: Option<Box<dyn Roster>>,
    config: PollerConfig,
    clock: Clock,
    restored: Vec<AttendanceEntry>,
}

impl<R: CardReader> Poller<R> {
    /// Create a poller, seeding logged identifiers from `store`.
    ///
    /// The rows read here are published as [`SessionEvent::Restored`]
    /// when the worker starts.
    pub fn new(
        session: TagSession<R>,
        mut store: impl AttendanceStore + 'static,
        config: PollerConfig,
    ) -> Result<Self> {
        let restored = store.logged_entries()?;
        info!(seeded = restored.len(), "loaded existing attendance");
        let recorder = AttendanceRecorder::seeded(restored.iter().map(|e| e.identifier.clone()));
        Ok(Self {
            session,
            tracker: SessionTracker::new(recorder),
            store: Box::new(store),
            roster: None,
            config,
            clock: Box::new(|| Local::now().naive_local()),
            restored,
        })
    }

    /// Attach the roster used by row provisioning.
    pub fn with_roster(mut self, roster: impl Roster + 'static) -> Self {
        self.roster = Some(Box::new(roster));
        self
    }

    /// Override the wall clock.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Shared handle to the logged identifier set.
    pub fn recorder(&self) -> AttendanceRecorder {
        self.tracker.recorder().clone()
    }

    pub fn reader_name(&self) -> &str {
        self.session.reader_name()
    }

    /// Rows that were already in the store, oldest first.
    pub fn restored(&self) -> &[AttendanceEntry] {
        &self.restored
    }

    /// Run one read → classify → record cycle.
    ///
    /// New entries are appended to the store before being returned.
    pub fn poll_once(&mut self) -> Vec<SessionEvent> {
        let outcome = PollOutcome::classify(self.session.read_record());
        let mut events = self.tracker.observe(outcome, (self.clock)());

        let mut persist_errors = Vec::new();
        for event in &events {
            if let SessionEvent::Logged(entry) = event {
                if let Err(err) = self.store.append(entry) {
                    warn!(identifier = %entry.identifier, %err, "failed to persist attendance");
                    persist_errors.push(SessionEvent::Error(ErrorNotice::new(
                        "persist",
                        err.to_string(),
                    )));
                }
            }
        }
        events.extend(persist_errors);
        events
    }

    /// Encode `profile` and write it to the tag on the reader.
    ///
    /// A failed write can leave the tag partially written.
    pub fn provision(&mut self, profile: &StudentProfile) -> Result<usize> {
        let mut buf = BytesMut::new();
        encode_record(profile, &self.config.record, &mut buf)?;
        let blocks = self.session.write_record(&buf)?;
        info!(identifier = %profile.identifier, blocks, "tag provisioned");
        Ok(blocks)
    }

    /// Look up a roster row.
    pub fn roster_row(&self, row: usize) -> Result<StudentProfile> {
        let roster = self.roster.as_ref().ok_or(SessionError::NoRoster)?;
        Ok(roster.row(row)?)
    }

    fn handle(&mut self, request: Request) -> Vec<SessionEvent> {
        let (row, profile) = match request {
            Request::ProvisionRow(row) => match self.roster_row(row) {
                Ok(profile) => (Some(row), profile),
                Err(err) => {
                    warn!(row, %err, "roster lookup failed");
                    return vec![SessionEvent::Error(ErrorNotice::new(
                        "provision",
                        err.to_string(),
                    ))];
                }
            },
            Request::Provision(profile) => (None, profile),
            Request::Stop => return Vec::new(),
        };

        let mut events = vec![SessionEvent::Status(StatusNotice::Provisioning {
            row,
            name: profile.display_name(),
        })];
        match self.provision(&profile) {
            Ok(blocks) => events.push(SessionEvent::Status(StatusNotice::Provisioned {
                identifier: profile.identifier.clone(),
                blocks,
            })),
            Err(err) => {
                warn!(identifier = %profile.identifier, %err, "provisioning failed");
                events.push(SessionEvent::Error(ErrorNotice::new(
                    "provision",
                    format!("{err}; retry with the tag held on the reader"),
                )));
            }
        }
        events
    }
}

impl<R: CardReader + 'static> Poller<R> {
    /// Move the poller onto a dedicated worker thread.
    pub fn spawn(self) -> Result<PollerHandle> {
        let (event_tx, event_rx) = mpsc::channel();
        let (request_tx, request_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let join_timeout = self.config.join_timeout;

        let worker_stop = stop.clone();
        let join = thread::Builder::new()
            .name("tapattend-poller".to_string())
            .spawn(move || {
                self.run(&request_rx, &event_tx, &worker_stop);
                let _ = done_tx.send(());
            })
            .map_err(SessionError::Spawn)?;

        Ok(PollerHandle {
            events: event_rx,
            requests: request_tx,
            stop,
            done: done_rx,
            join: Some(join),
            join_timeout,
        })
    }

    fn run(
        mut self,
        requests: &Receiver<Request>,
        events: &Sender<SessionEvent>,
        stop: &AtomicBool,
    ) {
        info!(reader = %self.reader_name(), "poller started");
        let restored = std::mem::take(&mut self.restored)
            .into_iter()
            .map(SessionEvent::Restored)
            .collect();
        if !publish(events, restored) {
            return;
        }
        let ready = StatusNotice::ReaderReady {
            reader: self.reader_name().to_string(),
        };
        if events.send(SessionEvent::Status(ready)).is_err() {
            return;
        }

        let mut cycles = 0u64;
        'outer: while !stop.load(Ordering::SeqCst) {
            loop {
                match requests.try_recv() {
                    Ok(Request::Stop) | Err(TryRecvError::Disconnected) => break 'outer,
                    Ok(request) => {
                        if !publish(events, self.handle(request)) {
                            return;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }

            if !publish(events, self.poll_once()) {
                return;
            }
            cycles += 1;
            if self.config.max_cycles.is_some_and(|max| cycles >= max) {
                debug!(cycles, "cycle limit reached");
                break;
            }

            match requests.recv_timeout(self.config.interval) {
                Ok(Request::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(request) => {
                    if !publish(events, self.handle(request)) {
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }

        self.session.disconnect();
        info!(cycles, "poller stopped");
        let _ = events.send(SessionEvent::Status(StatusNotice::Stopped));
    }
}

/// Returns false once nobody is listening.
fn publish(events: &Sender<SessionEvent>, batch: Vec<SessionEvent>) -> bool {
    batch.into_iter().all(|event| events.send(event).is_ok())
}

/// Presentation-side handle to a running poller.
pub struct PollerHandle {
    events: Receiver<SessionEvent>,
    requests: Sender<Request>,
    stop: Arc<AtomicBool>,
    done: Receiver<()>,
    join: Option<JoinHandle<()>>,
    join_timeout: Duration,
}

impl PollerHandle {
    /// Ordered event stream from the worker.
    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_event(&self, timeout: Duration) -> Option<SessionEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Ask the worker to provision the tag from a roster row.
    pub fn provision_row(&self, row: usize) -> Result<()> {
        self.requests
            .send(Request::ProvisionRow(row))
            .map_err(|_| SessionError::Disconnected)
    }

    /// Ask the worker to provision the tag with `profile`.
    pub fn provision(&self, profile: StudentProfile) -> Result<()> {
        self.requests
            .send(Request::Provision(profile))
            .map_err(|_| SessionError::Disconnected)
    }

    /// True once the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(|j| j.is_finished())
    }

    /// Stop the worker and wait at most the configured join timeout.
    ///
    /// An in-flight cycle is allowed to finish; no new cycle starts. Returns
    /// the events published but not yet consumed.
    pub fn shutdown(mut self) -> Result<Vec<SessionEvent>> {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.requests.send(Request::Stop);

        match self.done.recv_timeout(self.join_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.join_timeout, "poller did not stop in time");
                return Err(SessionError::ShutdownTimeout(self.join_timeout));
            }
        }

        if let Some(join) = self.join.take() {
            join.join().map_err(|_| SessionError::WorkerPanicked)?;
        }
        Ok(self.events.try_iter().collect())
    }
}
