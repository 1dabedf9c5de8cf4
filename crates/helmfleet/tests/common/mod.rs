//! Shared mock operations and log capture for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use helmfleet::{OperationError, ReleaseOperation, ReleaseSpec};
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::FmtSpan;

/// What a [`RecordingOperation`] observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(String),
    Finished(String),
}

/// Operation that records start/finish events, tracks how many releases are
/// in flight at once, and fails for a configured set of release names.
#[derive(Clone)]
pub struct RecordingOperation {
    delay: Duration,
    failing: HashSet<String>,
    events: Arc<Mutex<Vec<Event>>>,
    worker_ids: Arc<Mutex<Vec<usize>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl RecordingOperation {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(30),
            failing: HashSet::new(),
            events: Arc::new(Mutex::new(Vec::new())),
            worker_ids: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    /// Names of started releases, in start order.
    pub async fn started(&self) -> Vec<String> {
        self.events()
            .await
            .into_iter()
            .filter_map(|e| match e {
                Event::Started(name) => Some(name),
                Event::Finished(_) => None,
            })
            .collect()
    }

    pub async fn worker_ids(&self) -> Vec<usize> {
        self.worker_ids.lock().await.clone()
    }

    pub fn invocations(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseOperation for RecordingOperation {
    async fn run(&self, release: &ReleaseSpec, worker_id: usize) -> Result<(), OperationError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.worker_ids.lock().await.push(worker_id);
        self.events
            .lock()
            .await
            .push(Event::Started(release.name.clone()));

        tokio::time::sleep(self.delay).await;

        self.events
            .lock()
            .await
            .push(Event::Finished(release.name.clone()));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(&release.name) {
            Err(OperationError::failed(format!("{} failed", release.name)))
        } else {
            Ok(())
        }
    }
}

/// Position of `event` in `events`, panicking when absent.
pub fn index_of(events: &[Event], event: &Event) -> usize {
    events
        .iter()
        .position(|e| e == event)
        .unwrap_or_else(|| panic!("{event:?} not found in {events:?}"))
}

pub fn started(name: &str) -> Event {
    Event::Started(name.to_string())
}

pub fn finished(name: &str) -> Event {
    Event::Finished(name.to_string())
}

/// In-memory sink for formatted tracing output.
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<std::sync::Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Installs a debug-level fmt subscriber for the current thread that
    /// writes into a fresh capture, including span open/close lines.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_ansi(false)
            .with_writer(capture.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
