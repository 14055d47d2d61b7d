use crate::pageviews::{PageviewTracker, VirtualPageViewEvent};
use parking_lot::RwLock;
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::Serialize;
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

const MAX_EVENT_RECORDS: usize = 1024;
const SESSION_ID_LEN: usize = 24;

/// Pageview tracker keeping recent events in memory and, optionally,
/// appending them to a JSON-lines file.
#[derive(Clone)]
pub struct PageviewLog {
    shared: Arc<PageviewLogShared>,
}

impl PageviewLog {
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self::with_path(Some(path.into()))
    }

    pub fn ephemeral() -> Self {
        Self::with_path(None)
    }

    fn with_path(path: Option<PathBuf>) -> Self {
        Self {
            shared: Arc::new(PageviewLogShared {
                events: RwLock::new(VecDeque::new()),
                sink: EventSink { path },
            }),
        }
    }

    pub fn record(&self, topic: &str, event: &VirtualPageViewEvent) -> TrackedEvent {
        let tracked = TrackedEvent {
            topic: topic.to_string(),
            captured_at: now_ts(),
            event: event.clone(),
        };
        let mut guard = self.shared.events.write();
        guard.push_back(tracked.clone());
        while guard.len() > MAX_EVENT_RECORDS {
            guard.pop_front();
        }
        drop(guard);
        info!(
            topic,
            page_title = %event.page_title,
            source_title = %event.source_title,
            "tracked pageview"
        );
        self.shared.sink.append(&tracked);
        tracked
    }

    pub fn events(&self) -> Vec<TrackedEvent> {
        self.shared.events.read().iter().cloned().collect()
    }

    pub fn count_for(&self, page_title: &str) -> usize {
        self.shared
            .events
            .read()
            .iter()
            .filter(|tracked| tracked.event.page_title == page_title)
            .count()
    }
}

impl PageviewTracker for PageviewLog {
    fn track(&self, topic: &str, event: &VirtualPageViewEvent) {
        self.record(topic, event);
    }
}

struct PageviewLogShared {
    events: RwLock<VecDeque<TrackedEvent>>,
    sink: EventSink,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackedEvent {
    pub topic: String,
    pub captured_at: u64,
    pub event: VirtualPageViewEvent,
}

struct EventSink {
    path: Option<PathBuf>,
}

impl EventSink {
    fn append(&self, tracked: &TrackedEvent) {
        let Some(path) = &self.path else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!(error = %err, "failed to create pageview log directory");
                return;
            }
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(mut file) => {
                let mut line = match serde_json::to_vec(tracked) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(error = %err, "failed to serialize pageview event");
                        return;
                    }
                };
                line.push(b'\n');
                if let Err(err) = file.write_all(&line) {
                    warn!(error = %err, "failed to write pageview event");
                }
            }
            Err(err) => warn!(error = %err, "failed to open pageview log file"),
        }
    }
}

fn now_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Random token used to identify a browser session.
pub fn generate_session_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}
