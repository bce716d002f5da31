//! Background delivery of store change notifications.
//!
//! Each registration gets one dedicated thread that blocks on the store's
//! [`WatchStream`] and invokes the callback inline for every event. The
//! thread runs until the stream closes or the returned [`WatchHandle`] is
//! cancelled; dropping the handle leaves it running for the life of the
//! process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::store::{EventKind, RawEvent, StreamPoll, WatchStream};
use crate::value::ConfigDocument;
use crate::Error;

/// How long the watch thread blocks on the stream before re-checking for
/// cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The decoded payload of a change.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchValue {
    /// The payload parsed as a JSON object or array.
    Document(ConfigDocument),
    /// Any other payload, as text (lossy for invalid UTF-8). Empty for
    /// deletions.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent {
    pub kind: EventKind,
    pub key: String,
    pub value: WatchValue,
}

impl WatchEvent {
    pub fn decode(raw: RawEvent) -> Self {
        Self {
            kind: raw.kind,
            value: decode_value(&raw.value),
            key: raw.key,
        }
    }
}

fn decode_value(bytes: &[u8]) -> WatchValue {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) {
        if value.is_object() || value.is_array() {
            return WatchValue::Document(ConfigDocument::from_json(value));
        }
    }
    WatchValue::Text(String::from_utf8_lossy(bytes).into_owned())
}

/// Handle to a running watch registration.
#[derive(Debug)]
pub struct WatchHandle {
    target: String,
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// The watched key or prefix.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether the watch thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops delivering events and waits for the watch thread to exit.
    ///
    /// Returns after at most one poll interval plus the duration of a
    /// callback already in progress.
    pub fn cancel(mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(key = %self.target, "watch callback panicked");
            }
        }
    }

    /// Lets the watch run for the remainder of the process.
    pub fn detach(self) {}
}

/// Spawns the watch thread for `stream`.
pub(crate) fn spawn<F>(
    mut stream: Box<dyn WatchStream>,
    target: &str,
    mut callback: F,
) -> Result<WatchHandle, Error>
where
    F: FnMut(WatchEvent) + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    let name = target.to_string();

    let thread = thread::Builder::new()
        .name(format!("watch:{target}"))
        .spawn(move || {
            debug!(key = %name, "watch thread started");
            while !flag.load(Ordering::SeqCst) {
                match stream.poll(POLL_INTERVAL) {
                    StreamPoll::Event(raw) => {
                        if flag.load(Ordering::SeqCst) {
                            break;
                        }
                        callback(WatchEvent::decode(raw));
                    }
                    StreamPoll::Idle => {}
                    StreamPoll::Closed => {
                        info!(key = %name, "watch stream closed");
                        break;
                    }
                }
            }
            debug!(key = %name, "watch thread exiting");
        })
        .map_err(Error::WatchSpawn)?;

    Ok(WatchHandle {
        target: target.to_string(),
        cancelled,
        thread: Some(thread),
    })
}
