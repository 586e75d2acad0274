//! Debounced re-parsing for live preview.
//!
//! Content edits are sent to a worker thread. The worker waits for a quiet
//! period and parses only the newest content; a newer submission restarts
//! the wait, so there is never a backlog of stale parses.

use crate::error::Result;
use crate::som::Presentation;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Quiet period before a submitted edit is parsed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// A debounced parse loop on a background thread.
///
/// Dropping the session parses any still-pending content, then stops the worker.
pub struct PreviewSession {
    sender: Option<Sender<String>>,
    worker: Option<JoinHandle<()>>,
}

impl PreviewSession {
    /// Start a session with the default debounce.
    pub fn new<F>(on_update: F) -> Result<Self>
    where
        F: Fn(Arc<Presentation>) + Send + 'static,
    {
        Self::with_debounce(DEFAULT_DEBOUNCE, on_update)
    }

    pub fn with_debounce<F>(delay: Duration, on_update: F) -> Result<Self>
    where
        F: Fn(Arc<Presentation>) + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<String>();
        let worker = thread::Builder::new()
            .name("slidemark-preview".to_string())
            .spawn(move || {
                let publish = |content: String| {
                    let deck = Presentation::from_markdown(&content);
                    log::debug!("Preview re-parsed: {} slides", deck.slides.len());
                    on_update(Arc::new(deck));
                };

                let mut pending: Option<String> = None;
                loop {
                    let Some(content) = pending.take() else {
                        match receiver.recv() {
                            Ok(content) => {
                                pending = Some(content);
                                continue;
                            }
                            Err(_) => break,
                        }
                    };
                    match receiver.recv_timeout(delay) {
                        Ok(newer) => pending = Some(newer),
                        Err(RecvTimeoutError::Timeout) => publish(content),
                        Err(RecvTimeoutError::Disconnected) => {
                            publish(content);
                            break;
                        }
                    }
                }
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Schedule a re-parse of `content`, replacing any pending one.
    pub fn submit(&self, content: impl Into<String>) {
        if let Some(sender) = &self.sender {
            if sender.send(content.into()).is_err() {
                log::warn!("Preview worker has stopped; dropping edit");
            }
        }
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Preview worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<usize>>>, impl Fn(Arc<Presentation>) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |deck: Arc<Presentation>| {
            sink.lock().unwrap().push(deck.slides.len());
        })
    }

    #[test]
    fn test_burst_parses_only_latest() {
        let (seen, on_update) = recorder();
        let session = PreviewSession::with_debounce(Duration::from_millis(200), on_update).unwrap();
        session.submit("a");
        session.submit("a\n===\nb");
        session.submit("a\n===\nb\n===\nc");
        drop(session);
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_quiet_period_publishes() {
        let (seen, on_update) = recorder();
        let session = PreviewSession::with_debounce(Duration::from_millis(20), on_update).unwrap();
        session.submit("one");
        thread::sleep(Duration::from_millis(300));
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        session.submit("one\n---\ntwo");
        drop(session);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
