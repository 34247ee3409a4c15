//! Scripted in-memory transport for connection and session tests.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::transport::{Dialer, EventReceiver, Transport, TransportEvent};
use crate::error::{Error, Result};

/// Everything a mock transport was asked to do
#[derive(Debug, Default)]
pub(crate) struct TransportLog {
    sent: Mutex<Vec<String>>,
    closes: Mutex<Vec<(u16, String)>>,
}

impl TransportLog {
    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn closes(&self) -> Vec<(u16, String)> {
        self.closes.lock().unwrap().clone()
    }
}

pub(crate) struct MockTransport {
    log: Arc<TransportLog>,
}

impl MockTransport {
    pub(crate) fn new() -> (Self, Arc<TransportLog>) {
        let log = Arc::new(TransportLog::default());
        (Self { log: log.clone() }, log)
    }
}

impl Transport for MockTransport {
    fn send_text(&self, text: &str) -> Result<()> {
        if !self.log.closes.lock().unwrap().is_empty() {
            return Err(Error::transport("transport is closed"));
        }
        self.log.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn close(&self, code: u16, reason: &str) -> Result<()> {
        self.log
            .closes
            .lock()
            .unwrap()
            .push((code, reason.to_string()));
        Ok(())
    }
}

/// One dial made through [`MockDialer`]
pub(crate) struct Dialed {
    pub(crate) url: String,
    pub(crate) events: mpsc::UnboundedSender<TransportEvent>,
    pub(crate) log: Arc<TransportLog>,
}

/// Dialer whose connections replay a fixed script of events.
///
/// The event sender is retained, so a script without a terminal event
/// leaves the connection pending forever.
pub(crate) struct MockDialer {
    scripts: Mutex<Vec<Vec<TransportEvent>>>,
    dials: Mutex<Vec<Dialed>>,
}

impl MockDialer {
    /// Every dial replays `script`.
    pub(crate) fn new(script: Vec<TransportEvent>) -> Self {
        Self::with_scripts(vec![script])
    }

    /// The n-th dial replays the n-th script; the last script repeats.
    pub(crate) fn with_scripts(scripts: Vec<Vec<TransportEvent>>) -> Self {
        let mut scripts = scripts;
        scripts.reverse();
        Self {
            scripts: Mutex::new(scripts),
            dials: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn dial_count(&self) -> usize {
        self.dials.lock().unwrap().len()
    }

    pub(crate) fn url(&self, index: usize) -> String {
        self.dials.lock().unwrap()[index].url.clone()
    }

    pub(crate) fn log(&self, index: usize) -> Arc<TransportLog> {
        self.dials.lock().unwrap()[index].log.clone()
    }

    /// Push a live event onto the n-th dialled connection.
    pub(crate) fn emit(&self, index: usize, event: TransportEvent) {
        let _ = self.dials.lock().unwrap()[index].events.send(event);
    }
}

impl Dialer for MockDialer {
    fn dial(&self, url: &str) -> Result<(Box<dyn Transport>, EventReceiver)> {
        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.len() > 1 {
                scripts.pop().unwrap_or_default()
            } else {
                scripts.last().cloned().unwrap_or_default()
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        for event in script {
            let _ = tx.send(event);
        }

        let (transport, log) = MockTransport::new();
        self.dials.lock().unwrap().push(Dialed {
            url: url.to_string(),
            events: tx,
            log,
        });
        Ok((Box::new(transport), rx))
    }
}
