//! Connection attempt state machine
//!
//! ```text
//! Idle ──begin──▶ Connecting ──┬──▶ Open
//!   │                          ├──▶ Failed
//!   │                          ├──▶ TimedOut
//!   └──────────────────────────┴──▶ Aborted
//! ```
//!
//! Every transition out of `Connecting` goes through [`ConnectionAttempt::settle`],
//! which only succeeds once. Non-open settlements tear the transport down as
//! part of the same transition, so teardown also happens exactly once.

use std::collections::VecDeque;

use super::transport::{Transport, NORMAL_CLOSE};

/// Lifecycle of a single connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Connecting,
    Open,
    Failed,
    Aborted,
    TimedOut,
}

impl AttemptState {
    /// Terminal states: the attempt has settled.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            AttemptState::Open
                | AttemptState::Failed
                | AttemptState::Aborted
                | AttemptState::TimedOut
        )
    }
}

/// Bounded FIFO of raw frames awaiting the consumer.
#[derive(Debug)]
pub struct FrameBuffer {
    frames: VecDeque<String>,
    capacity: usize,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a frame, evicting the oldest one when full.
    ///
    /// Returns the evicted frame, if any.
    pub fn push(&mut self, frame: String) -> Option<String> {
        let evicted = if self.frames.len() >= self.capacity {
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    pub fn pop(&mut self) -> Option<String> {
        self.frames.pop_front()
    }

    /// Take every buffered frame in arrival order, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<String> {
        self.frames.drain(..).collect()
    }

    pub fn has_room(&self) -> bool {
        self.frames.len() < self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// One call to connect: owns the transport until it either opens (and is
/// handed to the caller) or is torn down.
pub struct ConnectionAttempt {
    state: AttemptState,
    transport: Option<Box<dyn Transport>>,
    buffer: FrameBuffer,
}

impl ConnectionAttempt {
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            state: AttemptState::Idle,
            transport: None,
            buffer: FrameBuffer::new(buffer_capacity),
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// `Idle → Connecting`, taking ownership of the dialled transport.
    ///
    /// Returns false (and closes the transport) if the attempt is not idle.
    pub fn begin(&mut self, transport: Box<dyn Transport>) -> bool {
        if self.state != AttemptState::Idle {
            close_quietly(transport.as_ref(), "connection attempt already started");
            return false;
        }
        self.transport = Some(transport);
        self.state = AttemptState::Connecting;
        true
    }

    /// Move to a terminal state.
    ///
    /// Only the first call succeeds; later calls are no-ops returning false.
    /// `Aborted` may also be reached directly from `Idle` (cancelled before
    /// anything was dialled). Non-open outcomes close the transport.
    pub fn settle(&mut self, next: AttemptState) -> bool {
        let allowed = match (self.state, next) {
            (AttemptState::Connecting, next) => next.is_settled(),
            (AttemptState::Idle, AttemptState::Aborted) => true,
            _ => false,
        };
        if !allowed {
            tracing::trace!(from = ?self.state, to = ?next, "Ignoring settlement of settled attempt");
            return false;
        }

        self.state = next;
        if next != AttemptState::Open {
            self.teardown();
        }
        true
    }

    /// Hold a frame that arrived before the consumer is attached.
    pub fn buffer_frame(&mut self, frame: String) {
        if self.state.is_settled() && self.state != AttemptState::Open {
            return;
        }
        if self.buffer.push(frame).is_some() {
            tracing::warn!(
                capacity = self.buffer.capacity,
                "Pre-attachment frame buffer full, dropped oldest frame"
            );
        }
    }

    /// Hand over the transport and buffered frames of an opened attempt.
    pub fn into_open(mut self) -> Option<(Box<dyn Transport>, FrameBuffer)> {
        if self.state != AttemptState::Open {
            return None;
        }
        let transport = self.transport.take()?;
        let buffer = std::mem::replace(&mut self.buffer, FrameBuffer::new(1));
        Some((transport, buffer))
    }

    fn teardown(&mut self) {
        if let Some(transport) = self.transport.take() {
            close_quietly(transport.as_ref(), "connection attempt abandoned");
        }
    }
}

fn close_quietly(transport: &dyn Transport, reason: &str) {
    if let Err(e) = transport.close(NORMAL_CLOSE, reason) {
        tracing::warn!(error = %e, "Failed to close transport during teardown");
    }
}
