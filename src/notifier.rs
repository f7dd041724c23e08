//! Peripheral notification dispatch.
//!
//! Navigation events become a single signed byte for the wearable
//! peripheral plus a momentary visual highlight. Delivery is
//! fire-and-forget: a failed send is logged and counted, never retried,
//! and never reported back into the navigation state.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;

use crate::error::SinkError;
use crate::navigator::{NavEvent, ARRIVAL_SIGN};

/// Transport to the peripheral. `send` must not block.
pub trait SignalSink: Send {
    fn send(&mut self, byte: u8) -> Result<(), SinkError>;

    fn is_connected(&self) -> bool {
        true
    }
}

/// Momentary on-screen highlight when a signal goes out
pub trait VisualFeedback: Send {
    fn highlight(&mut self, signal: i32);
}

/// Signal value as the one signed byte the peripheral reads
pub fn encode_signal(value: i32) -> Result<u8, SinkError> {
    i8::try_from(value)
        .map(|v| v as u8)
        .map_err(|_| SinkError::SignalOutOfRange(value))
}

/// Sink backed by a bounded channel to a device writer task
pub struct ChannelSink {
    tx: Option<Sender<u8>>,
}

impl ChannelSink {
    pub fn connected(tx: Sender<u8>) -> Self {
        ChannelSink { tx: Some(tx) }
    }

    pub fn disconnected() -> Self {
        ChannelSink { tx: None }
    }

    pub fn connect(&mut self, tx: Sender<u8>) {
        self.tx = Some(tx);
    }

    pub fn disconnect(&mut self) {
        self.tx = None;
    }
}

impl SignalSink for ChannelSink {
    fn send(&mut self, byte: u8) -> Result<(), SinkError> {
        let tx = self.tx.as_ref().ok_or(SinkError::Unavailable)?;
        match tx.try_send(byte) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SinkError::Busy),
            Err(TrySendError::Closed(_)) => {
                // Writer is gone for good
                self.tx = None;
                Err(SinkError::Unavailable)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.tx.as_ref().map(|tx| !tx.is_closed()).unwrap_or(false)
    }
}

/// Headless visual feedback: writes the highlight to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl VisualFeedback for LogFeedback {
    fn highlight(&mut self, signal: i32) {
        info!("[notify] signal {}", signal);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub sent: u64,
    pub failed: u64,
}

/// Maps navigation events to signal values and forwards them
pub struct NotificationDispatcher<S, F> {
    sink: S,
    feedback: F,
    prepare_signal: i32,
    stats: DispatchStats,
}

impl<S: SignalSink, F: VisualFeedback> NotificationDispatcher<S, F> {
    pub fn new(sink: S, feedback: F, prepare_signal: i32) -> Self {
        Self {
            sink,
            feedback,
            prepare_signal,
            stats: DispatchStats::default(),
        }
    }

    pub fn signal_for(&self, event: &NavEvent) -> i32 {
        match event {
            NavEvent::Prepare => self.prepare_signal,
            NavEvent::Execute { sign } => *sign,
            NavEvent::Arrived => ARRIVAL_SIGN,
        }
    }

    /// Forward one event. Returns the signal value that was sent.
    pub fn dispatch(&mut self, event: &NavEvent) -> Result<i32, SinkError> {
        let signal = self.signal_for(event);
        debug!("Dispatching {:?} as signal {}", event, signal);
        self.send_signal(signal).map(|_| signal)
    }

    /// Send a raw signal value, highlighting it whether or not delivery works.
    pub fn send_signal(&mut self, signal: i32) -> Result<(), SinkError> {
        self.feedback.highlight(signal);

        let result = encode_signal(signal).and_then(|byte| self.sink.send(byte));
        match &result {
            Ok(()) => self.stats.sent += 1,
            Err(e) => {
                self.stats.failed += 1;
                warn!("Signal {} not delivered: {}", signal, e);
            }
        }
        result
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }
}
