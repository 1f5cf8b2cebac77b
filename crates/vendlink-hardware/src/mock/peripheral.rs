//! Mock peripheral implementation for testing and development.
//!
//! The mock stands in for the subordinate microcontroller. Tests script what
//! each poll returns through a [`MockPeripheralHandle`] and read back the
//! replies the controller wrote.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use tokio::sync::mpsc::{self, error::TryRecvError};
use vendlink_protocol::{Frame, ReplyCode};

use crate::{
    error::{HardwareError, Result},
    traits::PeripheralLink,
};

/// Mock peripheral link.
///
/// Each [`poll`](PeripheralLink::poll) consumes one scripted event. When
/// nothing is scripted the poll reports no data, like a bus read that only
/// returned padding.
///
/// # Examples
///
/// ```
/// use vendlink_hardware::{PeripheralLink, mock::MockPeripheral};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> vendlink_hardware::Result<()> {
///     let (mut link, handle) = MockPeripheral::new();
///
///     handle.push_idle().await?;
///     assert!(link.poll().await?.unwrap().is_idle());
///     assert!(link.poll().await?.is_none());
///     assert_eq!(handle.poll_count(), 2);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockPeripheral {
    /// Scripted poll results
    event_rx: mpsc::Receiver<LinkEvent>,

    /// Replies written by the controller
    reply_tx: mpsc::UnboundedSender<ReplyCode>,

    /// Number of polls performed
    polls: Arc<AtomicUsize>,
}

impl MockPeripheral {
    /// Create a new mock peripheral.
    ///
    /// Returns a tuple of (MockPeripheral, MockPeripheralHandle) where the
    /// handle scripts poll results and observes replies.
    pub fn new() -> (Self, MockPeripheralHandle) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let polls = Arc::new(AtomicUsize::new(0));

        let link = Self {
            event_rx,
            reply_tx,
            polls: Arc::clone(&polls),
        };

        let handle = MockPeripheralHandle {
            event_tx,
            reply_rx,
            polls,
        };

        (link, handle)
    }
}

impl PeripheralLink for MockPeripheral {
    async fn poll(&mut self) -> Result<Option<Frame>> {
        self.polls.fetch_add(1, Ordering::SeqCst);

        match self.event_rx.try_recv() {
            Ok(LinkEvent::Bytes(raw)) => Ok(Frame::from_bytes(&raw)?),
            Ok(LinkEvent::Fault(message)) => Err(HardwareError::bus(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(HardwareError::disconnected("mock peripheral handle dropped"))
            }
        }
    }

    async fn send(&mut self, reply: ReplyCode) -> Result<()> {
        // A dropped handle just means nobody is watching.
        let _ = self.reply_tx.send(reply);
        Ok(())
    }
}

/// Internal event type for the mock peripheral.
#[derive(Debug, Clone)]
enum LinkEvent {
    Bytes(Vec<u8>),
    Fault(String),
}

/// Handle for controlling a [`MockPeripheral`].
#[derive(Debug)]
pub struct MockPeripheralHandle {
    event_tx: mpsc::Sender<LinkEvent>,
    reply_rx: mpsc::UnboundedReceiver<ReplyCode>,
    polls: Arc<AtomicUsize>,
}

impl MockPeripheralHandle {
    /// Queue frame text for a future poll.
    ///
    /// The text goes through the same filtering as a real bus read.
    pub async fn push_frame(&self, text: &str) -> Result<()> {
        self.push_bytes(text.as_bytes().to_vec()).await
    }

    /// Queue raw bus bytes for a future poll.
    pub async fn push_bytes(&self, raw: Vec<u8>) -> Result<()> {
        self.push(LinkEvent::Bytes(raw)).await
    }

    /// Queue the idle marker.
    pub async fn push_idle(&self) -> Result<()> {
        self.push_frame(vendlink_core::constants::IDLE_MARKER).await
    }

    /// Queue a bus failure.
    pub async fn push_fault(&self, message: impl Into<String>) -> Result<()> {
        self.push(LinkEvent::Fault(message.into())).await
    }

    /// Take the oldest reply the controller has written, if any.
    pub fn try_next_reply(&mut self) -> Option<ReplyCode> {
        self.reply_rx.try_recv().ok()
    }

    /// Drain every reply written so far.
    pub fn replies(&mut self) -> Vec<ReplyCode> {
        std::iter::from_fn(|| self.try_next_reply()).collect()
    }

    /// Number of polls the controller has made.
    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    async fn push(&self, event: LinkEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("mock peripheral dropped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_are_consumed_in_order() {
        let (mut link, handle) = MockPeripheral::new();

        handle.push_frame("CARD0001|11000").await.unwrap();
        handle.push_frame("X3").await.unwrap();

        assert_eq!(link.poll().await.unwrap().unwrap().as_str(), "CARD0001|11000");
        assert!(link.poll().await.unwrap().unwrap().is_dispense_complete());
        assert!(link.poll().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_raw_bytes_are_filtered() {
        let (mut link, handle) = MockPeripheral::new();

        handle.push_bytes(b"X\xff\xff\x00".to_vec()).await.unwrap();
        handle.push_bytes(vec![0xff; 50]).await.unwrap();

        assert!(link.poll().await.unwrap().unwrap().is_idle());
        assert!(link.poll().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fault_surfaces_as_bus_error() {
        let (mut link, handle) = MockPeripheral::new();
        handle.push_fault("nack").await.unwrap();

        let err = link.poll().await.unwrap_err();
        assert!(matches!(err, HardwareError::Bus { .. }));
    }

    #[tokio::test]
    async fn test_overflow_surfaces_as_invalid_data() {
        let (mut link, handle) = MockPeripheral::new();
        handle.push_bytes(vec![b'A'; 41]).await.unwrap();

        let err = link.poll().await.unwrap_err();
        assert!(matches!(err, HardwareError::InvalidData { .. }));
    }

    #[tokio::test]
    async fn test_dropped_handle_disconnects() {
        let (mut link, handle) = MockPeripheral::new();
        drop(handle);

        let err = link.poll().await.unwrap_err();
        assert!(matches!(err, HardwareError::Disconnected { .. }));
        assert!(link.send(ReplyCode::Ok).await.is_ok());
    }

    #[tokio::test]
    async fn test_replies_are_recorded() {
        let (mut link, mut handle) = MockPeripheral::new();

        link.send(ReplyCode::Ok).await.unwrap();
        link.send(ReplyCode::Err).await.unwrap();

        assert_eq!(handle.replies(), vec![ReplyCode::Ok, ReplyCode::Err]);
        assert_eq!(handle.try_next_reply(), None);
    }

    #[tokio::test]
    async fn test_poll_count() {
        let (mut link, handle) = MockPeripheral::new();

        for _ in 0..3 {
            let _ = link.poll().await;
        }
        assert_eq!(handle.poll_count(), 3);
    }
}
