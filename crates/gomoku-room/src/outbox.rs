//! Per-connection outbound queues.
//!
//! Producers (room and registry actors) must never wait on a slow peer, so
//! [`Outbox::push`] uses `try_send` on a bounded queue. When the queue is
//! full the peer is considered dead: the outbox closes, the writer pump
//! stops, and the reader pump sees [`Outbox::closed`] and disconnects.

use std::sync::Arc;

use gomoku_protocol::ServerMessage;
use gomoku_transport::ConnectionId;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

use crate::OutboxError;

/// Creates the sending and draining ends of a connection's queue.
pub fn outbox(id: ConnectionId, capacity: usize) -> (Outbox, OutboxReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (closed_tx, closed_rx) = watch::channel(false);
    let outbox = Outbox {
        id,
        tx,
        closed: Arc::new(closed_tx),
    };
    let receiver = OutboxReceiver {
        rx,
        closed: closed_rx,
    };
    (outbox, receiver)
}

/// The sending end. Clones share the queue and the closed flag.
#[derive(Debug, Clone)]
pub struct Outbox {
    id: ConnectionId,
    tx: mpsc::Sender<ServerMessage>,
    closed: Arc<watch::Sender<bool>>,
}

impl Outbox {
    /// The connection this queue delivers to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues `msg` without waiting.
    ///
    /// # Errors
    /// [`OutboxError::Full`] if the peer has fallen behind; the outbox is
    /// closed as a side effect. [`OutboxError::Closed`] if it was already
    /// closed.
    pub fn push(&self, msg: ServerMessage) -> Result<(), OutboxError> {
        if self.is_closed() {
            return Err(OutboxError::Closed);
        }
        match self.tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.close();
                Err(OutboxError::Full)
            }
            Err(TrySendError::Closed(_)) => {
                self.close();
                Err(OutboxError::Closed)
            }
        }
    }

    /// Marks the outbox closed. Safe to call any number of times.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the outbox has been closed.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives in `self`, so this only ends on close.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

/// The draining end, owned by the connection's writer pump.
#[derive(Debug)]
pub struct OutboxReceiver {
    rx: mpsc::Receiver<ServerMessage>,
    closed: watch::Receiver<bool>,
}

impl OutboxReceiver {
    /// Next queued message.
    ///
    /// Returns `None` as soon as the outbox is closed, discarding anything
    /// still queued, or once every [`Outbox`] has been dropped and the queue
    /// is drained.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        if *self.closed.borrow() {
            return None;
        }
        tokio::select! {
            biased;
            closed = wait_closed(&mut self.closed) => {
                if closed {
                    None
                } else {
                    // Every sender is gone; drain what is left.
                    self.rx.recv().await
                }
            }
            msg = self.rx.recv() => msg,
        }
    }
}

/// `true` on close, `false` if every sender was dropped first.
async fn wait_closed(rx: &mut watch::Receiver<bool>) -> bool {
    rx.wait_for(|closed| *closed).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> ConnectionId {
        ConnectionId::new(1)
    }

    #[tokio::test]
    async fn test_push_then_recv_in_order() {
        let (outbox, mut rx) = outbox(conn(), 4);
        outbox.push(ServerMessage::error("a")).unwrap();
        outbox.push(ServerMessage::error("b")).unwrap();

        assert_eq!(rx.recv().await, Some(ServerMessage::error("a")));
        assert_eq!(rx.recv().await, Some(ServerMessage::error("b")));
    }

    #[tokio::test]
    async fn test_full_queue_closes_outbox() {
        let (outbox, mut rx) = outbox(conn(), 1);
        outbox.push(ServerMessage::error("first")).unwrap();

        let err = outbox.push(ServerMessage::error("second")).unwrap_err();

        assert_eq!(err, OutboxError::Full);
        assert!(outbox.is_closed());
        assert_eq!(
            outbox.push(ServerMessage::error("third")),
            Err(OutboxError::Closed)
        );
        assert_eq!(rx.recv().await, None, "closed outbox yields nothing");
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_wakes_waiters() {
        let (outbox, mut rx) = outbox(conn(), 4);
        let waiter = {
            let outbox = outbox.clone();
            tokio::spawn(async move { outbox.closed().await })
        };

        outbox.close();
        outbox.close();

        waiter.await.unwrap();
        assert!(outbox.is_closed());
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_recv_drains_after_all_senders_drop() {
        let (outbox, mut rx) = outbox(conn(), 4);
        outbox.push(ServerMessage::error("last words")).unwrap();
        drop(outbox);

        assert_eq!(rx.recv().await, Some(ServerMessage::error("last words")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_push_after_receiver_dropped_is_closed() {
        let (outbox, rx) = outbox(conn(), 4);
        drop(rx);

        assert_eq!(
            outbox.push(ServerMessage::error("nobody home")),
            Err(OutboxError::Closed)
        );
        assert!(outbox.is_closed());
    }
}
