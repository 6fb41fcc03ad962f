//! Producer side of an item's reply channel.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::error::{Error, Result};
use crate::model::{Ack, ItemId};

/// Resolves to the acks of every worker that handled one pushed item.
///
/// Await it directly to block until the batch arrives. There is no
/// built-in deadline; use [`Receipt::wait_timeout`] or race it against
/// your own timer. The batch is handed out once, by whichever of
/// awaiting or [`Receipt::try_recv`] gets it first; every later read
/// reports [`Error::Closed`].
#[derive(Debug)]
pub struct Receipt {
    id: ItemId,
    topic: String,
    /// Taken once the batch is handed out or the sender is gone.
    rx: Option<oneshot::Receiver<Vec<Ack>>>,
}

impl Receipt {
    pub(crate) fn new(id: ItemId, topic: String, rx: oneshot::Receiver<Vec<Ack>>) -> Self {
        Self {
            id,
            topic,
            rx: Some(rx),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the acks, giving up after `timeout`.
    pub async fn wait_timeout(self, timeout: Duration) -> Result<Vec<Ack>> {
        let id = self.id;
        tokio::time::timeout(timeout, self)
            .await
            .map_err(|_| Error::Timeout(id))?
    }

    /// Take the acks if they have been delivered, without waiting.
    ///
    /// Returns `Ok(None)` while the item is still pending. The batch is
    /// handed out once; later calls report [`Error::Closed`].
    pub fn try_recv(&mut self) -> Result<Option<Vec<Ack>>> {
        let Some(rx) = self.rx.as_mut() else {
            return Err(Error::Closed(self.id));
        };
        match rx.try_recv() {
            Ok(acks) => {
                self.rx = None;
                Ok(Some(acks))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => {
                self.rx = None;
                Err(Error::Closed(self.id))
            }
        }
    }
}

impl Future for Receipt {
    type Output = Result<Vec<Ack>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let id = self.id;
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(Err(Error::Closed(id)));
        };
        let delivered = std::task::ready!(Pin::new(rx).poll(cx));
        self.rx = None;
        Poll::Ready(delivered.map_err(|_| Error::Closed(id)))
    }
}
