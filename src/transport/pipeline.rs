use super::message::CompositeUnit;
use crate::error::TransportError;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

/// Inbound side of the downstream reply pipeline.
///
/// Delivery is fire-and-forget: a successful return means the unit was
/// queued, not that a reply was produced.
pub trait ReplyPipeline: Send + Sync {
    fn deliver<'a>(
        &'a self,
        unit: CompositeUnit,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>>;
}

/// Pipeline backed by a bounded tokio channel; the receiving half belongs
/// to whatever drives the large-model reply.
#[derive(Clone)]
pub struct QueuePipeline {
    tx: mpsc::Sender<CompositeUnit>,
}

impl QueuePipeline {
    pub fn new(tx: mpsc::Sender<CompositeUnit>) -> Self {
        Self { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CompositeUnit>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl ReplyPipeline for QueuePipeline {
    fn deliver<'a>(
        &'a self,
        unit: CompositeUnit,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>> {
        Box::pin(async move {
            self.tx.send(unit).await.map_err(|err| {
                let unit = err.0;
                TransportError::PipelineClosed {
                    chat_id: unit.chat_id,
                    sender_id: unit.sender_id,
                }
            })
        })
    }
}
