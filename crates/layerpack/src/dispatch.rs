//! Delivery of finished layers to the consumer.
//!
//! The loader hands every [`LayerResult`] to a [`Dispatcher`] by value. The
//! default dispatcher posts results to an `async_channel`, which the consumer
//! can drain from an async task, a blocking thread, or a per-frame
//! `try_recv` poll.

use crate::types::LayerResult;

/// Receives finished layers, in load order.
pub trait Dispatcher<I>: Send {
    /// Hand over one finished layer.
    fn dispatch(&self, result: LayerResult<I>);
}

impl<I, F> Dispatcher<I> for F
where
    F: Fn(LayerResult<I>) + Send,
{
    fn dispatch(&self, result: LayerResult<I>) {
        self(result);
    }
}

/// Posts finished layers onto an unbounded channel.
#[derive(Debug)]
pub struct ChannelDispatcher<I> {
    tx: async_channel::Sender<LayerResult<I>>,
}

impl<I> Clone for ChannelDispatcher<I> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<I> ChannelDispatcher<I> {
    /// Wrap an existing sender.
    #[must_use]
    pub fn new(tx: async_channel::Sender<LayerResult<I>>) -> Self {
        Self { tx }
    }
}

impl<I: Send> Dispatcher<I> for ChannelDispatcher<I> {
    fn dispatch(&self, result: LayerResult<I>) {
        let layer_id = result.layer_id();
        // Unbounded, so this only fails once the receiver is gone.
        if self.tx.try_send(result).is_err() {
            tracing::debug!(layer_id, "layer receiver dropped, discarding result");
        }
    }
}

/// Create a dispatcher and the receiver its results arrive on.
#[must_use]
pub fn channel<I>() -> (ChannelDispatcher<I>, async_channel::Receiver<LayerResult<I>>) {
    let (tx, rx) = async_channel::unbounded();
    (ChannelDispatcher::new(tx), rx)
}
