//! One-shot reply capture behind the peer-side invoke emulation.
//!
//! This is the single place where request/response semantics are synthesized
//! on top of a transport with no native call/reply contract: the next
//! inbound message on the route's channel resolves the waiting caller
//! directly.

use crate::transport::{Args, PeerChannelListener};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::sync::Mutex;

pub(crate) struct ReplySlot {
    sender: Mutex<Option<oneshot::Sender<Value>>>,
}

impl ReplySlot {
    /// Creates the slot and the receiver the caller awaits under its
    /// timeout.
    pub(crate) fn new() -> (Arc<Self>, oneshot::Receiver<Value>) {
        let (sender, receiver) = oneshot::channel();
        (
            Arc::new(Self {
                sender: Mutex::new(Some(sender)),
            }),
            receiver,
        )
    }
}

#[async_trait]
impl PeerChannelListener for ReplySlot {
    async fn on_receive(&self, args: Args) {
        if let Some(sender) = self.sender.lock().await.take() {
            let reply = args.into_iter().next().unwrap_or(Value::Null);
            // The caller may already have timed out and dropped the receiver.
            let _ = sender.send(reply);
        }
    }
}
