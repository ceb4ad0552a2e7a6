//! Peer-side listener for fire-and-forget routes.

use crate::data_plane::ListenerHost;
use crate::endpoint::InboundEndpoint;
use crate::route::ListenMode;
use crate::transport::{Args, PeerChannelListener};
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

pub(crate) struct InboundDispatch {
    address: String,
    endpoint: Arc<dyn InboundEndpoint>,
    mode: ListenMode,
    fired: Mutex<bool>,
    host: Weak<dyn ListenerHost>,
}

impl InboundDispatch {
    pub(crate) fn new(
        address: String,
        endpoint: Arc<dyn InboundEndpoint>,
        mode: ListenMode,
        host: Weak<dyn ListenerHost>,
    ) -> Self {
        Self {
            address,
            endpoint,
            mode,
            fired: Mutex::new(false),
            host,
        }
    }
}

#[async_trait]
impl PeerChannelListener for InboundDispatch {
    async fn on_receive(&self, args: Args) {
        if self.mode == ListenMode::Once {
            let mut fired = self.fired.lock().await;
            if *fired {
                return;
            }
            *fired = true;
        }

        self.endpoint.on_message(args).await;

        if self.mode == ListenMode::Once {
            if let Some(host) = self.host.upgrade() {
                host.detach(&self.address).await;
            }
        }
    }
}
