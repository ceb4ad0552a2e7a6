/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use async_trait::async_trait;
use futures::future::join_all;
use hub_registry::{
    Args, ChannelError, ChannelFactory, ChannelResolver, HostChannel, HostChannelListener,
    PeerChannel, PeerChannelListener, PeerId, SessionDirectory, SessionEndListener,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

const COMPONENT: &str = "loopback_network";

/// One shared channel: the host end and every peer end resolve to the same
/// core by channel id.
struct ChannelCore {
    reliable: bool,
    host_listeners: Mutex<Vec<Arc<dyn HostChannelListener>>>,
    peer_listeners: Mutex<HashMap<PeerId, Vec<Arc<dyn PeerChannelListener>>>>,
}

impl ChannelCore {
    fn new(reliable: bool) -> Self {
        Self {
            reliable,
            host_listeners: Mutex::new(Vec::new()),
            peer_listeners: Mutex::new(HashMap::new()),
        }
    }
}

struct NetworkInner {
    channels: Mutex<HashMap<String, Arc<ChannelCore>>>,
    active: Mutex<HashSet<PeerId>>,
    session_end: Mutex<Vec<Arc<dyn SessionEndListener>>>,
}

/// In-memory host platform: channel factory, session directory, and the
/// entry point for simulated peers.
#[derive(Clone)]
pub struct LoopbackNetwork {
    inner: Arc<NetworkInner>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                channels: Mutex::new(HashMap::new()),
                active: Mutex::new(HashSet::new()),
                session_end: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Starts a session for `peer` and returns its side of the network.
    pub async fn connect_peer(&self, peer: PeerId) -> Arc<LoopbackPeer> {
        self.inner.active.lock().await.insert(peer);
        debug!(component = COMPONENT, peer = %peer, "peer session opened");
        Arc::new(LoopbackPeer {
            peer,
            inner: self.inner.clone(),
        })
    }

    /// Ends the peer's session: drops its channel listeners and fires the
    /// session-end notification exactly once.
    pub async fn end_session(&self, peer: PeerId) {
        if !self.inner.active.lock().await.remove(&peer) {
            return;
        }

        let channels: Vec<Arc<ChannelCore>> =
            self.inner.channels.lock().await.values().cloned().collect();
        for channel in channels {
            channel.peer_listeners.lock().await.remove(&peer);
        }

        let listeners = self.inner.session_end.lock().await.clone();
        for listener in listeners {
            listener.on_session_end(peer).await;
        }
        debug!(component = COMPONENT, peer = %peer, "peer session ended");
    }
}

impl Default for LoopbackNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelFactory for LoopbackNetwork {
    async fn create_channel(
        &self,
        _group: &str,
        channel_id: &str,
        reliable: bool,
    ) -> Result<Arc<dyn HostChannel>, ChannelError> {
        let core = Arc::new(ChannelCore::new(reliable));
        self.inner
            .channels
            .lock()
            .await
            .insert(channel_id.to_string(), core.clone());
        debug!(
            component = COMPONENT,
            channel_id, reliable, "channel created"
        );
        Ok(Arc::new(HostSide {
            inner: self.inner.clone(),
            core,
        }))
    }
}

#[async_trait]
impl SessionDirectory for LoopbackNetwork {
    async fn active_peers(&self) -> Vec<PeerId> {
        self.inner.active.lock().await.iter().copied().collect()
    }

    async fn is_active(&self, peer: PeerId) -> bool {
        self.inner.active.lock().await.contains(&peer)
    }

    async fn subscribe_session_end(&self, listener: Arc<dyn SessionEndListener>) {
        self.inner.session_end.lock().await.push(listener);
    }
}

struct HostSide {
    inner: Arc<NetworkInner>,
    core: Arc<ChannelCore>,
}

#[async_trait]
impl HostChannel for HostSide {
    async fn unicast(&self, peer: PeerId, args: Args) -> Result<(), ChannelError> {
        // Snapshot outside the dispatch so a listener may call back into the
        // network without deadlocking.
        let listeners = self
            .core
            .peer_listeners
            .lock()
            .await
            .get(&peer)
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            listener.on_receive(args.clone()).await;
        }
        Ok(())
    }

    async fn broadcast(&self, args: Args) -> Result<(), ChannelError> {
        let listeners: Vec<Arc<dyn PeerChannelListener>> = {
            let peer_listeners = self.core.peer_listeners.lock().await;
            let active = self.inner.active.lock().await;
            peer_listeners
                .iter()
                .filter(|(peer, _)| active.contains(peer))
                .flat_map(|(_, listeners)| listeners.iter().cloned())
                .collect()
        };
        join_all(
            listeners
                .iter()
                .map(|listener| listener.on_receive(args.clone())),
        )
        .await;
        Ok(())
    }

    async fn register_listener(
        &self,
        listener: Arc<dyn HostChannelListener>,
    ) -> Result<(), ChannelError> {
        self.core.host_listeners.lock().await.push(listener);
        Ok(())
    }

    async fn unregister_listener(
        &self,
        listener: Arc<dyn HostChannelListener>,
    ) -> Result<(), ChannelError> {
        self.core
            .host_listeners
            .lock()
            .await
            .retain(|registered| !Arc::ptr_eq(registered, &listener));
        Ok(())
    }
}

/// One simulated peer's view of the network.
pub struct LoopbackPeer {
    peer: PeerId,
    inner: Arc<NetworkInner>,
}

impl LoopbackPeer {
    pub fn peer(&self) -> PeerId {
        self.peer
    }
}

#[async_trait]
impl ChannelResolver for LoopbackPeer {
    async fn open_channel(
        &self,
        channel_id: &str,
        reliable: bool,
    ) -> Result<Arc<dyn PeerChannel>, ChannelError> {
        let core = self
            .inner
            .channels
            .lock()
            .await
            .get(channel_id)
            .cloned()
            .ok_or_else(|| ChannelError::new(format!("no channel named {channel_id}")))?;
        if core.reliable != reliable {
            return Err(ChannelError::new(format!(
                "channel variant mismatch for {channel_id}"
            )));
        }
        Ok(Arc::new(PeerSide {
            peer: self.peer,
            core,
        }))
    }
}

struct PeerSide {
    peer: PeerId,
    core: Arc<ChannelCore>,
}

#[async_trait]
impl PeerChannel for PeerSide {
    async fn send(&self, args: Args) -> Result<(), ChannelError> {
        let listeners = self.core.host_listeners.lock().await.clone();
        for listener in listeners {
            listener.on_receive(self.peer, args.clone()).await;
        }
        Ok(())
    }

    async fn register_listener(
        &self,
        listener: Arc<dyn PeerChannelListener>,
    ) -> Result<(), ChannelError> {
        self.core
            .peer_listeners
            .lock()
            .await
            .entry(self.peer)
            .or_default()
            .push(listener);
        Ok(())
    }

    async fn unregister_listener(
        &self,
        listener: Arc<dyn PeerChannelListener>,
    ) -> Result<(), ChannelError> {
        let mut peer_listeners = self.core.peer_listeners.lock().await;
        if let Some(listeners) = peer_listeners.get_mut(&self.peer) {
            listeners.retain(|registered| !Arc::ptr_eq(registered, &listener));
        }
        Ok(())
    }
}
