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

//! Transport boundary between the registries and the host platform.
//!
//! The registries never implement message delivery themselves. The host
//! process supplies channel objects, peer identities, and session
//! notifications through the traits in this module, the same way a streamer
//! consumes pluggable transports behind a trait seam. Channels come in two
//! variants, guaranteed-delivery and best-effort, selected once at creation
//! by a route's `secure` flag.

use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Positional payload carried by every message.
pub type Args = Vec<Value>;

/// Stable per-session identity of a remote peer.
///
/// Valid as a map key for the lifetime of the peer's session; the host fires
/// a session-end notification exactly once when it becomes invalid.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PeerId(pub u64);

impl Display for PeerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Failure reported by a channel implementation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChannelError {
    message: String,
}

impl ChannelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ChannelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ChannelError {}

/// Callback for messages arriving on the host end of a channel.
///
/// Every host-side delivery is annotated with the originating peer identity.
#[async_trait]
pub trait HostChannelListener: Send + Sync {
    async fn on_receive(&self, peer: PeerId, args: Args);
}

/// Callback for messages arriving on the peer end of a channel.
#[async_trait]
pub trait PeerChannelListener: Send + Sync {
    async fn on_receive(&self, args: Args);
}

/// Host end of one bidirectional message channel.
#[async_trait]
pub trait HostChannel: Send + Sync {
    /// Sends to a single peer.
    async fn unicast(&self, peer: PeerId, args: Args) -> Result<(), ChannelError>;

    /// Sends to every peer with an active session.
    async fn broadcast(&self, args: Args) -> Result<(), ChannelError>;

    async fn register_listener(
        &self,
        listener: Arc<dyn HostChannelListener>,
    ) -> Result<(), ChannelError>;

    async fn unregister_listener(
        &self,
        listener: Arc<dyn HostChannelListener>,
    ) -> Result<(), ChannelError>;
}

/// Peer end of one bidirectional message channel.
#[async_trait]
pub trait PeerChannel: Send + Sync {
    /// Sends to the host.
    async fn send(&self, args: Args) -> Result<(), ChannelError>;

    async fn register_listener(
        &self,
        listener: Arc<dyn PeerChannelListener>,
    ) -> Result<(), ChannelError>;

    async fn unregister_listener(
        &self,
        listener: Arc<dyn PeerChannelListener>,
    ) -> Result<(), ChannelError>;
}

/// Host-side creation of channels inside an opaque named container.
///
/// The container (`group`) exists purely so peers can discover channels by
/// id; the registry treats it as a folder created on demand.
#[async_trait]
pub trait ChannelFactory: Send + Sync {
    /// Creates the channel named `channel_id` under `group`, replacing any
    /// channel previously created under that id.
    async fn create_channel(
        &self,
        group: &str,
        channel_id: &str,
        reliable: bool,
    ) -> Result<Arc<dyn HostChannel>, ChannelError>;
}

/// Peer-side resolution of a channel id from the flattened table to a live
/// channel handle.
#[async_trait]
pub trait ChannelResolver: Send + Sync {
    async fn open_channel(
        &self,
        channel_id: &str,
        reliable: bool,
    ) -> Result<Arc<dyn PeerChannel>, ChannelError>;
}

/// Callback fired exactly once when a peer's session ends.
#[async_trait]
pub trait SessionEndListener: Send + Sync {
    async fn on_session_end(&self, peer: PeerId);
}

/// Host-provided view of which peers currently have a live session.
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    async fn active_peers(&self) -> Vec<PeerId>;

    async fn is_active(&self, peer: PeerId) -> bool;

    async fn subscribe_session_end(&self, listener: Arc<dyn SessionEndListener>);
}
