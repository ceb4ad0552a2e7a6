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

//! Derivative peer-side registry.
//!
//! Bootstraps with exactly one blocking call to the host's introspection
//! endpoint; from then on every operation runs against the returned
//! flattened snapshot — the peer never traverses a tree and cannot add
//! routes. The local cooldown check is purely advisory for responsiveness;
//! real enforcement is host-side.

use crate::control_plane::address::ROUTES_ADDRESS;
use crate::data_plane::inbound_dispatch::InboundDispatch;
use crate::data_plane::reply_slot::ReplySlot;
use crate::data_plane::ListenerHost;
use crate::endpoint::InboundEndpoint;
use crate::error::RegistryError;
use crate::observability::{events, fields};
use crate::route::{CallKind, ListenMode};
use crate::table::RoutingTable;
use crate::transport::{Args, ChannelResolver, PeerChannel, PeerChannelListener};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const COMPONENT: &str = "peer_registry";

/// Fixed timeout for the single bootstrap call.
pub const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PeerRegistry {
    inner: Arc<PeerInner>,
}

impl PeerRegistry {
    /// Creates the process-wide peer registry. Nothing works until
    /// [`start`](Self::start) has obtained the routing table.
    pub fn new(resolver: Arc<dyn ChannelResolver>) -> Self {
        Self {
            inner: Arc::new(PeerInner {
                resolver,
                table: Mutex::new(None),
                send_log: Mutex::new(HashMap::new()),
                listeners: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Performs the one-shot bootstrap. On failure the registry reverts to
    /// uninitialized so every later call fails fast with
    /// [`RegistryError::NotInitialized`]; there is no retry.
    pub async fn start(&self) -> Result<(), RegistryError> {
        self.inner.start().await
    }

    /// Sends on a fire-and-forget route.
    pub async fn send(&self, address: &str, args: Args) -> Result<(), RegistryError> {
        self.inner.send(address, args).await
    }

    /// Attaches the at-most-one local listener for a fire-and-forget route.
    pub async fn listen(
        &self,
        mode: ListenMode,
        address: &str,
        endpoint: Arc<dyn InboundEndpoint>,
    ) -> Result<(), RegistryError> {
        self.inner.listen(mode, address, endpoint).await
    }

    /// Detaches the local listener for an address; idempotent when none.
    pub async fn unlisten(&self, address: &str) -> Result<(), RegistryError> {
        self.inner.unlisten(address).await
    }

    /// Calls a request/response route and waits for its reply, up to
    /// `timeout`. Returns `None` when no reply arrived in time.
    pub async fn invoke(
        &self,
        address: &str,
        timeout: Duration,
        args: Args,
    ) -> Result<Option<Value>, RegistryError> {
        self.inner.invoke(address, timeout, args).await
    }
}

struct PeerRoute {
    channel: Arc<dyn PeerChannel>,
    call_kind: CallKind,
    cooldown: Option<Duration>,
}

struct PeerInner {
    resolver: Arc<dyn ChannelResolver>,
    /// `None` until bootstrap succeeds; doubles as the initialization state.
    table: Mutex<Option<HashMap<String, PeerRoute>>>,
    /// Last send per address, for the advisory pre-flight cooldown check.
    send_log: Mutex<HashMap<String, Instant>>,
    listeners: Mutex<HashMap<String, Arc<dyn PeerChannelListener>>>,
    /// Addresses with an outstanding `invoke`; overlapping calls to one
    /// address would race for the same reply, so they are rejected.
    in_flight: Mutex<HashSet<String>>,
}

impl PeerInner {
    async fn start(self: &Arc<Self>) -> Result<(), RegistryError> {
        if self.table.lock().await.is_some() {
            return Ok(());
        }

        debug!(
            event = events::PEER_BOOTSTRAP_START,
            component = COMPONENT,
            address = ROUTES_ADDRESS,
            "requesting routing table"
        );

        let bootstrap = self
            .resolver
            .open_channel(ROUTES_ADDRESS, true)
            .await
            .map_err(|err| {
                warn!(
                    event = events::PEER_BOOTSTRAP_FAILED,
                    component = COMPONENT,
                    reason = fields::REASON_CHANNEL_OPEN_FAILED,
                    err = %err,
                    "unable to open bootstrap channel"
                );
                RegistryError::BootstrapFailed(format!("unable to open bootstrap channel: {err}"))
            })?;

        let reply = request_reply(&bootstrap, BOOTSTRAP_TIMEOUT, Vec::new())
            .await
            .map_err(|err| {
                warn!(
                    event = events::PEER_BOOTSTRAP_FAILED,
                    component = COMPONENT,
                    err = %err,
                    "bootstrap request failed"
                );
                RegistryError::BootstrapFailed(format!("bootstrap request failed: {err}"))
            })?;

        let Some(reply) = reply else {
            warn!(
                event = events::PEER_BOOTSTRAP_FAILED,
                component = COMPONENT,
                reason = fields::REASON_TIMEOUT,
                "no routing table within bootstrap timeout"
            );
            return Err(RegistryError::BootstrapFailed(
                "no routing table within bootstrap timeout".to_string(),
            ));
        };

        let table: RoutingTable = serde_json::from_value(reply).map_err(|err| {
            warn!(
                event = events::PEER_BOOTSTRAP_FAILED,
                component = COMPONENT,
                reason = fields::REASON_UNDECODABLE_TABLE,
                err = %err,
                "routing table reply was undecodable"
            );
            RegistryError::BootstrapFailed(format!("undecodable routing table: {err}"))
        })?;

        let mut entries = HashMap::with_capacity(table.len());
        for (address, descriptor) in table {
            let channel = self
                .resolver
                .open_channel(&descriptor.channel_id, descriptor.secure)
                .await
                .map_err(|err| {
                    warn!(
                        event = events::PEER_BOOTSTRAP_FAILED,
                        component = COMPONENT,
                        address = %address,
                        reason = fields::REASON_CHANNEL_OPEN_FAILED,
                        err = %err,
                        "unable to open granted channel"
                    );
                    RegistryError::BootstrapFailed(format!(
                        "unable to open channel for {address}: {err}"
                    ))
                })?;
            entries.insert(
                address,
                PeerRoute {
                    channel,
                    call_kind: descriptor.call_kind,
                    cooldown: descriptor.cooldown.map(Duration::from_secs_f64),
                },
            );
        }

        let route_count = entries.len();
        *self.table.lock().await = Some(entries);
        info!(
            event = events::PEER_BOOTSTRAP_OK,
            component = COMPONENT,
            route_count,
            "routing table installed"
        );
        Ok(())
    }

    /// Looks up an address, requiring the given call kind.
    async fn resolve(
        &self,
        address: &str,
        expected: CallKind,
    ) -> Result<(String, Arc<dyn PeerChannel>, Option<Duration>), RegistryError> {
        let address = address.trim().to_lowercase();
        let table = self.table.lock().await;
        let entries = table.as_ref().ok_or(RegistryError::NotInitialized)?;
        let entry = entries
            .get(&address)
            .ok_or_else(|| RegistryError::RouteNotFound(address.clone()))?;
        if entry.call_kind != expected {
            return Err(RegistryError::WrongCallKind { address, expected });
        }
        Ok((address, entry.channel.clone(), entry.cooldown))
    }

    async fn check_cooldown(
        &self,
        address: &str,
        cooldown: Option<Duration>,
    ) -> Result<(), RegistryError> {
        let Some(cooldown) = cooldown else {
            return Ok(());
        };
        let send_log = self.send_log.lock().await;
        if let Some(last) = send_log.get(address) {
            if last.elapsed() < cooldown {
                debug!(
                    event = events::PEER_SEND_COOLDOWN_REJECT,
                    component = COMPONENT,
                    address,
                    cooldown_secs = cooldown.as_secs_f64(),
                    "local cooldown active"
                );
                return Err(RegistryError::CooldownActive(address.to_string()));
            }
        }
        Ok(())
    }

    async fn send(&self, address: &str, args: Args) -> Result<(), RegistryError> {
        let (address, channel, cooldown) = self.resolve(address, CallKind::Event).await?;
        self.check_cooldown(&address, cooldown).await?;

        channel.send(args).await.map_err(RegistryError::Transport)?;
        self.send_log.lock().await.insert(address, Instant::now());
        Ok(())
    }

    async fn listen(
        self: &Arc<Self>,
        mode: ListenMode,
        address: &str,
        endpoint: Arc<dyn InboundEndpoint>,
    ) -> Result<(), RegistryError> {
        let (address, channel, _) = self.resolve(address, CallKind::Event).await?;

        let mut listeners = self.listeners.lock().await;
        if listeners.contains_key(&address) {
            return Err(RegistryError::AlreadyConnected(address));
        }

        let host: Arc<dyn ListenerHost> = self.clone();
        let dispatch = Arc::new(InboundDispatch::new(
            address.clone(),
            endpoint,
            mode,
            Arc::downgrade(&host),
        ));
        channel
            .register_listener(dispatch.clone())
            .await
            .map_err(RegistryError::Transport)?;
        listeners.insert(address, dispatch);
        Ok(())
    }

    async fn unlisten(self: &Arc<Self>, address: &str) -> Result<(), RegistryError> {
        let (address, _, _) = self.resolve(address, CallKind::Event).await?;
        self.detach(&address).await;
        Ok(())
    }

    async fn invoke(
        &self,
        address: &str,
        timeout: Duration,
        args: Args,
    ) -> Result<Option<Value>, RegistryError> {
        let (address, channel, cooldown) = self.resolve(address, CallKind::Invoke).await?;
        self.check_cooldown(&address, cooldown).await?;

        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(address.clone()) {
                return Err(RegistryError::AlreadyConnected(address));
            }
        }

        let result = request_reply(&channel, timeout, args).await;
        self.in_flight.lock().await.remove(&address);

        match &result {
            Ok(Some(_)) => {
                self.send_log
                    .lock()
                    .await
                    .insert(address, Instant::now());
            }
            Ok(None) => {
                debug!(
                    event = events::INVOKE_TIMEOUT,
                    component = COMPONENT,
                    address = %address,
                    timeout_secs = timeout.as_secs_f64(),
                    "invoke timed out without reply"
                );
                self.send_log
                    .lock()
                    .await
                    .insert(address, Instant::now());
            }
            Err(_) => {}
        }
        result
    }
}

#[async_trait]
impl ListenerHost for PeerInner {
    async fn detach(&self, address: &str) {
        let Some(listener) = self.listeners.lock().await.remove(address) else {
            return;
        };
        let channel = {
            let table = self.table.lock().await;
            table
                .as_ref()
                .and_then(|entries| entries.get(address))
                .map(|entry| entry.channel.clone())
        };
        if let Some(channel) = channel {
            if let Err(err) = channel.unregister_listener(listener).await {
                warn!(
                    event = events::LISTENER_DETACH_FAILED,
                    component = COMPONENT,
                    address,
                    err = %err,
                    "unable to unregister channel listener"
                );
                return;
            }
        }
        debug!(
            event = events::LISTENER_DETACH_OK,
            component = COMPONENT,
            address,
            "listener detached"
        );
    }
}

/// Sends a request and waits for the next inbound message on the channel as
/// its reply. The one-shot listener is detached unconditionally on exit;
/// `Ok(None)` means the timeout elapsed first.
async fn request_reply(
    channel: &Arc<dyn PeerChannel>,
    timeout: Duration,
    args: Args,
) -> Result<Option<Value>, RegistryError> {
    let (slot, receiver) = ReplySlot::new();
    let listener: Arc<dyn PeerChannelListener> = slot;

    channel
        .register_listener(listener.clone())
        .await
        .map_err(RegistryError::Transport)?;

    let outcome = match channel.send(args).await {
        Ok(()) => match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(value)) => Ok(Some(value)),
            // The sender side was dropped or the timeout elapsed.
            Ok(Err(_)) | Err(_) => Ok(None),
        },
        Err(err) => Err(RegistryError::Transport(err)),
    };

    if let Err(err) = channel.unregister_listener(listener).await {
        warn!(
            event = events::LISTENER_DETACH_FAILED,
            component = COMPONENT,
            err = %err,
            "unable to detach reply listener"
        );
    }

    outcome
}
