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

//! One addressable endpoint in the route namespace.
//!
//! A [`Route`] owns exactly one transport channel, created with the route and
//! never shared. Its call kind is a tagged variant so dispatch sites match
//! exhaustively instead of branching on a string tag: event routes carry a
//! listener slot only, invoke routes additionally reply to the caller over
//! the route's own channel.

use crate::error::RegistryError;
use crate::middleware::Middleware;
use crate::transport::{ChannelFactory, HostChannel, HostChannelListener};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Cooldown attached to routes synthesized for missing ancestors.
pub(crate) const DEFAULT_ANCESTOR_COOLDOWN: Duration = Duration::from_secs(1);

/// Whether an endpoint is fire-and-forget or request/response.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallKind {
    /// Fire-and-forget; deliveries carry no reply.
    Event,
    /// Request/response; the handler's return value is sent back to the
    /// originating peer over the same channel.
    Invoke,
}

impl Display for CallKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CallKind::Event => write!(f, "event"),
            CallKind::Invoke => write!(f, "invoke"),
        }
    }
}

/// How long a listener stays attached.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ListenMode {
    Persistent,
    /// Detaches itself after the first accepted delivery.
    Once,
}

/// Holder for a route's at-most-one active listener.
pub(crate) struct ListenerSlot {
    attached: Mutex<Option<Arc<dyn HostChannelListener>>>,
}

impl ListenerSlot {
    fn new() -> Self {
        Self {
            attached: Mutex::new(None),
        }
    }

    /// Stores `listener` unless the slot is occupied; returns whether it was
    /// stored.
    pub(crate) async fn attach(&self, listener: Arc<dyn HostChannelListener>) -> bool {
        let mut attached = self.attached.lock().await;
        if attached.is_some() {
            return false;
        }
        *attached = Some(listener);
        true
    }

    /// Removes and returns the attached listener, if any.
    pub(crate) async fn take(&self) -> Option<Arc<dyn HostChannelListener>> {
        self.attached.lock().await.take()
    }
}

/// Kind-specific connection state of a route.
pub(crate) enum RouteBinding {
    Event(ListenerSlot),
    Invoke(ListenerSlot),
}

impl RouteBinding {
    fn for_kind(kind: CallKind) -> Self {
        match kind {
            CallKind::Event => RouteBinding::Event(ListenerSlot::new()),
            CallKind::Invoke => RouteBinding::Invoke(ListenerSlot::new()),
        }
    }

    pub(crate) fn call_kind(&self) -> CallKind {
        match self {
            RouteBinding::Event(_) => CallKind::Event,
            RouteBinding::Invoke(_) => CallKind::Invoke,
        }
    }

    pub(crate) fn slot(&self) -> &ListenerSlot {
        match self {
            RouteBinding::Event(slot) => slot,
            RouteBinding::Invoke(slot) => slot,
        }
    }
}

/// Registration parameters for `new_route`/`edit_route`.
pub struct RouteSpec {
    /// Leaf name of the endpoint under its parent path.
    pub end_point: String,
    /// Selects the guaranteed-delivery channel variant when true, the
    /// best-effort variant when false. Immutable after creation.
    pub secure: bool,
    pub call_kind: CallKind,
    pub middleware: Option<Middleware>,
}

/// One addressable endpoint bound to exactly one transport channel.
pub(crate) struct Route {
    name: String,
    parent_path: String,
    secure: bool,
    address: String,
    channel: Arc<dyn HostChannel>,
    middleware: Option<Middleware>,
    binding: RouteBinding,
}

impl Route {
    /// Creates the route and its channel. The channel id is the full
    /// lower-cased address so peers resolve flattened entries to the
    /// identical channel object.
    pub(crate) async fn build(
        parent_path: &str,
        spec: RouteSpec,
        factory: &Arc<dyn ChannelFactory>,
        group: &str,
    ) -> Result<Self, RegistryError> {
        let name = spec.end_point.to_lowercase();
        let parent_path = parent_path.to_lowercase();
        let address = if parent_path.is_empty() {
            name.clone()
        } else {
            format!("{parent_path}/{name}")
        };

        let channel = factory
            .create_channel(group, &address, spec.secure)
            .await
            .map_err(RegistryError::Transport)?;

        Ok(Self {
            name,
            parent_path,
            secure: spec.secure,
            address,
            channel,
            middleware: spec.middleware,
            binding: RouteBinding::for_kind(spec.call_kind),
        })
    }

    /// Default payload for auto-created ancestors: secure, fire-and-forget,
    /// one-second cooldown.
    pub(crate) async fn build_default(
        parent_path: &str,
        name: &str,
        factory: &Arc<dyn ChannelFactory>,
        group: &str,
    ) -> Result<Self, RegistryError> {
        Self::build(
            parent_path,
            RouteSpec {
                end_point: name.to_string(),
                secure: true,
                call_kind: CallKind::Event,
                middleware: Some(Middleware::new(DEFAULT_ANCESTOR_COOLDOWN)),
            },
            factory,
            group,
        )
        .await
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    #[allow(dead_code)]
    pub(crate) fn parent_path(&self) -> &str {
        &self.parent_path
    }

    pub(crate) fn full_address(&self) -> &str {
        &self.address
    }

    pub(crate) fn secure(&self) -> bool {
        self.secure
    }

    pub(crate) fn call_kind(&self) -> CallKind {
        self.binding.call_kind()
    }

    pub(crate) fn channel(&self) -> &Arc<dyn HostChannel> {
        &self.channel
    }

    pub(crate) fn middleware(&self) -> Option<&Middleware> {
        self.middleware.as_ref()
    }

    pub(crate) fn binding(&self) -> &RouteBinding {
        &self.binding
    }

    pub(crate) fn cooldown_secs(&self) -> Option<f64> {
        self.middleware.as_ref().map(Middleware::cooldown_secs)
    }
}
