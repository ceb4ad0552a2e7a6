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

//! Host-side listener for request/response routes.
//!
//! The reply is sent back to the originating peer over the route's own
//! channel as a single message. There is no correlation id on the wire; the
//! peer side serializes overlapping calls per address to keep replies
//! unambiguous.

use crate::data_plane::detach_once;
use crate::endpoint::InvokeEndpoint;
use crate::observability::events;
use crate::route::{ListenMode, Route};
use crate::transport::{Args, HostChannelListener, PeerId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;
use uuid::Uuid;

const COMPONENT: &str = "invoke_dispatch";

pub(crate) struct InvokeDispatch {
    listener_id: String,
    route: Arc<Route>,
    endpoint: Arc<dyn InvokeEndpoint>,
    mode: ListenMode,
}

impl InvokeDispatch {
    pub(crate) fn new(
        route: Arc<Route>,
        endpoint: Arc<dyn InvokeEndpoint>,
        mode: ListenMode,
    ) -> Self {
        Self {
            listener_id: Uuid::new_v4().to_string(),
            route,
            endpoint,
            mode,
        }
    }

    pub(crate) fn listener_id(&self) -> &str {
        &self.listener_id
    }
}

#[async_trait]
impl HostChannelListener for InvokeDispatch {
    async fn on_receive(&self, peer: PeerId, args: Args) {
        let arrived = Instant::now();
        if let Some(middleware) = self.route.middleware() {
            if !middleware.execute(peer, arrived, &args).await {
                return;
            }
        }

        let reply = self.endpoint.on_invoke(peer, args).await;

        if let Err(err) = self.route.channel().unicast(peer, vec![reply]).await {
            warn!(
                event = events::INVOKE_REPLY_SEND_FAILED,
                component = COMPONENT,
                address = self.route.full_address(),
                peer = %peer,
                err = %err,
                "unable to send invoke reply"
            );
        }

        if self.mode == ListenMode::Once {
            detach_once(&self.route, COMPONENT, &self.listener_id).await;
        }
    }
}
