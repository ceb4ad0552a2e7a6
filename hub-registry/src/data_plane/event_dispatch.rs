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

//! Host-side listener for fire-and-forget routes.

use crate::data_plane::detach_once;
use crate::endpoint::EventEndpoint;
use crate::route::{ListenMode, Route};
use crate::transport::{Args, HostChannelListener, PeerId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

const COMPONENT: &str = "event_dispatch";

pub(crate) struct EventDispatch {
    listener_id: String,
    route: Arc<Route>,
    endpoint: Arc<dyn EventEndpoint>,
    mode: ListenMode,
}

impl EventDispatch {
    pub(crate) fn new(
        route: Arc<Route>,
        endpoint: Arc<dyn EventEndpoint>,
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
impl HostChannelListener for EventDispatch {
    async fn on_receive(&self, peer: PeerId, args: Args) {
        let arrived = Instant::now();
        if let Some(middleware) = self.route.middleware() {
            if !middleware.execute(peer, arrived, &args).await {
                return;
            }
        }

        self.endpoint.on_event(peer, args).await;

        if self.mode == ListenMode::Once {
            detach_once(&self.route, COMPONENT, &self.listener_id).await;
        }
    }
}
