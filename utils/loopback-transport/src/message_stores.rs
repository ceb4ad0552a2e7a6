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
use hub_registry::{Args, EventEndpoint, InboundEndpoint, PeerId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Host-side endpoint that records every delivered event.
#[derive(Clone, Default)]
pub struct StoreEventEndpoint {
    message_store: Arc<Mutex<Vec<(PeerId, Args)>>>,
}

impl StoreEventEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retrieve_message_store(&self) -> Arc<Mutex<Vec<(PeerId, Args)>>> {
        self.message_store.clone()
    }
}

#[async_trait]
impl EventEndpoint for StoreEventEndpoint {
    async fn on_event(&self, peer: PeerId, args: Args) {
        debug!(peer = %peer, "store event endpoint received message");
        self.message_store.lock().await.push((peer, args));
    }
}

/// Peer-side endpoint that records every delivered message.
#[derive(Clone, Default)]
pub struct StoreInboundEndpoint {
    message_store: Arc<Mutex<Vec<Args>>>,
}

impl StoreInboundEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retrieve_message_store(&self) -> Arc<Mutex<Vec<Args>>> {
        self.message_store.clone()
    }
}

#[async_trait]
impl InboundEndpoint for StoreInboundEndpoint {
    async fn on_message(&self, args: Args) {
        debug!("store inbound endpoint received message");
        self.message_store.lock().await.push(args);
    }
}
