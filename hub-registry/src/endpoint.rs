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

//! Application-facing handler traits attached to routes.
//!
//! Handlers only run for calls that passed the route's middleware; a
//! rejected call never reaches them.

use crate::transport::{Args, PeerId};
use async_trait::async_trait;
use serde_json::Value;

/// Host-side handler for a fire-and-forget route.
#[async_trait]
pub trait EventEndpoint: Send + Sync {
    async fn on_event(&self, peer: PeerId, args: Args);
}

/// Host-side handler for a request/response route. The returned value is
/// sent back to the originating peer as a single reply message.
#[async_trait]
pub trait InvokeEndpoint: Send + Sync {
    async fn on_invoke(&self, peer: PeerId, args: Args) -> Value;
}

/// Peer-side handler for messages arriving on a fire-and-forget route.
#[async_trait]
pub trait InboundEndpoint: Send + Sync {
    async fn on_message(&self, args: Args);
}
