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

//! In-memory implementation of the `hub-registry` transport boundary.
//!
//! One [`LoopbackNetwork`] stands in for the host platform: it hands the
//! host registry a channel factory and session directory, and hands each
//! simulated peer a channel resolver. Delivery is immediate and in-process;
//! the best-effort channel variant is delivered just like the reliable one.

mod loopback_network;
pub use loopback_network::{LoopbackNetwork, LoopbackPeer};

mod message_stores;
pub use message_stores::{StoreEventEndpoint, StoreInboundEndpoint};
