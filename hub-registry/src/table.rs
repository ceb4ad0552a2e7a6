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

//! The flattened routing table: the one wire format shipped to peers.
//!
//! A peer receives this table exactly once at bootstrap and treats it as its
//! entire routing surface. Every key must resolve on the peer side to the
//! identical channel the host created, which is why the channel id is the
//! full lower-cased address.

use crate::route::{CallKind, Route};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One flattened route entry as granted to peers.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouteDescriptor {
    pub channel_id: String,
    pub secure: bool,
    pub call_kind: CallKind,
    /// Cooldown in seconds, present only for routes carrying middleware.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<f64>,
}

/// Full address to descriptor; consumed as a mapping, never as a sequence.
pub type RoutingTable = HashMap<String, RouteDescriptor>;

pub(crate) fn from_flattened(entries: Vec<(String, Arc<Route>)>) -> RoutingTable {
    entries
        .into_iter()
        .map(|(address, route)| {
            let descriptor = RouteDescriptor {
                channel_id: route.full_address().to_string(),
                secure: route.secure(),
                call_kind: route.call_kind(),
                cooldown: route.cooldown_secs(),
            };
            (address, descriptor)
        })
        .collect()
}
