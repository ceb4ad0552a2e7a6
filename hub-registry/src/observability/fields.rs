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

//! Canonical structured field keys and value-format helpers.

use crate::route::CallKind;
use crate::transport::PeerId;
use std::time::Duration;

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const ADDRESS: &str = "address";
pub const PEER: &str = "peer";
pub const CALL_KIND: &str = "call_kind";
pub const COOLDOWN_SECS: &str = "cooldown_secs";
pub const LISTENER_ID: &str = "listener_id";
pub const ROUTE_COUNT: &str = "route_count";
pub const ERR: &str = "err";
pub const REASON: &str = "reason";

pub const NONE: &str = "none";
pub const REASON_TIMEOUT: &str = "timeout";
pub const REASON_UNDECODABLE_TABLE: &str = "undecodable_table";
pub const REASON_CHANNEL_OPEN_FAILED: &str = "channel_open_failed";

pub fn format_peer(peer: PeerId) -> String {
    peer.to_string()
}

pub fn format_call_kind(kind: CallKind) -> String {
    kind.to_string()
}

pub fn format_cooldown(cooldown: Option<Duration>) -> String {
    cooldown
        .map(|value| format!("{}", value.as_secs_f64()))
        .unwrap_or_else(|| NONE.to_string())
}
