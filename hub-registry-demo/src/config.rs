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

use hub_registry::CallKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub(crate) host: HostConfig,
    pub(crate) routes: Vec<RouteConfig>,
    pub(crate) demo: DemoConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    pub(crate) name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub(crate) parent: String,
    pub(crate) end_point: String,
    pub(crate) secure: bool,
    pub(crate) call_kind: CallKindConfig,
    #[serde(default)]
    pub(crate) cooldown_secs: Option<f64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CallKindConfig {
    Event,
    Invoke,
}

impl From<CallKindConfig> for CallKind {
    fn from(kind: CallKindConfig) -> Self {
        match kind {
            CallKindConfig::Event => CallKind::Event,
            CallKindConfig::Invoke => CallKind::Invoke,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    pub(crate) invoke_address: String,
    pub(crate) invoke_args: Vec<Value>,
    pub(crate) invoke_timeout_secs: f64,
    pub(crate) event_address: String,
    pub(crate) event_args: Vec<Value>,
}
