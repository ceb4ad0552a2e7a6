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

mod config;

use crate::config::{CallKindConfig, Config};
use async_trait::async_trait;
use clap::Parser;
use hub_registry::{
    Args, CallKind, HostRegistry, InvokeEndpoint, ListenMode, Middleware, PeerId, PeerRegistry,
    RouteSpec,
};
use loopback_transport::{LoopbackNetwork, StoreEventEndpoint};
use serde_json::{json, Value};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command()]
struct DemoArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

/// Request/response handler wired onto every invoke route in the config:
/// sums the numeric arguments.
struct SumEndpoint;

#[async_trait]
impl InvokeEndpoint for SumEndpoint {
    async fn on_invoke(&self, peer: PeerId, args: Args) -> Value {
        info!(peer = %peer, "sum endpoint invoked");
        let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
        json!(sum)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt::try_init();

    info!("Started hub-registry-demo");

    // Get the config file.
    let args = DemoArgs::parse();
    let mut file = File::open(args.config)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let config: Config = json5::from_str(&contents)?;

    // The loopback network stands in for the host platform: it supplies the
    // channel factory, the session directory, and each peer's resolver.
    let network = LoopbackNetwork::new();
    let host = HostRegistry::new(
        &config.host.name,
        Arc::new(network.clone()),
        Arc::new(network.clone()),
    );
    host.start().await?;

    // Register every configured route and wire a handler onto it.
    for route in &config.routes {
        let middleware = route
            .cooldown_secs
            .map(|secs| Middleware::new(Duration::from_secs_f64(secs)));
        host.new_route(
            &route.parent,
            RouteSpec {
                end_point: route.end_point.clone(),
                secure: route.secure,
                call_kind: route.call_kind.into(),
                middleware,
            },
        )
        .await?;

        let address = format!("{}/{}", route.parent, route.end_point).to_lowercase();
        match route.call_kind {
            CallKindConfig::Invoke => {
                host.on_invoke(ListenMode::Persistent, &address, Arc::new(SumEndpoint))
                    .await?;
            }
            CallKindConfig::Event => {
                host.on_event(
                    ListenMode::Persistent,
                    &address,
                    Arc::new(StoreEventEndpoint::new()),
                )
                .await?;
            }
        }
        info!(address = %address, call_kind = %CallKind::from(route.call_kind), "route wired");
    }

    // Boot one peer: a single blocking call against the introspection
    // endpoint grants it the flattened table.
    let side = network.connect_peer(PeerId(1)).await;
    let peer = PeerRegistry::new(side);
    peer.start().await?;

    let reply = peer
        .invoke(
            &config.demo.invoke_address,
            Duration::from_secs_f64(config.demo.invoke_timeout_secs),
            config.demo.invoke_args.clone(),
        )
        .await?;
    info!(
        address = %config.demo.invoke_address,
        reply = %reply.map(|value| value.to_string()).unwrap_or_else(|| "timeout".to_string()),
        "invoke completed"
    );

    peer.send(&config.demo.event_address, config.demo.event_args.clone())
        .await?;
    info!(address = %config.demo.event_address, "event sent");

    network.end_session(PeerId(1)).await;

    Ok(())
}
