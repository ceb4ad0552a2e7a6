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

mod support;

use hub_registry::{CallKind, PeerId, RegistryError, RouteSpec};
use loopback_transport::LoopbackNetwork;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

async fn register_silent_invoke_route(host: &hub_registry::HostRegistry) {
    // Request/response route with no handler attached: no reply ever comes.
    host.new_route(
        "hub",
        RouteSpec {
            end_point: "silent".to_string(),
            secure: true,
            call_kind: CallKind::Invoke,
            middleware: None,
        },
    )
    .await
    .expect("route registration");
}

#[tokio::test(flavor = "multi_thread")]
async fn invoke_without_a_reply_returns_none_after_the_timeout() {
    support::init_logging();

    let network = LoopbackNetwork::new();
    let host = support::start_host(&network).await;
    register_silent_invoke_route(&host).await;

    let (peer, _side) = support::bootstrap_peer(&network, PeerId(1)).await;

    let started = Instant::now();
    let reply = peer
        .invoke("hub/silent", Duration::from_millis(200), vec![json!(1)])
        .await
        .expect("invoke itself succeeds");
    let elapsed = started.elapsed();

    assert_eq!(reply, None);
    // Neither instant nor unbounded: the wait tracks the requested timeout.
    assert!(elapsed >= Duration::from_millis(180), "returned too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "returned too late: {elapsed:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn overlapping_invokes_to_one_address_are_rejected() {
    support::init_logging();

    let network = LoopbackNetwork::new();
    let host = support::start_host(&network).await;
    register_silent_invoke_route(&host).await;

    let (peer, _side) = support::bootstrap_peer(&network, PeerId(1)).await;
    let peer = Arc::new(peer);

    let first = {
        let peer = peer.clone();
        tokio::spawn(async move {
            peer.invoke("hub/silent", Duration::from_millis(500), Vec::new())
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        peer.invoke("hub/silent", Duration::from_millis(100), Vec::new())
            .await,
        Err(RegistryError::AlreadyConnected("hub/silent".to_string()))
    );

    let outcome = first.await.expect("first invoke task completes");
    assert_eq!(outcome, Ok(None));

    // Once the first call resolved, the address accepts invokes again.
    assert_eq!(
        peer.invoke("hub/silent", Duration::from_millis(100), Vec::new())
            .await,
        Ok(None)
    );
}
