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

//! # hub-registry
//!
//! `hub-registry` is a routing and dispatch layer for bidirectional
//! message-passing between one trusted host process and many untrusted
//! remote peers, built on top of a host-provided message-channel primitive
//! that this crate does not implement.
//!
//! Typical usage is API-first and centered on [`HostRegistry`] and
//! [`PeerRegistry`]. Internal modules are organized by domain layer to keep
//! behavior ownership explicit.
//!
//! The host side owns a path-addressed tree of routes under the reserved
//! root token `hub`. Each route binds exactly one channel, carries an
//! optional middleware pipeline (per-peer cooldown plus ordered validators),
//! and holds at most one active listener. Peers never see the tree: at
//! bootstrap each peer performs a single call against `hub/system/routes`
//! and receives the flattened table, which becomes its entire routing
//! surface for the rest of the process.
//!
//! Request/response semantics are synthesized on top of the fire-and-forget
//! transport: the peer attaches a one-shot reply listener, sends, and awaits
//! the next inbound message under a timeout. There is no correlation id on
//! the wire, so overlapping calls to one address are rejected instead of
//! racing for the same reply.
//!
//! ## Internal architecture map
//!
//! - API facade: outward [`HostRegistry`]/[`PeerRegistry`] surface
//! - Control plane: address validation and route-tree ownership
//! - Data plane: channel listeners gating live traffic through middleware
//! - Transport: the boundary traits the host platform implements
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events. Library code emits
//! events/spans and does not unconditionally initialize a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

mod control_plane;
pub use control_plane::address::{ROOT_TOKEN, ROUTES_ADDRESS, SYSTEM_ADDRESS};

mod data_plane;

mod endpoint;
pub use endpoint::{EventEndpoint, InboundEndpoint, InvokeEndpoint};

mod error;
pub use error::RegistryError;

mod middleware;
pub use middleware::{Middleware, ValidatorError};

#[doc(hidden)]
pub mod observability;

mod route;
pub use route::{CallKind, ListenMode, RouteSpec};

mod table;
pub use table::{RouteDescriptor, RoutingTable};

mod transport;
pub use transport::{
    Args, ChannelError, ChannelFactory, ChannelResolver, HostChannel, HostChannelListener,
    PeerChannel, PeerChannelListener, PeerId, SessionDirectory, SessionEndListener,
};

mod host_registry;
pub use host_registry::HostRegistry;

mod peer_registry;
pub use peer_registry::{PeerRegistry, BOOTSTRAP_TIMEOUT};
