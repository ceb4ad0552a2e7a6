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

//! Authoritative host-side registry.
//!
//! Owns the route tree and exposes the registration, connection, and emit
//! surface. One instance per process, created by an explicit constructor and
//! passed by reference to consumers.
//!
//! Initialization is deliberately asymmetric and must stay that way:
//! registration and emit operations (`new_route`, `fire_*`,
//! `routing_table`) start the registry on demand, while `edit_route`,
//! `on_event`, `on_invoke`, and `disconnect` hard-fail with
//! [`RegistryError::NotInitialized`] when `start` was never called.

use crate::control_plane::address::{self, ROOT_TOKEN, ROUTES_ADDRESS, SYSTEM_ADDRESS};
use crate::control_plane::route_tree::RouteTree;
use crate::data_plane::event_dispatch::EventDispatch;
use crate::data_plane::invoke_dispatch::InvokeDispatch;
use crate::endpoint::{EventEndpoint, InvokeEndpoint};
use crate::error::RegistryError;
use crate::middleware::Middleware;
use crate::observability::{events, fields};
use crate::route::{CallKind, ListenMode, ListenerSlot, Route, RouteBinding, RouteSpec};
use crate::table::{self, RoutingTable};
use crate::transport::{
    Args, ChannelFactory, HostChannelListener, PeerId, SessionDirectory, SessionEndListener,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const COMPONENT: &str = "host_registry";

/// Cooldown on the introspection endpoint serving the flattened table.
const ROUTES_COOLDOWN: Duration = Duration::from_secs(5);

pub struct HostRegistry {
    inner: Arc<HostInner>,
}

impl HostRegistry {
    /// Creates the process-wide registry instance. Nothing is reachable by
    /// peers until [`start`](Self::start) runs (explicitly or through one of
    /// the self-healing operations).
    pub fn new(
        name: &str,
        channels: Arc<dyn ChannelFactory>,
        sessions: Arc<dyn SessionDirectory>,
    ) -> Self {
        Self {
            inner: Arc::new(HostInner {
                name: name.to_string(),
                group: ROOT_TOKEN.to_string(),
                channels,
                sessions,
                tree: Mutex::new(None),
                lookup_cache: Mutex::new(HashMap::new()),
                immutable: vec![
                    ROOT_TOKEN.to_string(),
                    SYSTEM_ADDRESS.to_string(),
                    ROUTES_ADDRESS.to_string(),
                ],
            }),
        }
    }

    /// Builds the default tree and installs the introspection endpoint.
    /// Idempotent: calling it on a started registry is a no-op.
    pub async fn start(&self) -> Result<(), RegistryError> {
        self.inner.start().await
    }

    /// Registers a new route under `parent_path`, auto-creating missing
    /// ancestors. Starts the registry on demand.
    pub async fn new_route(&self, parent_path: &str, spec: RouteSpec) -> Result<(), RegistryError> {
        self.inner.new_route(parent_path, spec).await
    }

    /// Replaces an existing route's payload in place, preserving its
    /// descendants. A no-op (with a warning) when the target address is
    /// immutable or missing; never creates ancestors.
    pub async fn edit_route(
        &self,
        parent_path: &str,
        spec: RouteSpec,
    ) -> Result<(), RegistryError> {
        self.inner.edit_route(parent_path, spec).await
    }

    /// Attaches the at-most-one listener of a fire-and-forget route.
    pub async fn on_event(
        &self,
        mode: ListenMode,
        path: &str,
        endpoint: Arc<dyn EventEndpoint>,
    ) -> Result<(), RegistryError> {
        self.inner.connect_event(mode, path, endpoint).await
    }

    /// Attaches the at-most-one listener of a request/response route.
    pub async fn on_invoke(
        &self,
        mode: ListenMode,
        path: &str,
        endpoint: Arc<dyn InvokeEndpoint>,
    ) -> Result<(), RegistryError> {
        self.inner.connect_invoke(mode, path, endpoint).await
    }

    /// Detaches the route's active listener; idempotent when none.
    pub async fn disconnect(&self, path: &str) -> Result<(), RegistryError> {
        self.inner.disconnect(path).await
    }

    /// Sends on a fire-and-forget route to a single peer.
    pub async fn fire_client(
        &self,
        path: &str,
        peer: PeerId,
        args: Args,
    ) -> Result<(), RegistryError> {
        self.inner.fire_client(path, peer, args).await
    }

    /// Sends on a fire-and-forget route to every peer with a session.
    pub async fn fire_all_clients(&self, path: &str, args: Args) -> Result<(), RegistryError> {
        self.inner.fire_all_clients(path, args).await
    }

    /// Sends on a fire-and-forget route to the listed peers, silently
    /// skipping any without an active session.
    pub async fn fire_clients_in_list(
        &self,
        path: &str,
        peers: &[PeerId],
        args: Args,
    ) -> Result<(), RegistryError> {
        self.inner.fire_clients_in_list(path, peers, args).await
    }

    /// Flattens the tree into the table shipped to peers.
    pub async fn routing_table(&self) -> Result<RoutingTable, RegistryError> {
        self.inner.routing_table().await
    }
}

struct HostInner {
    name: String,
    group: String,
    channels: Arc<dyn ChannelFactory>,
    sessions: Arc<dyn SessionDirectory>,
    /// `None` until `start` runs; doubles as the initialization state.
    tree: Mutex<Option<RouteTree>>,
    /// Lazily populated full-address lookup, refreshed on `edit_route`.
    lookup_cache: Mutex<HashMap<String, Arc<Route>>>,
    immutable: Vec<String>,
}

impl HostInner {
    async fn start(self: &Arc<Self>) -> Result<(), RegistryError> {
        {
            let mut tree = self.tree.lock().await;
            if tree.is_some() {
                return Ok(());
            }

            let mut built = RouteTree::new(&self.channels, &self.group).await?;
            let routes_leaf = Route::build(
                SYSTEM_ADDRESS,
                RouteSpec {
                    end_point: "routes".to_string(),
                    secure: true,
                    call_kind: CallKind::Invoke,
                    middleware: Some(Middleware::new(ROUTES_COOLDOWN)),
                },
                &self.channels,
                &self.group,
            )
            .await?;
            built
                .insert(SYSTEM_ADDRESS, Arc::new(routes_leaf), &self.channels)
                .await?;
            *tree = Some(built);
        }

        self.connect_invoke(
            ListenMode::Persistent,
            ROUTES_ADDRESS,
            Arc::new(RoutingTableEndpoint {
                inner: Arc::downgrade(self),
            }),
        )
        .await?;

        self.sessions
            .subscribe_session_end(Arc::new(CooldownPurge {
                inner: Arc::downgrade(self),
            }))
            .await;

        info!(
            event = events::HOST_START_OK,
            component = COMPONENT,
            name = %self.name,
            "host registry started"
        );
        Ok(())
    }

    async fn ensure_started(self: &Arc<Self>) -> Result<(), RegistryError> {
        if self.tree.lock().await.is_some() {
            return Ok(());
        }
        self.start().await
    }

    async fn require_started(&self) -> Result<(), RegistryError> {
        if self.tree.lock().await.is_none() {
            return Err(RegistryError::NotInitialized);
        }
        Ok(())
    }

    async fn new_route(
        self: &Arc<Self>,
        parent_path: &str,
        spec: RouteSpec,
    ) -> Result<(), RegistryError> {
        self.ensure_started().await?;
        // Validate the parent before a channel gets created for the leaf.
        let parent = address::normalize(parent_path)?.join("/");

        let route = Arc::new(Route::build(&parent, spec, &self.channels, &self.group).await?);
        let address = route.full_address().to_string();
        let call_kind = route.call_kind();
        let cooldown = route.middleware().map(Middleware::cooldown);

        {
            let mut tree_guard = self.tree.lock().await;
            let tree = tree_guard.as_mut().ok_or(RegistryError::NotInitialized)?;
            tree.insert(&parent, route, &self.channels).await?;
        }

        debug!(
            event = events::ROUTE_INSERT_OK,
            component = COMPONENT,
            address = %address,
            call_kind = %fields::format_call_kind(call_kind),
            cooldown_secs = %fields::format_cooldown(cooldown),
            "route registered"
        );
        Ok(())
    }

    async fn edit_route(&self, parent_path: &str, spec: RouteSpec) -> Result<(), RegistryError> {
        self.require_started().await?;
        let parent = address::normalize(parent_path)?.join("/");
        let name = spec.end_point.to_lowercase();
        let target = address::join(&parent, &name);

        if self.immutable.contains(&target) {
            warn!(
                event = events::ROUTE_EDIT_SKIPPED_IMMUTABLE,
                component = COMPONENT,
                address = %target,
                "edit skipped: address is immutable"
            );
            return Ok(());
        }

        {
            let tree_guard = self.tree.lock().await;
            let tree = tree_guard.as_ref().ok_or(RegistryError::NotInitialized)?;
            match tree.resolve(&target) {
                Ok(_) => {}
                Err(RegistryError::RouteNotFound(_)) => {
                    warn!(
                        event = events::ROUTE_EDIT_TARGET_MISSING,
                        component = COMPONENT,
                        address = %target,
                        "edit skipped: no route at address"
                    );
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }

        let route = Arc::new(Route::build(&parent, spec, &self.channels, &self.group).await?);

        {
            let mut tree_guard = self.tree.lock().await;
            let tree = tree_guard.as_mut().ok_or(RegistryError::NotInitialized)?;
            tree.replace(&parent, &name, route.clone())?;
        }
        // Keep the lookup cache coherent with the replaced payload.
        self.lookup_cache.lock().await.insert(target.clone(), route);

        debug!(
            event = events::ROUTE_EDIT_OK,
            component = COMPONENT,
            address = %target,
            "route payload replaced"
        );
        Ok(())
    }

    /// Resolves a route, caching the full address on first lookup.
    async fn resolve_route(&self, path: &str) -> Result<Arc<Route>, RegistryError> {
        let address = address::normalize(path)?.join("/");

        if let Some(route) = self.lookup_cache.lock().await.get(&address) {
            return Ok(route.clone());
        }

        let route = {
            let tree_guard = self.tree.lock().await;
            let tree = tree_guard.as_ref().ok_or(RegistryError::NotInitialized)?;
            tree.resolve(&address)?.route().clone()
        };
        self.lookup_cache
            .lock()
            .await
            .insert(address, route.clone());
        Ok(route)
    }

    async fn connect_event(
        &self,
        mode: ListenMode,
        path: &str,
        endpoint: Arc<dyn EventEndpoint>,
    ) -> Result<(), RegistryError> {
        self.require_started().await?;
        let route = self.resolve_route(path).await?;

        let slot = match route.binding() {
            RouteBinding::Event(slot) => slot,
            RouteBinding::Invoke(_) => {
                return Err(RegistryError::WrongCallKind {
                    address: route.full_address().to_string(),
                    expected: CallKind::Event,
                })
            }
        };

        let dispatch = Arc::new(EventDispatch::new(route.clone(), endpoint, mode));
        let listener_id = dispatch.listener_id().to_string();
        Self::attach(&route, slot, dispatch, &listener_id).await
    }

    async fn connect_invoke(
        &self,
        mode: ListenMode,
        path: &str,
        endpoint: Arc<dyn InvokeEndpoint>,
    ) -> Result<(), RegistryError> {
        self.require_started().await?;
        let route = self.resolve_route(path).await?;

        let slot = match route.binding() {
            RouteBinding::Invoke(slot) => slot,
            RouteBinding::Event(_) => {
                return Err(RegistryError::WrongCallKind {
                    address: route.full_address().to_string(),
                    expected: CallKind::Invoke,
                })
            }
        };

        let dispatch = Arc::new(InvokeDispatch::new(route.clone(), endpoint, mode));
        let listener_id = dispatch.listener_id().to_string();
        Self::attach(&route, slot, dispatch, &listener_id).await
    }

    async fn attach(
        route: &Arc<Route>,
        slot: &ListenerSlot,
        listener: Arc<dyn HostChannelListener>,
        listener_id: &str,
    ) -> Result<(), RegistryError> {
        if !slot.attach(listener.clone()).await {
            return Err(RegistryError::AlreadyConnected(
                route.full_address().to_string(),
            ));
        }

        if let Err(err) = route.channel().register_listener(listener).await {
            let _ = slot.take().await;
            warn!(
                event = events::LISTENER_ATTACH_FAILED,
                component = COMPONENT,
                address = route.full_address(),
                listener_id,
                err = %err,
                "unable to register channel listener"
            );
            return Err(RegistryError::Transport(err));
        }

        debug!(
            event = events::LISTENER_ATTACH_OK,
            component = COMPONENT,
            address = route.full_address(),
            listener_id,
            "listener attached"
        );
        Ok(())
    }

    async fn disconnect(&self, path: &str) -> Result<(), RegistryError> {
        self.require_started().await?;
        let route = self.resolve_route(path).await?;

        if let Some(listener) = route.binding().slot().take().await {
            route
                .channel()
                .unregister_listener(listener)
                .await
                .map_err(RegistryError::Transport)?;
            debug!(
                event = events::LISTENER_DETACH_OK,
                component = COMPONENT,
                address = route.full_address(),
                "listener detached"
            );
        }
        Ok(())
    }

    async fn resolve_event_route(
        self: &Arc<Self>,
        path: &str,
    ) -> Result<Arc<Route>, RegistryError> {
        self.ensure_started().await?;
        let route = self.resolve_route(path).await?;
        match route.binding() {
            RouteBinding::Event(_) => Ok(route),
            RouteBinding::Invoke(_) => Err(RegistryError::WrongCallKind {
                address: route.full_address().to_string(),
                expected: CallKind::Event,
            }),
        }
    }

    async fn fire_client(
        self: &Arc<Self>,
        path: &str,
        peer: PeerId,
        args: Args,
    ) -> Result<(), RegistryError> {
        let route = self.resolve_event_route(path).await?;
        route
            .channel()
            .unicast(peer, args)
            .await
            .map_err(RegistryError::Transport)
    }

    async fn fire_all_clients(self: &Arc<Self>, path: &str, args: Args) -> Result<(), RegistryError> {
        let route = self.resolve_event_route(path).await?;
        route
            .channel()
            .broadcast(args)
            .await
            .map_err(RegistryError::Transport)
    }

    async fn fire_clients_in_list(
        self: &Arc<Self>,
        path: &str,
        peers: &[PeerId],
        args: Args,
    ) -> Result<(), RegistryError> {
        let route = self.resolve_event_route(path).await?;
        for peer in peers {
            if !self.sessions.is_active(*peer).await {
                debug!(
                    event = events::FIRE_SKIP_INACTIVE_PEER,
                    component = COMPONENT,
                    address = route.full_address(),
                    peer = %fields::format_peer(*peer),
                    "skipping peer without active session"
                );
                continue;
            }
            route
                .channel()
                .unicast(*peer, args.clone())
                .await
                .map_err(RegistryError::Transport)?;
        }
        Ok(())
    }

    async fn routing_table(self: &Arc<Self>) -> Result<RoutingTable, RegistryError> {
        self.ensure_started().await?;
        let entries = {
            let tree_guard = self.tree.lock().await;
            let tree = tree_guard.as_ref().ok_or(RegistryError::NotInitialized)?;
            tree.flatten()
        };
        debug!(
            event = events::TREE_FLATTEN_OK,
            component = COMPONENT,
            route_count = entries.len(),
            "tree flattened"
        );
        Ok(table::from_flattened(entries))
    }
}

/// Handler behind `hub/system/routes`: serves the flattened table to any
/// peer that asks.
struct RoutingTableEndpoint {
    inner: Weak<HostInner>,
}

#[async_trait]
impl InvokeEndpoint for RoutingTableEndpoint {
    async fn on_invoke(&self, peer: PeerId, _args: Args) -> Value {
        let Some(inner) = self.inner.upgrade() else {
            return Value::Null;
        };
        match inner.routing_table().await {
            Ok(table) => match serde_json::to_value(&table) {
                Ok(value) => {
                    debug!(
                        component = COMPONENT,
                        peer = %peer,
                        route_count = table.len(),
                        "routing table served"
                    );
                    value
                }
                Err(err) => {
                    warn!(
                        component = COMPONENT,
                        peer = %peer,
                        err = %err,
                        "unable to encode routing table"
                    );
                    Value::Null
                }
            },
            Err(err) => {
                warn!(
                    component = COMPONENT,
                    peer = %peer,
                    err = %err,
                    "unable to flatten routing table"
                );
                Value::Null
            }
        }
    }
}

/// Session-end hook: drops the ending peer's cooldown entry from every
/// middleware-carrying route, bounding log growth over long sessions.
struct CooldownPurge {
    inner: Weak<HostInner>,
}

#[async_trait]
impl SessionEndListener for CooldownPurge {
    async fn on_session_end(&self, peer: PeerId) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let routes = {
            let tree_guard = inner.tree.lock().await;
            match tree_guard.as_ref() {
                Some(tree) => tree.flatten(),
                None => return,
            }
        };
        for (_, route) in routes {
            if let Some(middleware) = route.middleware() {
                middleware.purge_peer(peer).await;
            }
        }
        debug!(
            event = events::SESSION_COOLDOWN_PURGE,
            component = COMPONENT,
            peer = %peer,
            "cooldown log purged for ended session"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::HostRegistry;
    use crate::endpoint::EventEndpoint;
    use crate::error::RegistryError;
    use crate::middleware::Middleware;
    use crate::route::{CallKind, ListenMode, RouteSpec};
    use crate::transport::{
        Args, ChannelError, ChannelFactory, HostChannel, HostChannelListener, PeerId,
        SessionDirectory, SessionEndListener,
    };
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingChannel {
        unicasts: Mutex<Vec<(PeerId, Args)>>,
        broadcasts: Mutex<Vec<Args>>,
        listeners: Mutex<Vec<Arc<dyn HostChannelListener>>>,
    }

    impl RecordingChannel {
        fn unicast_peers(&self) -> Vec<PeerId> {
            self.unicasts
                .lock()
                .expect("lock")
                .iter()
                .map(|(peer, _)| *peer)
                .collect()
        }

        fn listener(&self) -> Option<Arc<dyn HostChannelListener>> {
            self.listeners.lock().expect("lock").first().cloned()
        }
    }

    #[async_trait]
    impl HostChannel for RecordingChannel {
        async fn unicast(&self, peer: PeerId, args: Args) -> Result<(), ChannelError> {
            self.unicasts.lock().expect("lock").push((peer, args));
            Ok(())
        }

        async fn broadcast(&self, args: Args) -> Result<(), ChannelError> {
            self.broadcasts.lock().expect("lock").push(args);
            Ok(())
        }

        async fn register_listener(
            &self,
            listener: Arc<dyn HostChannelListener>,
        ) -> Result<(), ChannelError> {
            self.listeners.lock().expect("lock").push(listener);
            Ok(())
        }

        async fn unregister_listener(
            &self,
            listener: Arc<dyn HostChannelListener>,
        ) -> Result<(), ChannelError> {
            self.listeners
                .lock()
                .expect("lock")
                .retain(|registered| !Arc::ptr_eq(registered, &listener));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingFactory {
        channels: Mutex<HashMap<String, Arc<RecordingChannel>>>,
    }

    impl RecordingFactory {
        fn channel(&self, channel_id: &str) -> Option<Arc<RecordingChannel>> {
            self.channels.lock().expect("lock").get(channel_id).cloned()
        }
    }

    #[async_trait]
    impl ChannelFactory for RecordingFactory {
        async fn create_channel(
            &self,
            _group: &str,
            channel_id: &str,
            _reliable: bool,
        ) -> Result<Arc<dyn HostChannel>, ChannelError> {
            let channel = Arc::new(RecordingChannel::default());
            self.channels
                .lock()
                .expect("lock")
                .insert(channel_id.to_string(), channel.clone());
            Ok(channel)
        }
    }

    #[derive(Default)]
    struct StubSessions {
        active: Mutex<HashSet<PeerId>>,
        listeners: Mutex<Vec<Arc<dyn SessionEndListener>>>,
    }

    impl StubSessions {
        fn with_active(peers: &[PeerId]) -> Self {
            Self {
                active: Mutex::new(peers.iter().copied().collect()),
                listeners: Mutex::new(Vec::new()),
            }
        }

        async fn end_session(&self, peer: PeerId) {
            self.active.lock().expect("lock").remove(&peer);
            let listeners = self.listeners.lock().expect("lock").clone();
            for listener in listeners {
                listener.on_session_end(peer).await;
            }
        }
    }

    #[async_trait]
    impl SessionDirectory for StubSessions {
        async fn active_peers(&self) -> Vec<PeerId> {
            self.active.lock().expect("lock").iter().copied().collect()
        }

        async fn is_active(&self, peer: PeerId) -> bool {
            self.active.lock().expect("lock").contains(&peer)
        }

        async fn subscribe_session_end(&self, listener: Arc<dyn SessionEndListener>) {
            self.listeners.lock().expect("lock").push(listener);
        }
    }

    #[derive(Default)]
    struct CountingEndpoint {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventEndpoint for CountingEndpoint {
        async fn on_event(&self, _peer: PeerId, _args: Args) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn event_spec(end_point: &str) -> RouteSpec {
        RouteSpec {
            end_point: end_point.to_string(),
            secure: true,
            call_kind: CallKind::Event,
            middleware: None,
        }
    }

    fn invoke_spec(end_point: &str) -> RouteSpec {
        RouteSpec {
            end_point: end_point.to_string(),
            secure: true,
            call_kind: CallKind::Invoke,
            middleware: None,
        }
    }

    fn make_registry(sessions: StubSessions) -> (HostRegistry, Arc<RecordingFactory>) {
        let factory = Arc::new(RecordingFactory::default());
        let registry = HostRegistry::new("host-test", factory.clone(), Arc::new(sessions));
        (registry, factory)
    }

    #[tokio::test]
    async fn edit_and_connect_operations_hard_fail_before_start() {
        let (registry, _) = make_registry(StubSessions::default());

        assert_eq!(
            registry.edit_route("hub", event_spec("a")).await,
            Err(RegistryError::NotInitialized)
        );
        assert_eq!(
            registry
                .on_event(
                    ListenMode::Persistent,
                    "hub/a",
                    Arc::new(CountingEndpoint::default())
                )
                .await,
            Err(RegistryError::NotInitialized)
        );
        assert_eq!(
            registry.disconnect("hub/a").await,
            Err(RegistryError::NotInitialized)
        );
    }

    #[tokio::test]
    async fn new_route_starts_the_registry_on_demand() {
        let (registry, _) = make_registry(StubSessions::default());

        registry
            .new_route("hub/math", invoke_spec("add"))
            .await
            .expect("new_route should self-heal");

        let table = registry.routing_table().await.expect("table");
        for address in ["hub", "hub/system", "hub/system/routes", "hub/math", "hub/math/add"] {
            assert!(table.contains_key(address), "missing {address}");
        }
        assert_eq!(
            table["hub/system/routes"].call_kind,
            CallKind::Invoke
        );
        assert_eq!(table["hub/system/routes"].cooldown, Some(5.0));
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let (registry, _) = make_registry(StubSessions::default());

        registry.start().await.expect("first start");
        registry.start().await.expect("second start is a no-op");

        let table = registry.routing_table().await.expect("table");
        assert_eq!(table.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_sibling_registration_fails() {
        let (registry, _) = make_registry(StubSessions::default());

        registry
            .new_route("hub/math", invoke_spec("add"))
            .await
            .expect("first registration");

        assert_eq!(
            registry.new_route("hub/math", event_spec("add")).await,
            Err(RegistryError::DuplicateRoute("hub/math/add".to_string()))
        );
    }

    #[tokio::test]
    async fn edit_on_immutable_address_is_a_noop() {
        let (registry, _) = make_registry(StubSessions::default());
        registry.start().await.expect("start");

        registry
            .edit_route("hub/system", event_spec("routes"))
            .await
            .expect("immutable edit reports success");

        let table = registry.routing_table().await.expect("table");
        assert_eq!(table["hub/system/routes"].call_kind, CallKind::Invoke);
        assert_eq!(table["hub/system/routes"].cooldown, Some(5.0));
    }

    #[tokio::test]
    async fn edit_on_missing_address_is_a_noop() {
        let (registry, _) = make_registry(StubSessions::default());
        registry.start().await.expect("start");

        registry
            .edit_route("hub", event_spec("ghost"))
            .await
            .expect("missing edit reports success");

        let table = registry.routing_table().await.expect("table");
        assert!(!table.contains_key("hub/ghost"));
    }

    #[tokio::test]
    async fn edit_preserves_descendants_and_refreshes_the_cache() {
        let (registry, _) = make_registry(StubSessions::default());
        registry
            .new_route("hub", event_spec("a"))
            .await
            .expect("hub/a");
        registry
            .new_route("hub/a", event_spec("b"))
            .await
            .expect("hub/a/b");

        // Populate the lookup cache for hub/a with the pre-edit payload.
        registry
            .fire_client("hub/a", PeerId(1), Vec::new())
            .await
            .expect("event route fires");

        registry
            .edit_route("hub", invoke_spec("a"))
            .await
            .expect("edit succeeds");

        let table = registry.routing_table().await.expect("table");
        assert_eq!(table["hub/a"].call_kind, CallKind::Invoke);
        assert!(table.contains_key("hub/a/b"));

        // The cache must serve the replaced payload, not the stale one.
        assert_eq!(
            registry.fire_client("hub/a", PeerId(1), Vec::new()).await,
            Err(RegistryError::WrongCallKind {
                address: "hub/a".to_string(),
                expected: CallKind::Event,
            })
        );
    }

    #[tokio::test]
    async fn fire_on_invoke_route_is_rejected() {
        let (registry, _) = make_registry(StubSessions::default());
        registry
            .new_route("hub/math", invoke_spec("add"))
            .await
            .expect("route");

        assert_eq!(
            registry
                .fire_client("hub/math/add", PeerId(1), Vec::new())
                .await,
            Err(RegistryError::WrongCallKind {
                address: "hub/math/add".to_string(),
                expected: CallKind::Event,
            })
        );
    }

    #[tokio::test]
    async fn second_listener_on_one_route_is_rejected() {
        let (registry, _) = make_registry(StubSessions::default());
        registry
            .new_route("hub", event_spec("ping"))
            .await
            .expect("route");
        registry.start().await.expect("start");

        registry
            .on_event(
                ListenMode::Persistent,
                "hub/ping",
                Arc::new(CountingEndpoint::default()),
            )
            .await
            .expect("first listener");

        assert_eq!(
            registry
                .on_event(
                    ListenMode::Persistent,
                    "hub/ping",
                    Arc::new(CountingEndpoint::default())
                )
                .await,
            Err(RegistryError::AlreadyConnected("hub/ping".to_string()))
        );

        // Disconnect frees the slot; reconnecting succeeds and doing it
        // twice stays idempotent.
        registry.disconnect("hub/ping").await.expect("disconnect");
        registry
            .disconnect("hub/ping")
            .await
            .expect("idempotent disconnect");
        registry
            .on_event(
                ListenMode::Persistent,
                "hub/ping",
                Arc::new(CountingEndpoint::default()),
            )
            .await
            .expect("reconnect");
    }

    #[tokio::test]
    async fn connecting_an_event_handler_to_an_invoke_route_is_rejected() {
        let (registry, _) = make_registry(StubSessions::default());
        registry
            .new_route("hub/math", invoke_spec("add"))
            .await
            .expect("route");

        assert_eq!(
            registry
                .on_event(
                    ListenMode::Persistent,
                    "hub/math/add",
                    Arc::new(CountingEndpoint::default())
                )
                .await,
            Err(RegistryError::WrongCallKind {
                address: "hub/math/add".to_string(),
                expected: CallKind::Event,
            })
        );
    }

    #[tokio::test]
    async fn fire_clients_in_list_skips_peers_without_a_session() {
        let (registry, factory) =
            make_registry(StubSessions::with_active(&[PeerId(1), PeerId(3)]));
        registry
            .new_route("hub", event_spec("ping"))
            .await
            .expect("route");

        registry
            .fire_clients_in_list("hub/ping", &[PeerId(1), PeerId(2), PeerId(3)], Vec::new())
            .await
            .expect("filtered fire succeeds despite the missing peer");

        let channel = factory.channel("hub/ping").expect("channel exists");
        assert_eq!(channel.unicast_peers(), vec![PeerId(1), PeerId(3)]);
    }

    #[tokio::test]
    async fn session_end_purges_the_cooldown_log() {
        let sessions = Arc::new(StubSessions::with_active(&[PeerId(9)]));
        let factory = Arc::new(RecordingFactory::default());
        let registry = HostRegistry::new("host-test", factory.clone(), sessions.clone());

        registry
            .new_route(
                "hub",
                RouteSpec {
                    end_point: "guarded".to_string(),
                    secure: true,
                    call_kind: CallKind::Event,
                    middleware: Some(Middleware::new(Duration::from_secs(60))),
                },
            )
            .await
            .expect("route");

        let endpoint = Arc::new(CountingEndpoint::default());
        registry
            .on_event(ListenMode::Persistent, "hub/guarded", endpoint.clone())
            .await
            .expect("listener");

        let channel = factory.channel("hub/guarded").expect("channel exists");
        let listener = channel.listener().expect("listener registered");

        listener.on_receive(PeerId(9), Vec::new()).await;
        listener.on_receive(PeerId(9), Vec::new()).await;
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);

        sessions.end_session(PeerId(9)).await;

        listener.on_receive(PeerId(9), Vec::new()).await;
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 2);
    }
}
