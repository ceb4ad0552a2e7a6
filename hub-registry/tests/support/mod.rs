use hub_registry::{HostRegistry, PeerId, PeerRegistry};
use loopback_transport::{LoopbackNetwork, LoopbackPeer};
use std::sync::Arc;

pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt::try_init();
}

pub(crate) async fn start_host(network: &LoopbackNetwork) -> HostRegistry {
    let registry = HostRegistry::new(
        "test-host",
        Arc::new(network.clone()),
        Arc::new(network.clone()),
    );
    registry.start().await.expect("host should start");
    registry
}

pub(crate) async fn bootstrap_peer(
    network: &LoopbackNetwork,
    peer: PeerId,
) -> (PeerRegistry, Arc<LoopbackPeer>) {
    let side = network.connect_peer(peer).await;
    let registry = PeerRegistry::new(side.clone());
    registry.start().await.expect("peer should bootstrap");
    (registry, side)
}
