//! Data-plane layer.
//!
//! The channel listeners that carry live traffic: host-side dispatchers that
//! gate deliveries through middleware before handing them to the attached
//! endpoint, the peer-side inbound dispatcher, and the one-shot reply slot
//! behind the invoke emulation.

pub(crate) mod event_dispatch;
pub(crate) mod inbound_dispatch;
pub(crate) mod invoke_dispatch;
pub(crate) mod reply_slot;

use crate::observability::events;
use crate::route::Route;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Detaches a route's active listener after a one-shot delivery.
pub(crate) async fn detach_once(route: &Arc<Route>, component: &str, listener_id: &str) {
    let Some(listener) = route.binding().slot().take().await else {
        return;
    };
    if let Err(err) = route.channel().unregister_listener(listener).await {
        warn!(
            event = events::LISTENER_DETACH_FAILED,
            component,
            address = route.full_address(),
            listener_id,
            err = %err,
            "unable to unregister one-shot listener"
        );
    } else {
        debug!(
            event = events::LISTENER_ONCE_DETACH,
            component,
            address = route.full_address(),
            listener_id,
            "one-shot listener detached"
        );
    }
}

/// Owner of peer-side listener registrations, so one-shot inbound
/// dispatchers can detach themselves after their first delivery.
#[async_trait]
pub(crate) trait ListenerHost: Send + Sync {
    async fn detach(&self, address: &str);
}
