//! Canonical structured event names used across `hub-registry`.

// Host lifecycle events.
pub const HOST_START_OK: &str = "host_start_ok";
pub const SESSION_COOLDOWN_PURGE: &str = "session_cooldown_purge";

// Route-tree and registration events.
pub const ROUTE_INSERT_OK: &str = "route_insert_ok";
pub const ROUTE_EDIT_OK: &str = "route_edit_ok";
pub const ROUTE_EDIT_SKIPPED_IMMUTABLE: &str = "route_edit_skipped_immutable";
pub const ROUTE_EDIT_TARGET_MISSING: &str = "route_edit_target_missing";
pub const TREE_FLATTEN_OK: &str = "tree_flatten_ok";

// Listener lifecycle events.
pub const LISTENER_ATTACH_OK: &str = "listener_attach_ok";
pub const LISTENER_ATTACH_FAILED: &str = "listener_attach_failed";
pub const LISTENER_DETACH_OK: &str = "listener_detach_ok";
pub const LISTENER_DETACH_FAILED: &str = "listener_detach_failed";
pub const LISTENER_ONCE_DETACH: &str = "listener_once_detach";

// Middleware events.
pub const MIDDLEWARE_COOLDOWN_REJECT: &str = "middleware_cooldown_reject";
pub const MIDDLEWARE_VALIDATOR_REJECT: &str = "middleware_validator_reject";

// Dispatch events.
pub const INVOKE_REPLY_SEND_FAILED: &str = "invoke_reply_send_failed";
pub const FIRE_SKIP_INACTIVE_PEER: &str = "fire_skip_inactive_peer";

// Peer lifecycle events.
pub const PEER_BOOTSTRAP_START: &str = "peer_bootstrap_start";
pub const PEER_BOOTSTRAP_OK: &str = "peer_bootstrap_ok";
pub const PEER_BOOTSTRAP_FAILED: &str = "peer_bootstrap_failed";
pub const PEER_SEND_COOLDOWN_REJECT: &str = "peer_send_cooldown_reject";
pub const INVOKE_TIMEOUT: &str = "invoke_timeout";
