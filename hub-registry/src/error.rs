//! Registry failure taxonomy.
//!
//! Structural failures (bad path, duplicate registration, wrong call kind,
//! calling before init) abort the calling operation. Cooldown rejections and
//! validator failures never surface here; they are swallowed into the
//! structured log by the middleware layer.

use crate::route::CallKind;
use crate::transport::ChannelError;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RegistryError {
    /// The path is malformed or not rooted at the reserved root token.
    InvalidPath(String),
    /// No route exists at the address.
    RouteNotFound(String),
    /// A sibling with the same end-point name already exists.
    DuplicateRoute(String),
    /// The route's call kind does not support the attempted operation.
    WrongCallKind { address: String, expected: CallKind },
    /// A listener is already attached at the address.
    AlreadyConnected(String),
    /// The registry was never started.
    NotInitialized,
    /// The local pre-flight cooldown for the address has not elapsed.
    CooldownActive(String),
    /// The peer could not obtain the routing table; the registry stays
    /// uninitialized.
    BootstrapFailed(String),
    /// The underlying channel reported a failure.
    Transport(ChannelError),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::InvalidPath(path) => write!(f, "invalid path: {path}"),
            RegistryError::RouteNotFound(address) => write!(f, "route not found: {address}"),
            RegistryError::DuplicateRoute(address) => write!(f, "duplicate route: {address}"),
            RegistryError::WrongCallKind { address, expected } => {
                write!(f, "wrong call kind for {address}: route is not {expected}")
            }
            RegistryError::AlreadyConnected(address) => {
                write!(f, "listener already connected: {address}")
            }
            RegistryError::NotInitialized => write!(f, "registry not initialized"),
            RegistryError::CooldownActive(address) => write!(f, "cooldown active: {address}"),
            RegistryError::BootstrapFailed(reason) => write!(f, "bootstrap failed: {reason}"),
            RegistryError::Transport(err) => write!(f, "transport failure: {err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RegistryError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ChannelError> for RegistryError {
    fn from(err: ChannelError) -> Self {
        RegistryError::Transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::RegistryError;
    use crate::route::CallKind;
    use crate::transport::ChannelError;
    use std::error::Error;

    #[test]
    fn display_is_stable_for_structural_errors() {
        let error = RegistryError::WrongCallKind {
            address: "hub/math/add".to_string(),
            expected: CallKind::Invoke,
        };

        assert_eq!(
            error.to_string(),
            "wrong call kind for hub/math/add: route is not invoke"
        );
        assert!(error.source().is_none());
    }

    #[test]
    fn transport_variant_exposes_source() {
        let error = RegistryError::Transport(ChannelError::new("channel closed"));

        assert_eq!(error.to_string(), "transport failure: channel closed");
        assert!(error.source().is_some());
    }
}
