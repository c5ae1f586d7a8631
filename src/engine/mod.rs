//! Protocol Engines
//!
//! A [`ProtocolEngine`] implements the gateway and peer command sets for
//! one protocol version. Connections are dispatched to an engine by the
//! `(major, minor)` pair negotiated in the handshake.

pub mod v1;

use crate::handshake::NegotiatedVersion;
use crate::link::{GatewayLink, PeerLink};
use crate::protocol::{ProtocolError, ProtocolVersion};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Command processing for one protocol version.
///
/// The first frame received on a fresh link is answered with the greeting
/// and its bytes are otherwise ignored.
#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    /// The version this engine advertises.
    fn version(&self) -> ProtocolVersion;

    /// Handle one frame received from a gateway.
    async fn process_gateway_message(
        &self,
        link: &mut GatewayLink,
        raw: &[u8],
    ) -> Result<(), ProtocolError>;

    /// Handle one frame received from a peer.
    async fn process_peer_message(
        &self,
        link: &mut PeerLink,
        raw: &[u8],
    ) -> Result<(), ProtocolError>;

    /// Forced teardown of a gateway connection.
    async fn kill_gateway(&self, link: &mut GatewayLink);

    /// Forced teardown of a peer link.
    async fn kill_peer(&self, link: &mut PeerLink);
}

/// Engines keyed by `(major, minor)`.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: BTreeMap<(u8, u8), Arc<dyn ProtocolEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine under its advertised version.
    ///
    /// Replaces any engine already registered for the same major and minor.
    pub fn register(&mut self, engine: Arc<dyn ProtocolEngine>) {
        let version = engine.version();
        self.engines.insert((version.major, version.minor), engine);
    }

    /// The engine for a negotiated version: same major, highest registered
    /// minor not above the negotiated one.
    pub fn select(&self, version: NegotiatedVersion) -> Option<Arc<dyn ProtocolEngine>> {
        self.engines
            .range((version.major, 0)..=(version.major, version.minor))
            .next_back()
            .map(|(_, engine)| engine.clone())
    }

    /// The newest registered version, advertised during handshakes.
    pub fn newest(&self) -> Option<ProtocolVersion> {
        self.engines
            .values()
            .next_back()
            .map(|engine| engine.version())
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("versions", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEngine(ProtocolVersion);

    #[async_trait]
    impl ProtocolEngine for FixedEngine {
        fn version(&self) -> ProtocolVersion {
            self.0
        }

        async fn process_gateway_message(
            &self,
            _link: &mut GatewayLink,
            _raw: &[u8],
        ) -> Result<(), ProtocolError> {
            Ok(())
        }

        async fn process_peer_message(
            &self,
            _link: &mut PeerLink,
            _raw: &[u8],
        ) -> Result<(), ProtocolError> {
            Ok(())
        }

        async fn kill_gateway(&self, _link: &mut GatewayLink) {}

        async fn kill_peer(&self, _link: &mut PeerLink) {}
    }

    fn registry(versions: &[(u8, u8)]) -> EngineRegistry {
        let mut registry = EngineRegistry::new();
        for (major, minor) in versions {
            registry.register(Arc::new(FixedEngine(ProtocolVersion::new(*major, *minor, 0))));
        }
        registry
    }

    #[test]
    fn test_select_highest_minor_not_above() {
        let registry = registry(&[(1, 0), (1, 2), (2, 0)]);

        let pick = |major, minor| {
            registry
                .select(NegotiatedVersion::new(major, minor))
                .map(|e| (e.version().major, e.version().minor))
        };
        assert_eq!(pick(1, 0), Some((1, 0)));
        assert_eq!(pick(1, 1), Some((1, 0)));
        assert_eq!(pick(1, 5), Some((1, 2)));
        assert_eq!(pick(2, 3), Some((2, 0)));
        assert_eq!(pick(3, 0), None);
    }

    #[test]
    fn test_newest() {
        assert_eq!(registry(&[]).newest(), None);
        assert!(registry(&[]).is_empty());
        assert_eq!(
            registry(&[(1, 0), (1, 2)]).newest(),
            Some(ProtocolVersion::new(1, 2, 0))
        );
    }
}
