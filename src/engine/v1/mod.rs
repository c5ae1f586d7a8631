//! Protocol version 1.0.0.

mod gateway;
mod peer;


use super::ProtocolEngine;
use crate::link::{GatewayLink, PeerLink};
use crate::protocol::{ProtocolError, ProtocolVersion};
use crate::router::Router;
use async_trait::async_trait;
use std::time::Duration;

/// The version this engine speaks.
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::new(1, 0, 0);

/// Default time a DATA request waits for the mesh to answer a query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_millis(2000);

/// Version 1 command processing over the shared [`Router`].
#[derive(Clone, Debug)]
pub struct V1Engine {
    router: Router,
    query_timeout: Duration,
}

impl V1Engine {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

#[async_trait]
impl ProtocolEngine for V1Engine {
    fn version(&self) -> ProtocolVersion {
        PROTOCOL_VERSION
    }

    async fn process_gateway_message(
        &self,
        link: &mut GatewayLink,
        raw: &[u8],
    ) -> Result<(), ProtocolError> {
        gateway::process(self, link, raw).await
    }

    async fn process_peer_message(
        &self,
        link: &mut PeerLink,
        raw: &[u8],
    ) -> Result<(), ProtocolError> {
        peer::process(self, link, raw)
    }

    async fn kill_gateway(&self, link: &mut GatewayLink) {
        gateway::kill(self, link);
    }

    async fn kill_peer(&self, link: &mut PeerLink) {
        peer::kill(link);
    }
}
