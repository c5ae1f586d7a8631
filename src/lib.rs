//! fedroute: federated address routing
//!
//! A daemon that lets local gateways claim short addresses with
//! pre-shared credentials and exchange data with one another. Daemons
//! federate over peer links, announcing the addresses they hold and
//! querying each other for addresses they do not know.

pub mod config;
pub mod engine;
pub mod handshake;
pub mod link;
pub mod mesh;
pub mod node;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod seed;
pub mod transport;

// Re-export config types
pub use config::{Config, ConfigError, NodeConfig, PortsConfig, SeedConfig};

// Re-export protocol types
pub use protocol::{
    Address, Credential, FailureReason, GatewayReply, GatewayRequest, PeerMessage, PortPair,
    ProtocolError, ProtocolVersion, StateCode,
};

// Re-export handshake types
pub use handshake::{HandshakeError, NegotiatedVersion};

// Re-export link types
pub use link::{
    GatewayId, GatewayLink, GatewayState, LinkDirection, LinkHandle, PeerId, PeerLink, PeerState,
};

// Re-export routing state
pub use mesh::PeerMesh;
pub use registry::{Classification, Registry};
pub use router::{QueryAnswer, Router};

// Re-export engines
pub use engine::v1::V1Engine;
pub use engine::{EngineRegistry, ProtocolEngine};

// Re-export seed types
pub use seed::{CredentialSeed, PeerSeed, SeedError};

// Re-export transport types
pub use transport::{Role, TcpTransport, TransportError};

// Re-export node types
pub use node::{Node, NodeError, NodeState};
