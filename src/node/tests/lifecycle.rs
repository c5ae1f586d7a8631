//! Start/stop behavior and seed loading.

use super::*;
use crate::engine::EngineRegistry;
use crate::protocol::PortPair;
use crate::router::Router;
use crate::seed::{self, CredentialSeed, PeerSeed};
use std::net::Ipv4Addr;

#[tokio::test]
async fn test_start_stop() {
    let mut node = Node::new(make_config());
    assert_eq!(node.state(), NodeState::Created);
    assert!(node.gateway_addr().is_none());

    node.start().await.unwrap();
    assert!(node.state().is_operational());
    assert_ne!(node.gateway_addr().unwrap().port(), 0);
    assert_ne!(node.peer_addr().unwrap().port(), 0);

    node.stop().await.unwrap();
    assert_eq!(node.state(), NodeState::Stopped);
    assert!(node.gateway_addr().is_none());
    assert!(node.peer_addr().is_none());
}

#[tokio::test]
async fn test_restart_after_stop() {
    let mut node = start_node().await;
    node.stop().await.unwrap();
    node.start().await.unwrap();
    let _gateway = connect_gateway(&node).await;
    node.stop().await.unwrap();
}

#[tokio::test]
async fn test_start_twice() {
    let mut node = start_node().await;
    assert!(matches!(node.start().await, Err(NodeError::AlreadyStarted)));
    node.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_without_start() {
    let mut node = Node::new(make_config());
    assert!(matches!(node.stop().await, Err(NodeError::NotStarted)));
}

#[tokio::test]
async fn test_link_without_start() {
    let node = Node::new(make_config());
    let err = node.link(Ipv4Addr::LOCALHOST).await.unwrap_err();
    assert!(matches!(err, NodeError::NotStarted));
}

#[tokio::test]
async fn test_start_without_engines() {
    let mut node = Node::with_engines(make_config(), Router::new(), EngineRegistry::new());
    let err = node.start().await.unwrap_err();
    assert!(matches!(err, NodeError::NoEngines));
    assert_eq!(err.exit_code(), EXIT_NO_ENGINES);
    assert_eq!(node.state(), NodeState::Created);
}

#[tokio::test]
async fn test_required_seed_missing() {
    let mut config = make_config();
    config.seeds.required = Some(true);
    let mut node = Node::new(config);

    let err = node.start().await.unwrap_err();
    assert!(matches!(err, NodeError::Seed(_)));
    assert_eq!(err.exit_code(), EXIT_FAILURE);
    assert_eq!(node.state(), NodeState::Stopped);
    assert!(node.gateway_addr().is_none());
}

#[tokio::test]
async fn test_bind_conflict_fails_start() {
    let first = start_node().await;
    let mut config = make_config();
    config.node.ports.gateway = Some(first.gateway_addr().unwrap().port());
    let mut second = Node::new(config);

    let err = second.start().await.unwrap_err();
    assert!(matches!(err, NodeError::Transport(_)));
    assert_eq!(second.state(), NodeState::Stopped);
}

#[tokio::test]
async fn test_seeds_loaded_on_start() {
    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("credentials.bin");
    let peers = dir.path().join("peers.bin");
    let address = Address::new(1, 2);
    let ip = Ipv4Addr::new(10, 0, 0, 9);

    std::fs::write(
        &credentials,
        seed::encode_credentials(&[CredentialSeed {
            address,
            credential: cred(KEY),
        }]),
    )
    .unwrap();
    std::fs::write(
        &peers,
        seed::encode_peers(&[PeerSeed {
            ip,
            ports: PortPair::new(5000, 5001),
        }]),
    )
    .unwrap();

    let mut config = make_config();
    config.seeds.credentials = Some(credentials);
    config.seeds.peers = Some(peers);
    config.seeds.required = Some(true);
    let mut node = Node::new(config);
    node.start().await.unwrap();

    assert_eq!(node.router().known_peer(&ip), Some(PortPair::new(5000, 5001)));
    assert!(
        node.router()
            .with_state(|s| s.registry.credential(&address) == Some(&cred(KEY)))
    );

    // The seeded credential is usable by a gateway.
    let mut gateway = connect_gateway(&node).await;
    register(&mut gateway, address, KEY).await;

    node.stop().await.unwrap();
}

#[tokio::test]
async fn test_corrupt_seed_fails_start() {
    let dir = tempfile::tempdir().unwrap();
    let peers = dir.path().join("peers.bin");
    std::fs::write(&peers, [10, 0, 0, 1, 0x13]).unwrap();

    let mut config = make_config();
    config.seeds.peers = Some(peers);
    let mut node = Node::new(config);

    let err = node.start().await.unwrap_err();
    assert!(matches!(err, NodeError::Seed(_)));
}
