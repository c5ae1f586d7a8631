use super::*;
use crate::handshake::WAKE;
use crate::protocol::{Address, Credential, GatewayRequest};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod lifecycle;

/// Upper bound for any single socket read in these tests.
const READ_WAIT: Duration = Duration::from_secs(2);

pub(super) const KEY: &[u8] = b"KEY0000000000000001";

/// Loopback config on ephemeral ports with short timeouts and no
/// background dialing. Seed files point nowhere and are optional.
pub(super) fn make_config() -> Config {
    let mut config = Config::new();
    config.node.bind_addr = Some("127.0.0.1".parse().unwrap());
    config.node.ports.gateway = Some(0);
    config.node.ports.peer = Some(0);
    config.node.handshake_timeout_ms = Some(500);
    config.node.query_timeout_ms = Some(300);
    config.node.auto_link = Some(false);
    config.seeds.credentials = Some(PathBuf::from("/nonexistent/fedroute/credentials.bin"));
    config.seeds.peers = Some(PathBuf::from("/nonexistent/fedroute/peers.bin"));
    config
}

pub(super) async fn start_node() -> Node {
    let mut node = Node::new(make_config());
    node.start().await.unwrap();
    node
}

pub(super) fn cred(token: &[u8]) -> Credential {
    Credential::padded(token).unwrap()
}

/// Read exactly `n` bytes or fail the test.
pub(super) async fn read_bytes(stream: &mut TcpStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    tokio::time::timeout(READ_WAIT, stream.read_exact(&mut buf))
        .await
        .expect("read timed out")
        .expect("read failed");
    buf
}

/// Assert the remote closes the stream.
pub(super) async fn expect_eof(stream: &mut TcpStream) {
    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(READ_WAIT, stream.read(&mut buf))
        .await
        .expect("read timed out")
        .unwrap_or(0);
    assert_eq!(n, 0, "expected EOF, got {:?}", &buf[..n]);
}

/// Connect a raw gateway client, prompt the greeting and consume it.
pub(super) async fn connect_gateway(node: &Node) -> TcpStream {
    let mut stream = TcpStream::connect(node.gateway_addr().unwrap())
        .await
        .unwrap();
    stream.write_all(&[1, 0, 0]).await.unwrap();
    stream.write_all(&[WAKE]).await.unwrap();
    assert_eq!(read_bytes(&mut stream, 5).await, vec![0x00, 0x01, 1, 0, 0]);
    stream
}

/// Connect a raw peer client, prompt the version greeting and consume it.
pub(super) async fn connect_raw_peer(node: &Node) -> TcpStream {
    let mut stream = TcpStream::connect(node.peer_addr().unwrap()).await.unwrap();
    stream.write_all(&[1, 0, 0]).await.unwrap();
    stream.write_all(&[WAKE]).await.unwrap();
    assert_eq!(read_bytes(&mut stream, 3).await, vec![1, 0, 0]);
    stream
}

/// Register `address` and expect ASSIGNED.
pub(super) async fn register(stream: &mut TcpStream, address: Address, token: &[u8]) {
    let raw = GatewayRequest::Register {
        address,
        credential: cred(token),
    }
    .encode();
    stream.write_all(&raw).await.unwrap();
    assert_eq!(read_bytes(stream, 2).await, vec![0x00, 0x02]);
}

/// Poll until `check` holds, failing after a couple of seconds.
pub(super) async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached");
}
