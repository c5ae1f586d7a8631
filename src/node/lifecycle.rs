//! Node lifecycle management: start, stop, and the accept loops.

use super::connection::{self, Context};
use super::{Node, NodeError, NodeState, processor};
use crate::protocol::ProtocolVersion;
use crate::seed;
use crate::transport::{Role, TcpTransport};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// How long stop waits for connection tasks after killing their links.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

impl Node {
    /// Start the node.
    ///
    /// Loads the seed files into the router, binds both listeners, and
    /// spawns the accept loops and the processor.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        if !self.state.can_start() {
            return Err(NodeError::AlreadyStarted);
        }
        let Some(version) = self.engines.newest() else {
            return Err(NodeError::NoEngines);
        };
        self.state = NodeState::Starting;

        if let Err(e) = self.bring_up(version).await {
            self.state = NodeState::Stopped;
            return Err(e);
        }

        self.state = NodeState::Running;
        info!(
            state = %self.state,
            version = %version,
            engines = self.engines.len(),
            "Node started"
        );
        Ok(())
    }

    async fn bring_up(&mut self, version: ProtocolVersion) -> Result<(), NodeError> {
        let seeds = &self.config.seeds;
        let credentials = seed::load_credentials(seeds.credentials(), seeds.required())?;
        let peers = seed::load_peers(seeds.peers(), seeds.required())?;
        self.router.import_credentials(&credentials);
        self.router.import_peers(&peers);

        let node_config = &self.config.node;
        let gateway = TcpTransport::bind(Role::Gateway, node_config.gateway_addr()).await?;
        let peer = TcpTransport::bind(Role::Peer, node_config.peer_addr()).await?;
        self.gateway_addr = Some(gateway.local_addr());
        self.peer_addr = Some(peer.local_addr());

        let (alive_tx, alive_rx) = watch::channel(true);
        let (drain_tx, drain_rx) = mpsc::channel(1);
        let context = Context {
            router: self.router.clone(),
            engines: self.engines.clone(),
            version,
            handshake_timeout: node_config.handshake_timeout(),
            max_frame_size: node_config.max_frame_size(),
            _drain: drain_tx,
        };

        self.accept_tasks = vec![
            tokio::spawn(accept_loop(gateway, context.clone(), alive_rx.clone())),
            tokio::spawn(accept_loop(peer, context.clone(), alive_rx.clone())),
        ];
        self.processor = Some(tokio::spawn(processor::run(
            context.clone(),
            node_config.tick_interval(),
            node_config.auto_link(),
            alive_rx,
        )));

        self.context = Some(context);
        self.alive = Some(alive_tx);
        self.drain_rx = Some(drain_rx);
        Ok(())
    }

    /// Stop the node.
    ///
    /// Clears the liveness flag, waits for the processor, kills every link
    /// through its engine, then releases the listeners and waits for the
    /// connection tasks to finish.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        if !self.state.can_stop() {
            return Err(NodeError::NotStarted);
        }
        self.state = NodeState::Stopping;
        info!(state = %self.state, "Node stopping");

        if let Some(alive) = self.alive.take() {
            let _ = alive.send(false);
        }

        if let Some(processor) = self.processor.take() {
            if let Err(e) = processor.await {
                warn!(error = %e, "Processor task failed");
            }
        }

        let killed = self.router.kill_all();
        debug!(links = killed, "Killed links");

        for task in self.accept_tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "Accept task failed");
            }
        }
        self.gateway_addr = None;
        self.peer_addr = None;

        self.context.take();
        if let Some(mut drain) = self.drain_rx.take() {
            if tokio::time::timeout(DRAIN_TIMEOUT, drain.recv()).await.is_err() {
                warn!("Connection tasks still running after shutdown grace period");
            }
        }

        self.state = NodeState::Stopped;
        info!(state = %self.state, "Node stopped");
        Ok(())
    }
}

/// Accept connections for one role until the liveness flag clears.
async fn accept_loop(transport: TcpTransport, context: Context, mut alive: watch::Receiver<bool>) {
    let role = transport.role();
    loop {
        tokio::select! {
            _ = alive.changed() => break,
            accepted = transport.accept() => match accepted {
                Ok((stream, remote)) => {
                    debug!(role = %role, remote = %remote, "Accepted connection");
                    tokio::spawn(connection::serve(context.clone(), role, stream, remote));
                }
                Err(e) => {
                    warn!(role = %role, error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
        }
    }
    debug!(role = %role, "Accept loop stopped");
}
