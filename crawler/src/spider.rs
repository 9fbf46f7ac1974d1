use std::net::SocketAddr;
use std::sync::Arc;

use krpc_protocol::NodeId;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::node_pool::NodePool;
use crate::state::SharedState;
use crate::storage::MetadataSink;
use crate::transport::Transport;
use crate::{inquirer, joiner, receiver, recorder, sniffer};

/// One independent crawler instance: its own UDP socket, node pool, and
/// task set (Joiner, Receiver, Sniffer, Inquirer, Recorder). A process can
/// run several `Spider`s side by side, each bound to a different port, to
/// scale horizontally without sharing state.
pub struct Spider {
    stop_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Spider {
    /// Binds the UDP socket, wires up shared state, and starts every task
    /// loop. Returns once the socket is bound and tasks are spawned; it
    /// does not wait for them to finish.
    pub async fn start(config: &Config, sink: Arc<dyn MetadataSink>) -> std::io::Result<Spider> {
        let bind_addr = SocketAddr::from((config.bind_ip, config.bind_port));
        let socket = Arc::new(UdpSocket::bind(bind_addr).await?);
        let transport = Transport::new(socket.clone());

        let (inquiry_tx, inquiry_rx) = async_channel::unbounded();
        let (metadata_tx, metadata_rx) = async_channel::unbounded();

        let state = Arc::new(SharedState {
            self_id: NodeId::random(),
            bind_ip: config.bind_ip,
            pool: NodePool::new(config.max_node_size),
            transport,
            inquiry_tx,
            inquiry_rx,
            metadata_tx,
            metadata_rx,
        });

        sink.init()
            .await
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

        let (stop_tx, stop_rx) = watch::channel(false);

        info!(addr = %bind_addr, id = %state.self_id.to_hex(), "spider: starting");

        let tasks = vec![
            tokio::spawn(joiner::run(state.clone(), stop_rx.clone())),
            tokio::spawn(receiver::run(socket, state.clone(), stop_rx.clone())),
            tokio::spawn(sniffer::run(state.clone(), stop_rx.clone())),
            tokio::spawn(inquirer::run(state.clone(), stop_rx.clone())),
            tokio::spawn(recorder::run(state, sink, stop_rx)),
        ];

        Ok(Spider { stop_tx, tasks })
    }

    /// Signals every task to stop and waits for them to return. Tasks poll
    /// the stop flag at their own natural yield points (queue-empty
    /// backoffs, `select!` arms), so this is not instantaneous.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
