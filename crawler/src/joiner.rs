use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use krpc_protocol::NodeId;
use rand::seq::SliceRandom;
use tokio::net::lookup_host;
use tokio::sync::watch;
use tracing::debug;

use crate::config::BOOTSTRAP_ROUTERS;
use crate::state::SharedState;

/// For up to 20 iterations at 10-second intervals, sends `find_node` to one
/// randomly chosen bootstrap router while the node pool is empty. After 20
/// iterations it exits; subsequent restocking relies on the Sniffer's own
/// amplification.
pub async fn run(state: Arc<SharedState>, mut stop: watch::Receiver<bool>) {
    for _ in 0..20 {
        if *stop.borrow() {
            return;
        }
        if state.pool.is_empty().await {
            if let Some(addr) = resolve_random_router().await {
                debug!(%addr, "joiner: bootstrapping");
                state
                    .transport
                    .send_find_node(state.self_id, NodeId::random(), addr)
                    .await;
            }
        }

        tokio::select! {
            _ = stop.changed() => {
                if *stop.borrow() {
                    return;
                }
            }
            _ = tokio::time::sleep(Duration::from_secs(10)) => {}
        }
    }
}

async fn resolve_random_router() -> Option<SocketAddr> {
    let (host, port) = BOOTSTRAP_ROUTERS.choose(&mut rand::thread_rng())?;
    lookup_host((*host, *port)).await.ok()?.next()
}
