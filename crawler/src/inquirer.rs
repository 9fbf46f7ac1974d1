use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::debug;

use crate::bloom::BloomFilter;
use crate::peer;
use crate::state::SharedState;

/// Concurrency ceiling for simultaneous BEP-9 fetch tasks.
const MAX_CONCURRENT_FETCHES: usize = 100;
const BATCH_SIZE: usize = 1000;
const BLOOM_BITS: usize = 5000;
const BLOOM_HASHES: usize = 5;
const FETCH_TIMEOUT: Duration = Duration::from_secs(7);

/// Supervises the announce queue. Each batch gets a fresh Bloom filter so
/// its saturation stays bounded; admitted announces spawn a fetch task,
/// concurrency-limited by a semaphore rather than 100 redundant consumer
/// threads each polling the same queue (see DESIGN.md).
pub async fn run(state: Arc<SharedState>, mut stop: watch::Receiver<bool>) {
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));

    while !*stop.borrow() {
        let mut bloom = BloomFilter::new(BLOOM_BITS, BLOOM_HASHES);
        let mut admitted = 0usize;

        for _ in 0..BATCH_SIZE {
            let announce = match state.inquiry_rx.try_recv() {
                Ok(announce) => announce,
                Err(_) => break,
            };

            let mut key = Vec::with_capacity(24);
            key.extend_from_slice(announce.info_hash.as_bytes());
            key.extend_from_slice(&announce.peer_addr.ip().octets());

            if !bloom.add(&key) {
                continue;
            }

            admitted += 1;
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let metadata_tx = state.metadata_tx.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let Some(record) = peer::fetch(announce.info_hash, announce.peer_addr, FETCH_TIMEOUT).await {
                    debug!(hash = %record.hash, "inquirer: fetched metadata");
                    let _ = metadata_tx.send(record).await;
                }
            });
        }

        if admitted == 0 {
            tokio::select! {
                _ = stop.changed() => {}
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
        }
    }
}
