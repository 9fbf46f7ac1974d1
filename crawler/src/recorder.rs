use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, warn};

use crate::decode::{self, DefaultHeuristicDecoder};
use crate::state::SharedState;
use crate::storage::MetadataSink;
use crate::types::MetadataRecord;

const EMPTY_QUEUE_BACKOFF: Duration = Duration::from_millis(500);

/// Drains the metadata queue, decodes each record's filename, and inserts
/// it into `sink`. A record whose name survives no decode step is dropped
/// entirely: a torrent name we can't render as text is not worth keeping.
pub async fn run(state: Arc<SharedState>, sink: Arc<dyn MetadataSink>, mut stop: watch::Receiver<bool>) {
    let heuristic = DefaultHeuristicDecoder;

    while !*stop.borrow() {
        match state.metadata_rx.try_recv() {
            Ok(record) => {
                if let Some(name) = decode::decode_name(&record.name, &heuristic) {
                    let record = MetadataRecord {
                        name: name.into_bytes(),
                        ..record
                    };
                    if let Err(err) = sink.insert(&record).await {
                        error!(hash = %record.hash, %err, "recorder: insert failed");
                    }
                } else {
                    warn!(hash = %record.hash, "recorder: undecodable name, dropping record");
                }
            }
            Err(_) => {
                tokio::select! {
                    _ = stop.changed() => {}
                    _ = tokio::time::sleep(EMPTY_QUEUE_BACKOFF) => {}
                }
            }
        }
    }
}
