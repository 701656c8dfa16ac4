//! Gossip Receive Path
//!
//! The HTTP handler peers post their modified-member batches to. Large
//! payloads are split into sub-batches before hitting the registry so that no
//! single critical section holds the maps for the whole request.

use axum::{extract::Extension, http::StatusCode, Json};
use std::sync::Arc;

use super::protocol::{GossipRequest, GossipResponse};
use crate::config::DiscoveryConfig;
use crate::registry::manager::GroupManager;

pub async fn handle_process_gossip(
    Extension(manager): Extension<Arc<GroupManager>>,
    Extension(config): Extension<Arc<DiscoveryConfig>>,
    Json(req): Json<GossipRequest>,
) -> (StatusCode, Json<GossipResponse>) {
    tracing::debug!("Received gossip ({} entries)", req.members.len());

    for batch in req.members.chunks(config.gossip_batch_size.max(1)) {
        manager.process_gossip(batch);
    }

    (StatusCode::OK, Json(GossipResponse { success: true }))
}
