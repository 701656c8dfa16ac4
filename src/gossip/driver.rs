use std::sync::Arc;
use std::time::Duration;

use super::protocol::{GossipEntry, GossipMemberInfo, GossipRequest, ENDPOINT_GOSSIP};
use crate::config::DiscoveryConfig;
use crate::registry::manager::GroupManager;
use crate::registry::types::{now_micros, MemberSnapshot};

/// Periodic fan-out of recently modified members to every peer server.
///
/// Each tick drains the registry's change set once and sends the same entry
/// list to all peers. Dispatches are fire-and-forget: a failed or timed-out
/// send is logged and dropped, and the next tick carries newer state anyway.
/// Ticks never overlap; a tick that overruns the period skips a beat.
pub struct GossipDriver {
    manager: Arc<GroupManager>,
    config: Arc<DiscoveryConfig>,
    http_client: reqwest::Client,
}

impl GossipDriver {
    pub fn new(manager: Arc<GroupManager>, config: Arc<DiscoveryConfig>) -> Arc<Self> {
        Arc::new(Self {
            manager,
            config,
            http_client: reqwest::Client::new(),
        })
    }

    pub fn start(self: Arc<Self>) {
        tokio::spawn(async move {
            self.gossip_loop().await;
        });
    }

    async fn gossip_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.gossip_period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            self.run_tick();
        }
    }

    /// One gossip tick: drain, build payload, dispatch, stamp.
    pub fn run_tick(&self) {
        let drained = self.manager.drain_modified();
        if drained.is_empty() {
            return;
        }

        let tick_start = now_micros();
        tracing::debug!("Gossip started ({} modified members)", drained.len());

        let entries = build_entries(&drained, tick_start, self.config.attributes_update_period);

        for address in &self.config.peer_addresses {
            if *address == self.config.self_address {
                continue;
            }
            self.dispatch(address.clone(), entries.clone());
        }

        // Only now that the payloads are on their way do the attribute stamps
        // move, and only for members whose attributes were actually attached.
        for snapshot in &drained {
            if attributes_due(snapshot, tick_start, self.config.attributes_update_period) {
                self.manager
                    .mark_attributes_pushed(&snapshot.group_id, &snapshot.id, tick_start);
            }
        }
    }

    fn dispatch(&self, address: String, entries: Vec<GossipEntry>) {
        let client = self.http_client.clone();
        let url = format!("http://{}{}", address, ENDPOINT_GOSSIP);
        let timeout = self.config.gossip_period;

        tokio::spawn(async move {
            let body = GossipRequest { members: entries };
            match client.post(&url).json(&body).timeout(timeout).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("Gossip succeeded (address: {})", address);
                }
                Ok(response) => {
                    tracing::debug!(
                        "Gossip rejected (address: {}, status: {})",
                        address,
                        response.status()
                    );
                }
                Err(e) => {
                    tracing::debug!("Gossip failed (address: {}): {}", address, e);
                }
            }
        });
    }
}

/// Builds the wire entries for one tick. Attributes are attached only for
/// members whose last push is at least one attribute-update period old;
/// revision, priority and deadline travel on every tick.
pub fn build_entries(
    drained: &[MemberSnapshot],
    tick_start: u64,
    attributes_update_period: Duration,
) -> Vec<GossipEntry> {
    drained
        .iter()
        .map(|snapshot| GossipEntry {
            group_id: snapshot.group_id.clone(),
            member_info: GossipMemberInfo {
                id: snapshot.id.clone(),
                priority: snapshot.priority,
                attributes: attributes_due(snapshot, tick_start, attributes_update_period)
                    .then(|| snapshot.attributes.clone()),
            },
            revision: snapshot.revision,
            lease_deadline: snapshot.lease_deadline,
        })
        .collect()
}

pub(crate) fn attributes_due(
    snapshot: &MemberSnapshot,
    tick_start: u64,
    attributes_update_period: Duration,
) -> bool {
    tick_start.saturating_sub(snapshot.last_gossip_attributes_pushed_at)
        >= attributes_update_period.as_micros() as u64
}
