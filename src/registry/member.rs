use std::time::Duration;

use super::types::{Attributes, GroupId, MemberId, MemberInfo, MemberSnapshot};
use crate::gossip::protocol::GossipEntry;

/// A single registered member: the unit of replication between servers.
///
/// Every mutation goes through exactly one of two paths. `update_from_heartbeat`
/// runs on the server that received the client heartbeat (the home server) and
/// assigns a fresh revision. `update_from_gossip` runs on every other server and
/// adopts remote state only when the remote revision is strictly newer, so the
/// home server's view always wins ties.
#[derive(Debug, Clone)]
pub struct Member {
    id: MemberId,
    group_id: GroupId,
    priority: i64,
    attributes: Attributes,
    revision: u64,
    /// Absolute liveness deadline, microseconds since epoch.
    lease_deadline: u64,
    /// When this server last attached the attribute blob to outgoing gossip.
    last_gossip_attributes_pushed_at: u64,
    /// Last locally observed heartbeat. Meaningful on the home server only.
    last_heartbeat_at: u64,
}

impl Member {
    pub fn new(group_id: GroupId, id: MemberId) -> Self {
        Self {
            id,
            group_id,
            priority: 0,
            attributes: Attributes::new(),
            revision: 0,
            lease_deadline: 0,
            last_gossip_attributes_pushed_at: 0,
            last_heartbeat_at: 0,
        }
    }

    /// Applies a client heartbeat on the home server.
    ///
    /// Bumps the revision by one, replaces the priority, re-arms the lease and
    /// replaces the attributes only when the incoming set is non-empty.
    pub fn update_from_heartbeat(&mut self, info: &MemberInfo, lease: Duration, now: u64) {
        self.revision += 1;
        self.priority = info.priority;
        if !info.attributes.is_empty() {
            self.attributes = info.attributes.clone();
        }
        self.lease_deadline = now.saturating_add(lease.as_micros() as u64);
        self.last_heartbeat_at = now;
    }

    /// Applies a gossip entry received from a peer server.
    ///
    /// Entries at or below the local revision are ignored. Newer entries adopt
    /// revision, priority and the peer-supplied deadline verbatim; attributes
    /// are replaced only when the entry carries them (absent means no change).
    ///
    /// Returns whether the entry changed local state.
    pub fn update_from_gossip(&mut self, entry: &GossipEntry) -> bool {
        if entry.revision <= self.revision {
            return false;
        }

        self.revision = entry.revision;
        self.priority = entry.member_info.priority;
        self.lease_deadline = entry.lease_deadline;
        if let Some(attributes) = &entry.member_info.attributes {
            self.attributes = attributes.clone();
        }

        true
    }

    pub fn snapshot(&self) -> MemberSnapshot {
        MemberSnapshot {
            group_id: self.group_id.clone(),
            id: self.id.clone(),
            priority: self.priority,
            revision: self.revision,
            attributes: self.attributes.clone(),
            lease_deadline: self.lease_deadline,
            last_gossip_attributes_pushed_at: self.last_gossip_attributes_pushed_at,
        }
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn lease_deadline(&self) -> u64 {
        self.lease_deadline
    }

    pub fn last_heartbeat_at(&self) -> u64 {
        self.last_heartbeat_at
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.lease_deadline <= now
    }

    pub fn set_last_gossip_attributes_pushed_at(&mut self, at: u64) {
        self.last_gossip_attributes_pushed_at = at;
    }
}
