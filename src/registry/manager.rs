use dashmap::DashMap;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::group::Group;
use super::member::Member;
use super::types::{now_micros, GroupId, MemberId, MemberInfo, MemberSnapshot};
use crate::gossip::protocol::GossipEntry;

/// How often the reaper scans the deadline heap for expired leases. Queries
/// filter by deadline on their own, so this cadence only bounds how long an
/// expired record occupies memory.
const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_millis(500);

/// Process-wide registry of groups and the entry point for all state changes:
/// client heartbeats, peer gossip and lease expiry.
///
/// The registry keeps three structures. The group map holds the live state.
/// The change set accumulates `(group, member)` keys modified since the last
/// gossip tick; repeated mutations coalesce and the drain is an atomic swap.
/// The expiration heap orders pending lease deadlines so the reaper only
/// touches members that are actually due.
pub struct GroupManager {
    groups: DashMap<GroupId, Arc<Group>>,
    modified: Mutex<HashSet<(GroupId, MemberId)>>,
    expirations: Mutex<BinaryHeap<Reverse<(u64, GroupId, MemberId)>>>,
}

impl GroupManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            groups: DashMap::new(),
            modified: Mutex::new(HashSet::new()),
            expirations: Mutex::new(BinaryHeap::new()),
        })
    }

    /// Spawns the background lease reaper.
    pub fn start(self: Arc<Self>) {
        tokio::spawn(async move {
            self.expiry_loop().await;
        });
    }

    /// Applies a client heartbeat on this server (the member's home server).
    ///
    /// Resolves or creates the group and member, bumps the revision, re-arms
    /// the lease and records the member for the next gossip tick. Heartbeats
    /// for the same member serialize on the member entry, so revisions assigned
    /// here are strictly increasing.
    pub fn process_heartbeat(&self, group_id: &GroupId, info: &MemberInfo, lease: Duration) {
        let now = now_micros();
        let deadline;
        {
            let group = self
                .groups
                .entry(group_id.clone())
                .or_insert_with(|| Arc::new(Group::new(group_id.clone())));
            let mut member = group
                .members
                .entry(info.id.clone())
                .or_insert_with(|| Member::new(group_id.clone(), info.id.clone()));
            member.update_from_heartbeat(info, lease, now);
            deadline = member.lease_deadline();

            tracing::debug!(
                "Processed heartbeat (group: {}, member: {}, revision: {})",
                group_id.0,
                info.id.0,
                member.revision()
            );
        }

        self.mark_modified(group_id, &info.id);
        self.arm_expiry(deadline, group_id, &info.id);
    }

    /// Applies a batch of gossip entries received from a peer server.
    ///
    /// Each entry resolves or creates its group and member and is adopted only
    /// when its revision is strictly newer than the local one. Adopted entries
    /// join the change set so they keep spreading, but their attribute push
    /// stamp is left alone: this server re-advertises attributes on its own
    /// schedule.
    pub fn process_gossip(&self, batch: &[GossipEntry]) {
        for entry in batch {
            if entry.group_id.0.is_empty() || entry.member_info.id.0.is_empty() {
                tracing::warn!("Dropping gossip entry with empty group or member id");
                continue;
            }

            let member_id = &entry.member_info.id;
            let mutated;
            {
                let group = self
                    .groups
                    .entry(entry.group_id.clone())
                    .or_insert_with(|| Arc::new(Group::new(entry.group_id.clone())));
                let mut member = group
                    .members
                    .entry(member_id.clone())
                    .or_insert_with(|| Member::new(entry.group_id.clone(), member_id.clone()));
                mutated = member.update_from_gossip(entry);
            }

            if mutated {
                self.mark_modified(&entry.group_id, member_id);
            }
            self.arm_expiry(entry.lease_deadline, &entry.group_id, member_id);
        }
    }

    /// Looks up a group for a client query. A group with no live members is
    /// indistinguishable from a missing one.
    pub fn get_group(&self, group_id: &GroupId) -> Option<Arc<Group>> {
        let group = self.groups.get(group_id)?.clone();
        if group.member_count(now_micros()) == 0 {
            return None;
        }
        Some(group)
    }

    /// Atomically swaps out the change set and returns snapshots of its
    /// members. Members that expired or were removed since their mutation are
    /// skipped; peers hold the same deadline and purge them independently.
    pub fn drain_modified(&self) -> Vec<MemberSnapshot> {
        let keys = std::mem::take(&mut *self.modified.lock().unwrap());
        let now = now_micros();

        let mut snapshots = Vec::with_capacity(keys.len());
        for (group_id, member_id) in keys {
            let Some(group) = self.groups.get(&group_id) else {
                continue;
            };
            let Some(member) = group.members.get(&member_id) else {
                continue;
            };
            if !member.is_expired(now) {
                snapshots.push(member.snapshot());
            }
        }
        snapshots
    }

    /// Number of members currently waiting for the next gossip tick.
    pub fn modified_count(&self) -> usize {
        self.modified.lock().unwrap().len()
    }

    /// Records when the attribute blob of a member was last attached to
    /// outgoing gossip. Called by the gossip driver after dispatch.
    pub fn mark_attributes_pushed(&self, group_id: &GroupId, member_id: &MemberId, at: u64) {
        if let Some(group) = self.groups.get(group_id) {
            if let Some(mut member) = group.members.get_mut(member_id) {
                member.set_last_gossip_attributes_pushed_at(at);
            }
        }
    }

    /// Removes members whose lease deadline has passed and drops groups that
    /// became empty. Returns the number of members removed.
    ///
    /// Deadlines are re-armed on every heartbeat, so a heap entry whose member
    /// is still live is simply stale and gets skipped; the fresher entry for
    /// the extended lease is already in the heap.
    pub fn sweep_expired(&self, now: u64) -> usize {
        let mut removed = 0;

        loop {
            let due = {
                let mut expirations = self.expirations.lock().unwrap();
                match expirations.peek() {
                    Some(Reverse((deadline, _, _))) if *deadline <= now => expirations.pop(),
                    _ => None,
                }
            };
            let Some(Reverse((_, group_id, member_id))) = due else {
                break;
            };

            let mut group_drained = false;
            if let Some(group) = self.groups.get(&group_id) {
                let expired = group
                    .members
                    .get(&member_id)
                    .map(|member| member.is_expired(now))
                    .unwrap_or(false);
                if expired {
                    group.remove(&member_id);
                    removed += 1;
                    tracing::info!(
                        "Member lease expired (group: {}, member: {})",
                        group_id.0,
                        member_id.0
                    );
                    group_drained = group.is_empty();
                }
            }

            if group_drained {
                self.groups.remove_if(&group_id, |_, group| group.is_empty());
            }
        }

        removed
    }

    /// Read-only operator view: every group with its live members, sorted by
    /// group id and member id.
    pub fn introspection_view(&self, now: u64) -> Vec<(GroupId, Vec<MemberSnapshot>)> {
        let mut groups: Vec<(GroupId, Vec<MemberSnapshot>)> = self
            .groups
            .iter()
            .map(|entry| {
                let mut members: Vec<MemberSnapshot> = entry
                    .value()
                    .members
                    .iter()
                    .filter(|member| !member.value().is_expired(now))
                    .map(|member| member.value().snapshot())
                    .collect();
                members.sort_by(|a, b| a.id.cmp(&b.id));
                (entry.key().clone(), members)
            })
            .filter(|(_, members)| !members.is_empty())
            .collect();

        groups.sort_by(|a, b| a.0.cmp(&b.0));
        groups
    }

    /// Number of groups with at least one live member.
    pub fn group_count(&self, now: u64) -> usize {
        self.groups
            .iter()
            .filter(|entry| entry.value().member_count(now) > 0)
            .count()
    }

    /// Total live members across all groups.
    pub fn member_count(&self, now: u64) -> usize {
        self.groups
            .iter()
            .map(|entry| entry.value().member_count(now))
            .sum()
    }

    async fn expiry_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let removed = self.sweep_expired(now_micros());
            if removed > 0 {
                tracing::debug!("Expiry sweep removed {} members", removed);
            }
        }
    }

    fn mark_modified(&self, group_id: &GroupId, member_id: &MemberId) {
        self.modified
            .lock()
            .unwrap()
            .insert((group_id.clone(), member_id.clone()));
    }

    fn arm_expiry(&self, deadline: u64, group_id: &GroupId, member_id: &MemberId) {
        self.expirations
            .lock()
            .unwrap()
            .push(Reverse((deadline, group_id.clone(), member_id.clone())));
    }
}
