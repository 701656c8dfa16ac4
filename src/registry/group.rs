use dashmap::DashMap;

use super::member::Member;
use super::types::{GroupId, MemberId, MemberSnapshot};

/// A named set of members. The group exclusively owns its member records;
/// callers only ever see `MemberSnapshot` copies.
pub struct Group {
    id: GroupId,
    pub(crate) members: DashMap<MemberId, Member>,
}

impl Group {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            members: DashMap::new(),
        }
    }

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    /// Lists up to `limit` live members, sorted ascending by priority with
    /// lexicographic member id as the tie breaker. Members whose lease expired
    /// are filtered out even if the reaper has not removed them yet.
    pub fn list_members(&self, limit: usize, now: u64) -> Vec<MemberSnapshot> {
        let mut members: Vec<MemberSnapshot> = self
            .members
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .map(|entry| entry.value().snapshot())
            .collect();

        members.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        members.truncate(limit);
        members
    }

    /// Number of members whose lease is still live.
    pub fn member_count(&self, now: u64) -> usize {
        self.members
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }

    pub fn remove(&self, member_id: &MemberId) -> bool {
        self.members.remove(member_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
