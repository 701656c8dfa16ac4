use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of a group of members, supplied by clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub String);

/// Identifier of a member, unique within its group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(pub String);

/// Opaque attribute payload published by a member alongside its heartbeat.
pub type Attributes = BTreeMap<String, Vec<u8>>;

/// The member-supplied part of a heartbeat: identity, ranking priority and
/// the attribute blob to publish. An empty attribute map means "keep whatever
/// was published before".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: MemberId,
    pub priority: i64,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Immutable read view of a member, as returned by listings and by the
/// change-set drain. All instants are microseconds since the Unix epoch.
#[derive(Debug, Clone)]
pub struct MemberSnapshot {
    pub group_id: GroupId,
    pub id: MemberId,
    pub priority: i64,
    pub revision: u64,
    pub attributes: Attributes,
    pub lease_deadline: u64,
    pub last_gossip_attributes_pushed_at: u64,
}

/// Current wall-clock time in microseconds since the Unix epoch.
pub fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}
