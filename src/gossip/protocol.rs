//! Gossip Network Protocol
//!
//! Endpoint and DTOs for the server-to-server gossip exchange. Every gossip
//! tick, a server posts its recently modified members to each peer; the peer
//! adopts entries whose revision beats its local copy.
//!
//! Lease deadlines travel as absolute microseconds since the Unix epoch, so a
//! peer that accepts an entry expires it at the same wall-clock instant as the
//! sender. There is no delete message: expired members vanish on every server
//! independently.

use serde::{Deserialize, Serialize};

use crate::registry::types::{Attributes, GroupId, MemberId};

/// Internal endpoint peers post modified-member batches to.
pub const ENDPOINT_GOSSIP: &str = "/internal/gossip";

/// Member state carried inside a gossip entry.
///
/// Attributes are optional on the wire: senders attach them at most once per
/// attribute-update period to keep payloads small, and an absent field means
/// "no change" on the receiving side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipMemberInfo {
    pub id: MemberId,
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
}

/// One modified member as seen by the sending server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipEntry {
    pub group_id: GroupId,
    pub member_info: GossipMemberInfo,
    /// Revision assigned by the member's home server; strictly greater wins.
    pub revision: u64,
    /// Absolute lease deadline, microseconds since epoch, taken verbatim.
    pub lease_deadline: u64,
}

/// Request body for the gossip endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct GossipRequest {
    pub members: Vec<GossipEntry>,
}

/// Acknowledgment for a gossip batch.
#[derive(Debug, Serialize, Deserialize)]
pub struct GossipResponse {
    pub success: bool,
}
