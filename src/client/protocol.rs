//! Client Network Protocol
//!
//! Endpoints and DTOs of the client-facing surface: heartbeating a member
//! into a group, listing a group's members and fetching group metadata.
//!
//! Lease durations arrive in milliseconds; everything time-like the server
//! reports back (lease deadlines in the operator view) is absolute
//! microseconds since the Unix epoch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::registry::types::{Attributes, GroupId, MemberId, MemberInfo};

/// Public endpoint for member heartbeats.
pub const ENDPOINT_HEARTBEAT: &str = "/heartbeat";
/// Public endpoint prefix for ranked member listings.
pub const ENDPOINT_MEMBERS: &str = "/members";
/// Public endpoint prefix for group metadata.
pub const ENDPOINT_GROUPS: &str = "/groups";
/// Operator endpoint exposing the full registry tree.
pub const ENDPOINT_INSPECT: &str = "/inspect";

/// Listing size cap applied when the client does not pass one.
pub const DEFAULT_MEMBER_LIMIT: usize = 100;

/// Client request refreshing a member's lease and published state.
#[derive(Debug, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub group_id: GroupId,
    pub member_info: MemberInfo,
    pub lease_timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub success: bool,
}

/// Query parameters of the member listing endpoint. `keys` is a
/// comma-separated list of attribute keys to project into the response;
/// requested keys a member does not carry are silently omitted.
#[derive(Debug, Deserialize)]
pub struct ListMembersParams {
    pub limit: Option<usize>,
    pub keys: Option<String>,
}

/// One member in a listing response.
#[derive(Debug, Serialize, Deserialize)]
pub struct MemberEntry {
    pub id: MemberId,
    pub priority: i64,
    pub attributes: Attributes,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListMembersResponse {
    pub members: Vec<MemberEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupMetaResponse {
    pub member_count: usize,
}

/// Operator view of one member. Attribute values are rendered lossily as
/// UTF-8 for readability; clients needing exact bytes use the listing
/// endpoint.
#[derive(Debug, Serialize)]
pub struct MemberInspectEntry {
    pub id: MemberId,
    pub priority: i64,
    pub revision: u64,
    pub lease_deadline: u64,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct GroupInspectEntry {
    pub group_id: GroupId,
    pub members: Vec<MemberInspectEntry>,
}

#[derive(Debug, Serialize)]
pub struct InspectResponse {
    pub groups: Vec<GroupInspectEntry>,
}
