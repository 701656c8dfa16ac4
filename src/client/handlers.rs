//! Client API Handlers
//!
//! HTTP endpoints exposed to end clients and operators. These translate
//! requests into registry calls and map failures onto status codes: bad input
//! is 400, an unknown or empty group is 404.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;

use super::protocol::{
    GroupInspectEntry, GroupMetaResponse, HeartbeatRequest, HeartbeatResponse, InspectResponse,
    ListMembersParams, ListMembersResponse, MemberEntry, MemberInspectEntry, DEFAULT_MEMBER_LIMIT,
};
use crate::config::DiscoveryConfig;
use crate::registry::manager::GroupManager;
use crate::registry::types::{now_micros, Attributes, GroupId};

/// Checks a heartbeat request and returns the validated lease duration.
pub fn validate_heartbeat(
    req: &HeartbeatRequest,
    config: &DiscoveryConfig,
) -> Result<Duration, String> {
    if req.group_id.0.is_empty() {
        return Err("group id must be non-empty".to_string());
    }
    if req.member_info.id.0.is_empty() {
        return Err("member id must be non-empty".to_string());
    }
    if req.lease_timeout_ms == 0 {
        return Err("lease timeout must be positive".to_string());
    }

    let lease = Duration::from_millis(req.lease_timeout_ms);
    if lease < config.min_lease || lease > config.max_lease {
        return Err(format!(
            "lease timeout {:?} outside allowed range [{:?}, {:?}]",
            lease, config.min_lease, config.max_lease
        ));
    }

    Ok(lease)
}

/// Splits the `keys` query parameter into attribute key names.
pub fn parse_attribute_keys(raw: Option<&str>) -> Vec<String> {
    raw.map(|keys| {
        keys.split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Projects the requested keys out of a member's attributes. Keys the member
/// does not carry are skipped rather than reported as errors.
pub fn project_attributes(attributes: &Attributes, keys: &[String]) -> Attributes {
    keys.iter()
        .filter_map(|key| {
            attributes
                .get(key)
                .map(|value| (key.clone(), value.clone()))
        })
        .collect()
}

pub async fn handle_heartbeat(
    Extension(manager): Extension<Arc<GroupManager>>,
    Extension(config): Extension<Arc<DiscoveryConfig>>,
    Json(req): Json<HeartbeatRequest>,
) -> (StatusCode, Json<HeartbeatResponse>) {
    let lease = match validate_heartbeat(&req, &config) {
        Ok(lease) => lease,
        Err(reason) => {
            tracing::debug!("Rejected heartbeat: {}", reason);
            return (
                StatusCode::BAD_REQUEST,
                Json(HeartbeatResponse { success: false }),
            );
        }
    };

    manager.process_heartbeat(&req.group_id, &req.member_info, lease);

    (StatusCode::OK, Json(HeartbeatResponse { success: true }))
}

pub async fn handle_list_members(
    Extension(manager): Extension<Arc<GroupManager>>,
    Path(group_id): Path<String>,
    Query(params): Query<ListMembersParams>,
) -> (StatusCode, Json<ListMembersResponse>) {
    let group_id = GroupId(group_id);
    let Some(group) = manager.get_group(&group_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ListMembersResponse { members: vec![] }),
        );
    };

    let limit = params.limit.unwrap_or(DEFAULT_MEMBER_LIMIT);
    let keys = parse_attribute_keys(params.keys.as_deref());

    let members = group
        .list_members(limit, now_micros())
        .into_iter()
        .map(|snapshot| MemberEntry {
            id: snapshot.id,
            priority: snapshot.priority,
            attributes: project_attributes(&snapshot.attributes, &keys),
        })
        .collect();

    (StatusCode::OK, Json(ListMembersResponse { members }))
}

pub async fn handle_group_meta(
    Extension(manager): Extension<Arc<GroupManager>>,
    Path(group_id): Path<String>,
) -> (StatusCode, Json<GroupMetaResponse>) {
    let group_id = GroupId(group_id);
    let Some(group) = manager.get_group(&group_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(GroupMetaResponse { member_count: 0 }),
        );
    };

    let member_count = group.member_count(now_micros());
    (StatusCode::OK, Json(GroupMetaResponse { member_count }))
}

pub async fn handle_inspect(
    Extension(manager): Extension<Arc<GroupManager>>,
) -> Json<InspectResponse> {
    let groups = manager
        .introspection_view(now_micros())
        .into_iter()
        .map(|(group_id, members)| GroupInspectEntry {
            group_id,
            members: members
                .into_iter()
                .map(|snapshot| MemberInspectEntry {
                    id: snapshot.id,
                    priority: snapshot.priority,
                    revision: snapshot.revision,
                    lease_deadline: snapshot.lease_deadline,
                    attributes: snapshot
                        .attributes
                        .iter()
                        .map(|(key, value)| {
                            (key.clone(), String::from_utf8_lossy(value).into_owned())
                        })
                        .collect::<BTreeMap<String, String>>(),
                })
                .collect(),
        })
        .collect();

    Json(InspectResponse { groups })
}

#[derive(Serialize)]
pub struct RoutesResponse {
    pub routes: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct NodeStatsResponse {
    pub self_address: String,
    pub peer_addresses: Vec<String>,
    pub group_count: usize,
    pub member_count: usize,
    pub pending_gossip_members: usize,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}

pub async fn handle_routes() -> Json<RoutesResponse> {
    Json(RoutesResponse {
        routes: vec![
            "/health/routes",
            "/health/stats",
            "/heartbeat",
            "/members/:group_id",
            "/groups/:group_id/meta",
            "/inspect",
            "/internal/gossip",
        ],
    })
}

pub async fn handle_stats(
    Extension(manager): Extension<Arc<GroupManager>>,
    Extension(config): Extension<Arc<DiscoveryConfig>>,
) -> Json<NodeStatsResponse> {
    let now = now_micros();
    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo reports memory in bytes.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(NodeStatsResponse {
        self_address: config.self_address.clone(),
        peer_addresses: config.peer_addresses.clone(),
        group_count: manager.group_count(now),
        member_count: manager.member_count(now),
        pending_gossip_members: manager.modified_count(),
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
    })
}
