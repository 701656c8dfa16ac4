//! Client-Facing Service
//!
//! The RPC surface end clients talk to: heartbeating a member into a group,
//! listing a group's members ranked by priority, and reading group metadata.
//! Also carries the operator endpoints (registry tree, node stats).

pub mod handlers;
pub mod protocol;
