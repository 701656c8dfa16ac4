//! Group & Member Registry
//!
//! The in-memory state machine at the heart of the discovery server. Clients
//! heartbeat members into named groups; each heartbeat refreshes a lease and
//! bumps a revision assigned by this server. Peer servers exchange modified
//! members via gossip and adopt whichever copy carries the higher revision.
//!
//! ## Core Mechanisms
//! - **Leases**: a member is live until its absolute deadline. Expiry is lazy:
//!   queries filter by deadline immediately, while a background reaper removes
//!   expired records and empty groups.
//! - **Revisions**: a per-member counter bumped on every home-server heartbeat.
//!   Gossip conflicts resolve last-writer-wins on the revision; ties keep
//!   local state.
//! - **Change set**: members modified since the last gossip tick, coalesced by
//!   `(group, member)` and drained atomically by the gossip driver.

pub mod group;
pub mod manager;
pub mod member;
pub mod types;

#[cfg(test)]
mod tests;
