//! Distributed Service-Discovery Cluster Library
//!
//! This library crate defines the core modules of the discovery server.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The server is composed of four loosely coupled subsystems:
//!
//! - **`registry`**: The group/member state machine. Tracks members with
//!   lease deadlines and home-server-assigned revisions, accumulates the
//!   per-tick change set and reaps expired leases.
//! - **`client`**: The client-facing HTTP surface (`Heartbeat`,
//!   `ListMembers`, `GetGroupMeta`) plus operator introspection.
//! - **`gossip`**: The server-to-server convergence layer. A periodic driver
//!   fans modified members out to every peer; the receive path folds peer
//!   entries into the registry by revision precedence.
//! - **`config`**: The fixed startup configuration (peer set, gossip cadence,
//!   lease bounds).

pub mod client;
pub mod config;
pub mod gossip;
pub mod registry;
