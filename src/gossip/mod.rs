//! Inter-Server Gossip
//!
//! Convergence layer between discovery servers. Each server tracks which
//! members it modified since the last tick and periodically pushes them to
//! every peer over HTTP; receivers adopt entries by revision precedence.
//!
//! ## Core Mechanisms
//! - **Delta gossip**: only members touched since the previous tick travel,
//!   not the whole registry.
//! - **Attribute throttling**: the (potentially large) attribute blob rides
//!   along at most once per configured period per member, while revision and
//!   lease churn travels every tick.
//! - **Expiry by absence**: deadlines are absolute, so peers purge expired
//!   members on their own; no tombstone messages exist.

pub mod driver;
pub mod handlers;
pub mod protocol;
