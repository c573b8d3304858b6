//! Data contracts shared by the rest of the workspace: time/bandwidth literal
//! parsing (component A), the link model (component B), the node-facing
//! trait contract (component H), the topology JSON schema (component J's
//! input), and the error types used throughout.
//!
//! This crate has no knowledge of the scheduler itself — see `netsim-engine`
//! for the event/timer queues, RNG, frame delivery, and dispatch loop that
//! implement `NodeContext` against these contracts.

pub mod error;
pub mod link;
pub mod node;
pub mod time;
pub mod topology;

pub use error::ConfigError;
pub use link::{Link, LinkInfo, LinkType};
pub use node::{DeadTimerError, LinkSnapshot, Node, NodeContext, NodeEvent, NodeEventKind, TimerSlot};
pub use topology::{HostRecord, LinkRecord, TopologyRecord};
