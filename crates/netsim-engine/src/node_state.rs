//! Per-node runtime state the scheduler maintains alongside each registered
//! `Node` implementation (§3 Data model, `Node` entity).

use std::collections::{HashMap, HashSet};

use netsim_core::{LinkInfo, Node, NodeEventKind};

pub struct NodeState {
    pub index: usize,
    pub name: String,

    /// Global link IDs this node is attached to; local index 0 is always
    /// this node's loopback (§3 invariant 6).
    pub links: Vec<usize>,
    /// Per-endpoint physical parameters, parallel to `links`.
    pub link_infos: Vec<LinkInfo>,

    /// Event kinds this node has registered a handler for via
    /// `set_handler`. `Reboot` is dispatched regardless of this set.
    pub registered: HashSet<NodeEventKind>,

    pub messagerate_usec: u64,
    pub application_enabled: bool,
    pub application_destinations: Vec<usize>,
    /// Payload bytes -> send timestamp, keyed by byte identity (§3 invariant 7).
    pub application_waiting: HashMap<Vec<u8>, u64>,
    /// `None` means "due for a fresh Poisson draw next time it's consulted".
    pub next_message_usec: Option<u64>,

    /// Taken out for the duration of a dispatch so the scheduler can hand
    /// itself to the implementation as `&mut dyn NodeContext` without
    /// aliasing `self`; always `Some` between dispatches.
    pub implementation: Option<Box<dyn Node>>,
}

impl NodeState {
    pub fn new(
        index: usize,
        name: String,
        links: Vec<usize>,
        link_infos: Vec<LinkInfo>,
        messagerate_usec: u64,
        implementation: Box<dyn Node>,
    ) -> Self {
        Self {
            index,
            name,
            links,
            link_infos,
            registered: HashSet::new(),
            messagerate_usec,
            application_enabled: false,
            application_destinations: Vec::new(),
            application_waiting: HashMap::new(),
            next_message_usec: None,
            implementation: Some(implementation),
        }
    }
}
