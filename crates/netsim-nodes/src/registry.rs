//! Resolves a topology's `module` string to a `Node` constructor. The
//! original lab dynamically imports a Python/Java/C++ module by name; here
//! that is out of this workspace's scope (§1), so it is a static table of
//! the protocols this workspace ships.

use netsim_core::Node;

use crate::stopwait::StopAndWaitNode;

/// Look up a built-in protocol by the topology's `module` field. `None`
/// means the name is not a known built-in.
pub fn lookup(module: &str) -> Option<fn() -> Box<dyn Node>> {
    match module {
        "stopwait" | "stop-and-wait" | "stopandwait" => Some(new_stop_and_wait),
        _ => None,
    }
}

fn new_stop_and_wait() -> Box<dyn Node> {
    Box::new(StopAndWaitNode::default())
}
