use thiserror::Error;

/// Contract violations and internal-consistency failures (§7 taxonomy,
/// second bullet). These are unrecoverable: the scheduler surfaces them as
/// `Err` rather than panicking so the engine stays usable as a library (e.g.
/// from tests), and `netsim-cli` turns any of them into exit code 1.
#[derive(Debug, Error)]
pub enum SimFault {
    #[error("time is running backwards: earliest pending event at {earliest}us but clock is at {now}us")]
    TimeRunningBackwards { now: u64, earliest: u64 },

    #[error("node {node} does not have a link for an inbound frame delivery")]
    ReceivingNodeMissingLink { node: usize },

    #[error("recursive call_node_handler: node {node} is still dispatching")]
    RecursiveDispatch { node: usize },

    #[error("node {node} handler for {event} panicked: {message}")]
    NodeHandlerPanicked {
        node: usize,
        event: &'static str,
        message: String,
    },
}
