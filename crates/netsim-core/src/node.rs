//! The node-facing API contract (component H): the fixed event enumeration,
//! the trait a user protocol implements, and the capability handle the
//! engine hands it during dispatch.
//!
//! The teacher codebase mutates the user module's own namespace so student
//! code can call `write_physical(...)` etc. as free functions (see the
//! Design Notes on "callback registration vs. dynamic dispatch" — that
//! trick has no safe equivalent here). Instead a `&mut dyn NodeContext` is
//! threaded into every callback; it is only ever constructed for the
//! duration of one dispatch, so calling it outside a callback is not
//! something a `Node` implementation can even attempt.

use thiserror::Error;

use crate::link::{LinkInfo, LinkType};

/// A read-only snapshot of a link's physical parameters as seen from one
/// attached node (§3 `Node` entity: "ordered list of links with per-link
/// configuration"). A stop-and-wait-style protocol needs its own link's
/// bandwidth and propagation delay to size a sensible retransmission
/// timeout; this is how it gets it without reaching into engine internals.
#[derive(Debug, Clone, Copy)]
pub struct LinkSnapshot {
    pub link_type: LinkType,
    pub up: bool,
    pub bandwidth_bps: u64,
    pub propagation_delay_usec: u64,
}

impl From<&LinkInfo> for LinkSnapshot {
    fn from(info: &LinkInfo) -> Self {
        Self {
            link_type: info.link_type,
            up: info.up,
            bandwidth_bps: info.bandwidth_bps,
            propagation_delay_usec: info.propagation_delay_usec,
        }
    }
}

/// One of the seven timer slots a node may arm (TIMER0..TIMER6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
}

impl TimerSlot {
    pub const ALL: [TimerSlot; 7] = [
        TimerSlot::T0,
        TimerSlot::T1,
        TimerSlot::T2,
        TimerSlot::T3,
        TimerSlot::T4,
        TimerSlot::T5,
        TimerSlot::T6,
    ];
}

/// The fixed event-kind enumeration nodes may register interest in via
/// [`NodeContext::set_handler`]. `Reboot` is always dispatched once at
/// startup regardless of registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeEventKind {
    Reboot,
    PhysicalReady,
    ApplicationReady,
    Timer(TimerSlot),
}

/// A concrete event delivered to a node's [`Node::on_event`].
#[derive(Debug, Clone)]
pub enum NodeEvent {
    Reboot,
    PhysicalReady {
        link_index: usize,
        frame: Vec<u8>,
    },
    ApplicationReady {
        destination: usize,
        payload: Vec<u8>,
    },
    Timer {
        slot: TimerSlot,
        timer_id: u64,
    },
}

impl NodeEvent {
    pub fn kind(&self) -> NodeEventKind {
        match self {
            NodeEvent::Reboot => NodeEventKind::Reboot,
            NodeEvent::PhysicalReady { .. } => NodeEventKind::PhysicalReady,
            NodeEvent::ApplicationReady { .. } => NodeEventKind::ApplicationReady,
            NodeEvent::Timer { slot, .. } => NodeEventKind::Timer(*slot),
        }
    }
}

/// Raised by [`NodeContext::timer_data`] when the timer no longer exists
/// (already fired, or was cancelled). A contract violation per §7, not a
/// recoverable outcome.
#[derive(Debug, Error, Clone, Copy)]
#[error("timer no longer exists")]
pub struct DeadTimerError;

/// The capability surface handed to a `Node` for the duration of one
/// callback dispatch (component H). All of these are only meaningful while
/// a callback for this node is on the stack; the engine never hands one out
/// otherwise.
pub trait NodeContext {
    /// Current virtual time, in microseconds.
    fn now(&self) -> u64;

    /// Physical parameters of the current node's `link_index`'th link, or
    /// `None` if out of range. Read-only — a protocol cannot use this to
    /// mutate link state, only to size timeouts against bandwidth/delay.
    fn link_info(&self, link_index: usize) -> Option<LinkSnapshot>;

    /// With `target == None`, enable application traffic from the current
    /// node to every other node. With `Some(target)`, enable traffic only
    /// to `target` (a no-op if `target` is the current node — see §9).
    fn enable_application(&mut self, target: Option<usize>);

    /// Mirror of [`NodeContext::enable_application`]; removing the last
    /// destination disables the node's traffic generator.
    fn disable_application(&mut self, target: Option<usize>);

    /// Schedule `slot` to fire in `delay_usec` microseconds, carrying
    /// `data`. Returns a unique, positive timer ID. Panics (a contract
    /// violation, §7) if `delay_usec` is negative.
    fn start_timer(&mut self, slot: TimerSlot, delay_usec: i64, data: Option<Vec<u8>>) -> u64;

    /// Cancel a timer. Returns `true` if it existed and was still live.
    fn stop_timer(&mut self, id: u64) -> bool;

    /// Fetch the payload of a still-live timer.
    fn timer_data(&self, id: u64) -> Result<Option<Vec<u8>>, DeadTimerError>;

    /// Register (or re-register) interest in `kind` for the current node.
    fn set_handler(&mut self, kind: NodeEventKind);

    /// Transmit `frame` on `link_index`. Returns `false` if the index is
    /// out of range or the link is down (both recoverable outcomes, §7).
    fn write_physical(&mut self, link_index: usize, frame: Vec<u8>) -> bool;

    /// Account a received application payload against the current node's
    /// waiting map. Returns `false` if the payload is unrecognised.
    fn write_application(&mut self, payload: Vec<u8>) -> bool;

    /// Emit `message`, prefixed with the current node's index, to the
    /// node-output sink (suppressed entirely in silent-node mode).
    fn print(&mut self, message: &str);
}

/// The interface a user protocol implements. Constructed once per node at
/// topology build time; `on_event` is then invoked for `Reboot` once, and
/// thereafter for any event kind the node has registered via
/// [`NodeContext::set_handler`].
pub trait Node {
    fn on_event(&mut self, ctx: &mut dyn NodeContext, event: NodeEvent);
}
