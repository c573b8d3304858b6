//! The simulator engine: event/timer queues (C), RNG + Poisson traffic (D),
//! frame delivery (E), the traffic generator (F), the scheduler loop (G),
//! the node-facing API implementation (H), and the stats collector (I) and
//! topology builder (J), all layered on the contracts in `netsim-core`.

mod builder;
mod error;
mod node_state;
mod queue;
mod rng;
mod simulator;
mod stats;

pub mod time {
    pub use netsim_core::time::*;
}

pub use builder::{build_topology, BuiltTopology};
pub use error::SimFault;
pub use node_state::NodeState;
pub use rng::{poisson_usec, seeded_rng};
pub use simulator::{Simulator, StepOutcome};
pub use stats::{Counters, StatsSink, CSV_HEADER};
