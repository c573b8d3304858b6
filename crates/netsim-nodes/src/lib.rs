//! Built-in reference `Node` implementations and the module-name registry
//! that resolves a topology's `module` field to one of them. User protocol
//! implementations are out of the simulator core's scope (§1); this crate
//! exists so the workspace is runnable end-to-end and the scenarios in §8
//! are exercisable without a real dynamic-loading story.

pub mod registry;
pub mod stopwait;

pub use registry::lookup;
pub use stopwait::StopAndWaitNode;
