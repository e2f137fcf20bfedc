//! Parent-process side of the protocol.
//!
//! Spawns a worker binary, keeps it warm across jobs, and turns result
//! lines back into paths or errors. Horizontal scaling is one bridge per
//! worker process; a single bridge serializes its submissions FIFO.

pub mod bridge;
pub mod process;

pub use bridge::{HostError, WorkerBridge};
pub use process::WorkerProcess;
