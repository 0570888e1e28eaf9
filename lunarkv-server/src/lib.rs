//! lunarkv-server - dispatcher, transports, background workers, and metrics

pub mod dispatcher;
pub mod http;
pub mod metrics;
pub mod scheduler;
pub mod server;
pub mod taskqueue;

pub use dispatcher::{dispatch, DispatchOutcome};
pub use metrics::Metrics;
pub use scheduler::Scheduler;
pub use server::ServerState;
pub use taskqueue::TaskQueue;
